//! Access to the registrar's web interface.
//!
//! The registrar serves everything from one script driven by query
//! parameters: `bukva` selects a listing prefix, `del` a listing page and
//! `dom` a single domain's detail view. Page layouts are handled in
//! [`listing`] and [`detail`]; network access lives in [`fetcher`].

/// Detail page extraction
pub mod detail;

/// HTTP fetcher with bounded retry
pub mod fetcher;

/// Listing page extraction
pub mod listing;

use crate::error::AnalyzerError;
use async_trait::async_trait;
use std::net::IpAddr;
use url::Url;

pub use detail::{DetailFields, DetailPage};
pub use fetcher::HttpFetcher;
pub use listing::ListingPage;

/// Source of registrar markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page at `url` and return its body.
    async fn fetch_page(&self, url: &Url) -> Result<String, AnalyzerError>;
}

/// Side queries against a domain's live site.
#[async_trait]
pub trait SiteProbe: Send + Sync {
    /// HTTP status class of `http://<domain>`, `None` when unreachable.
    async fn status_class(&self, domain: &str) -> Option<String>;

    /// Address the domain resolves to, `None` when it does not resolve.
    async fn resolve_host(&self, domain: &str) -> Option<IpAddr>;
}

/// Parse the configured registrar endpoint.
pub fn parse_base_url(base_url: &str) -> Result<Url, AnalyzerError> {
    Ok(Url::parse(base_url)?)
}

/// URL of a listing page for a prefix; `page` of `None` is the landing page.
pub fn listing_url(base: &Url, letter: &str, page: Option<usize>) -> Url {
    let mut url = base.clone();
    {
        let mut query = url.query_pairs_mut();
        query.clear().append_pair("bukva", letter);
        if let Some(page) = page {
            query.append_pair("del", &page.to_string());
        }
    }
    url
}

/// URL of a domain's detail view.
pub fn detail_url(base: &Url, domain: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().clear().append_pair("dom", domain);
    url
}
