//! Listing pages: pagination and the domain names linked from a page.

use lazy_static::lazy_static;
use scraper::{Html, Selector};
use url::Url;

lazy_static! {
    /// Pagination links carry the prefix parameter
    static ref PAGE_LINKS: Selector =
        Selector::parse(r#"td[align="center"] a[href*="bukva"]"#).unwrap();

    /// Domain links point at the detail view
    static ref DOMAIN_LINKS: Selector =
        Selector::parse(r#"td[align="center"] a[href*="dom"]"#).unwrap();
}

/// A parsed listing page.
pub struct ListingPage {
    document: Html,
}

impl ListingPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Number of pages announced by the pagination bar.
    pub fn page_count(&self) -> usize {
        self.document.select(&PAGE_LINKS).count()
    }

    /// Domain names linked from this page, in page order.
    ///
    /// Links are resolved against `base` so relative hrefs work; links
    /// without a `dom` parameter or with an empty one are skipped. Every
    /// other linked name is kept as the registrar printed it.
    pub fn domain_names(&self, base: &Url) -> Vec<String> {
        self.document
            .select(&DOMAIN_LINKS)
            .filter_map(|link| link.value().attr("href"))
            .filter_map(|href| base.join(href).ok())
            .filter_map(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "dom")
                    .map(|(_, value)| value.trim().to_string())
            })
            .filter(|name| !name.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <table>
          <tr><td align="center">
            <a href="registar.php?bukva=A&del=0">1</a>
            <a href="registar.php?bukva=A&del=1">2</a>
            <a href="registar.php?bukva=A&del=2">3</a>
          </td></tr>
          <tr><td align="center"><a href="registar.php?dom=alfa.mk">alfa.mk</a></td></tr>
          <tr><td align="center"><a href="registar.php?dom=akademik.edu.mk">akademik.edu.mk</a></td></tr>
          <tr><td align="center"><a href="http://reg.marnet.net.mk/registar.php?dom=apteka.com.mk">apteka.com.mk</a></td></tr>
          <tr><td align="center"><a href="registar.php?dom=my_shop.mk">my_shop.mk</a></td></tr>
          <tr><td align="center"><a href="registar.php?dom=">empty</a></td></tr>
          <tr><td><a href="registar.php?dom=outside.mk">not centered</a></td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_page_count() {
        let page = ListingPage::parse(LISTING);
        assert_eq!(page.page_count(), 3);
    }

    #[test]
    fn test_domain_names() {
        let base = Url::parse("http://reg.marnet.net.mk/registar.php").unwrap();
        let page = ListingPage::parse(LISTING);

        assert_eq!(
            page.domain_names(&base),
            vec!["alfa.mk", "akademik.edu.mk", "apteka.com.mk", "my_shop.mk"]
        );
    }

    #[test]
    fn test_page_without_pagination() {
        let page = ListingPage::parse("<html><body><p>Нема домени</p></body></html>");
        assert_eq!(page.page_count(), 0);

        let base = Url::parse("http://reg.marnet.net.mk/registar.php").unwrap();
        assert!(page.domain_names(&base).is_empty());
    }
}
