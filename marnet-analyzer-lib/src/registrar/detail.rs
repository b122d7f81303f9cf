//! Detail pages: the registrar's per-domain view.
//!
//! The page is a set of nested tables addressed by cell position. Every field
//! has its own accessor so a layout change touches exactly one method.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use crate::error::AnalyzerError;
use crate::types::Nameserver;

lazy_static! {
    /// Cells of the second-level table; cell 1 tells whether a record exists
    static ref RECORD_CELLS: Selector = Selector::parse("table table tr td").unwrap();

    /// Cells of the innermost table holding the record
    static ref MAIN_CELLS: Selector = Selector::parse("table table table tr td").unwrap();

    static ref BLOCKQUOTE: Selector = Selector::parse("blockquote").unwrap();

    /// Nameserver rows are the centered ones, cells alternate name and IP
    static ref NAMESERVER_CELLS: Selector =
        Selector::parse(r#"table table table tr[align="center"] td"#).unwrap();
}

/// The registrar prints a sentence in place of the record when a domain is
/// not registered; a real record cell starts with markup or a short token.
const NO_RECORD_MIN_LEN: usize = 10;

const DATE_VALID_CELL: usize = 1;
const DATE_REGISTERED_CELL: usize = 3;
const REGISTRANT_CELL: usize = 5;

/// Fields scraped from a detail page that has a record.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailFields {
    pub date_valid: String,
    pub date_registered: String,
    pub registrant: String,
    pub nameservers: Vec<Nameserver>,
}

/// A parsed detail page.
pub struct DetailPage {
    document: Html,
}

impl DetailPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Extract all fields, or `DomainNotFound` when the page has no record.
    ///
    /// A page that claims a record but lacks one of the field cells is a
    /// `ParseError`. Blank fields are kept as empty strings.
    pub fn extract(&self, domain: &str) -> Result<DetailFields, AnalyzerError> {
        if !self.has_record() {
            return Err(AnalyzerError::domain_not_found(domain));
        }

        let missing = |field: &str| {
            AnalyzerError::parse(format!("detail page of {} has no {}", domain, field))
        };

        Ok(DetailFields {
            date_valid: self.date_valid().ok_or_else(|| missing("validity date"))?,
            date_registered: self
                .date_registered()
                .ok_or_else(|| missing("registration date"))?,
            registrant: self.registrant().ok_or_else(|| missing("registrant"))?,
            nameservers: self.nameservers(),
        })
    }

    /// Whether the page carries a detail record.
    pub fn has_record(&self) -> bool {
        match self.document.select(&RECORD_CELLS).nth(1) {
            Some(cell) => leading_text(cell).map_or(true, |text| text.len() < NO_RECORD_MIN_LEN),
            None => false,
        }
    }

    /// Date until which the registration is valid.
    ///
    /// The field accessors return `None` only when the page lacks the cell;
    /// a cell that is present but blank yields an empty string.
    pub fn date_valid(&self) -> Option<String> {
        self.main_cell(DATE_VALID_CELL).map(|cell| {
            cell.select(&BLOCKQUOTE)
                .next()
                .map(field_text)
                .unwrap_or_default()
        })
    }

    /// Registration date, or the placeholder used for pre-2003 registrations.
    pub fn date_registered(&self) -> Option<String> {
        self.main_cell(DATE_REGISTERED_CELL).map(field_text)
    }

    /// Registrant name.
    pub fn registrant(&self) -> Option<String> {
        self.main_cell(REGISTRANT_CELL).map(field_text)
    }

    /// Nameserver name/IP pairs; an unpaired trailing cell is dropped.
    pub fn nameservers(&self) -> Vec<Nameserver> {
        let cells: Vec<String> = self
            .document
            .select(&NAMESERVER_CELLS)
            .map(field_text)
            .collect();

        if cells.len() % 2 != 0 {
            debug!("Dropping unpaired nameserver cell {:?}", cells.last());
        }

        cells
            .chunks_exact(2)
            .map(|pair| Nameserver {
                name: pair[0].clone(),
                ip: pair[1].clone(),
            })
            .collect()
    }

    fn main_cell(&self, index: usize) -> Option<ElementRef<'_>> {
        self.document.select(&MAIN_CELLS).nth(index)
    }
}

/// Text of the first meaningful child when that child is a text node.
///
/// Returns `None` when the element starts with markup or is empty;
/// whitespace-only text nodes are skipped.
fn leading_text(element: ElementRef<'_>) -> Option<String> {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            Node::Element(_) => return None,
            _ => {}
        }
    }
    None
}

/// Field value of a cell: its leading text, or the full text of the cell
/// when the value is wrapped in markup. Empty when the cell has no text.
fn field_text(element: ElementRef<'_>) -> String {
    leading_text(element).unwrap_or_else(|| {
        let text = element.text().collect::<Vec<_>>().join(" ");
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    })
}
