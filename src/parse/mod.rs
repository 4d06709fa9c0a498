//! Content parsing and link extraction
//!
//! Parsers are tried in registration order until one claims the resource.
//! An unclaimed resource simply yields no links (it is still dumped); a
//! claimed one yields the raw link strings found in it, which the pipeline
//! resolves against the resource URL.

mod html;

pub use html::HtmlParser;

use crate::fetch::Resource;

/// Outcome of offering a resource to one parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// The parser claimed the resource; links are raw, unresolved strings
    /// exactly as found in the document.
    Handled(Vec<String>),
    /// Not this parser's content type; try the next one.
    Unhandled,
}

/// Extracts links from a fetched resource.
///
/// A parser may also set the resource's `noindex`/`nofollow` flags from
/// in-band directives (robots meta tags and the like).
pub trait Parser: Send + Sync {
    fn parse(&self, resource: &mut Resource) -> Parsed;
}
