use crate::fetch::Resource;
use crate::parse::{Parsed, Parser};
use scraper::{Html, Selector};

const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// HTML parser: anchor hrefs, image sources, and robots meta directives.
pub struct HtmlParser {
    anchors: Selector,
    images: Selector,
    robots_meta: Selector,
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlParser {
    pub fn new() -> Self {
        // Static selectors, known valid.
        Self {
            anchors: Selector::parse("a[href]").unwrap(),
            images: Selector::parse("img[src]").unwrap(),
            robots_meta: Selector::parse("meta[name]").unwrap(),
        }
    }
}

impl Parser for HtmlParser {
    fn parse(&self, resource: &mut Resource) -> Parsed {
        match resource.content_type().as_deref() {
            Some(ct) if HTML_CONTENT_TYPES.contains(&ct) => {}
            _ => return Parsed::Unhandled,
        }
        // The decoded view; the parse copies out what it needs, so the
        // borrow ends here and the directive flags can be set below.
        let document = match resource.text() {
            Some(text) => Html::parse_document(&text),
            None => return Parsed::Unhandled,
        };

        for element in document.select(&self.robots_meta) {
            let name = element.value().attr("name").unwrap_or_default();
            if !name.eq_ignore_ascii_case("robots") {
                continue;
            }
            let directives = element.value().attr("content").unwrap_or_default();
            for directive in directives.split(',') {
                match directive.trim().to_lowercase().as_str() {
                    "noindex" => resource.noindex = true,
                    "nofollow" => resource.nofollow = true,
                    _ => {}
                }
            }
        }

        let mut links = Vec::new();
        for element in document.select(&self.anchors) {
            if let Some(href) = element.value().attr("href") {
                links.push(href.to_string());
            }
        }
        for element in document.select(&self.images) {
            if let Some(src) = element.value().attr("src") {
                links.push(src.to_string());
            }
        }
        tracing::debug!(url = %resource.url, links = links.len(), "parsed HTML");
        Parsed::Handled(links)
    }
}
