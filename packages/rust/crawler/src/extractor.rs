//! Boilerplate-stripping text and link extraction.
//!
//! Walks the main content area of a parsed page, pruning script/style/nav
//! chrome subtrees, and emits structural text blocks (headings, paragraphs,
//! list items, quotes, preformatted) joined by blank lines — the boundaries
//! the classifier later splits at. Link resolution happens here; scope
//! filtering deliberately does not.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::normalizer;

/// Subtrees that never contribute content text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "nav", "header", "footer",
    "aside", "form", "button",
];

/// Elements that emit one text block each.
const BLOCK_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "li", "blockquote", "pre", "dt", "dd", "td",
];

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Result of extracting one page.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Page title, from the first `<h1>` or the `<title>` element.
    pub title: Option<String>,
    /// Structural text blocks joined by blank lines; whitespace collapsed.
    pub text_content: String,
    /// Outbound links, resolved against the base URL and normalized.
    /// Links that fail normalization are silently dropped.
    pub outbound_links: Vec<Url>,
}

/// Extract title, text content, and outbound links from raw HTML.
pub fn extract(raw_html: &str, base_url: &Url) -> Extraction {
    let doc = Html::parse_document(raw_html);

    let mut blocks: Vec<String> = Vec::new();
    collect_blocks(pick_root(&doc), &mut blocks);

    Extraction {
        title: extract_title(&doc),
        text_content: blocks.join("\n\n"),
        outbound_links: extract_links(&doc, base_url),
    }
}

/// Prefer the semantic content root; fall back to the whole body.
fn pick_root(doc: &Html) -> ElementRef<'_> {
    let candidates = ["main", "article", r#"[role="main"]"#, "body"];
    for sel_str in candidates {
        let sel = Selector::parse(sel_str).expect("valid selector");
        if let Some(el) = doc.select(&sel).next() {
            return el;
        }
    }
    doc.root_element()
}

/// Recursive walk that prunes chrome subtrees and emits block text.
///
/// Block elements are collected whole and not descended into, so a `<p>`
/// inside a collected `<li>` is not emitted twice.
fn collect_blocks(element: ElementRef<'_>, blocks: &mut Vec<String>) {
    for child in element.children() {
        let Some(el) = ElementRef::wrap(child) else {
            continue;
        };
        let tag = el.value().name();

        if SKIP_TAGS.contains(&tag) {
            continue;
        }

        if BLOCK_TAGS.contains(&tag) {
            let text = collapse_whitespace(&el.text().collect::<String>());
            if !text.is_empty() {
                blocks.push(text);
            }
        } else {
            collect_blocks(el, blocks);
        }
    }
}

fn extract_title(doc: &Html) -> Option<String> {
    let h1_sel = Selector::parse("h1").expect("valid selector");
    let title_sel = Selector::parse("title").expect("valid selector");

    doc.select(&h1_sel)
        .chain(doc.select(&title_sel))
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|t| !t.is_empty())
}

/// Extract all links, resolved against the base URL and normalized.
fn extract_links(doc: &Html, base_url: &Url) -> Vec<Url> {
    let link_sel = Selector::parse("a[href]").expect("valid selector");
    let mut links = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };

        // Skip anchors and non-navigational pseudo-links before resolving
        if href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("data:")
        {
            continue;
        }

        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        let Some(normalized) = normalizer::normalize(resolved.as_str()) else {
            continue;
        };

        if seen.insert(normalized.as_str().to_string()) {
            links.push(normalized);
        }
    }

    links
}

/// Collapse whitespace runs to single spaces and trim.
fn collapse_whitespace(input: &str) -> String {
    let mut buf = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_space && !buf.is_empty() {
                buf.push(' ');
            }
            last_space = true;
        } else {
            buf.push(ch);
            last_space = false;
        }
    }
    buf.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://shop.example/catalog/index").unwrap()
    }

    #[test]
    fn extracts_blocks_with_boundaries() {
        let html = r#"<html><body><main>
            <h1>Our   Products</h1>
            <p>We sell
               hand-made chairs.</p>
            <ul><li>Oak chair</li><li>Walnut table</li></ul>
        </main></body></html>"#;

        let extraction = extract(html, &base());
        assert_eq!(extraction.title.as_deref(), Some("Our Products"));
        assert_eq!(
            extraction.text_content,
            "Our Products\n\nWe sell hand-made chairs.\n\nOak chair\n\nWalnut table"
        );
    }

    #[test]
    fn strips_chrome_subtrees() {
        let html = r#"<html><body>
            <nav><a href="/home">Home</a><p>Navigation text</p></nav>
            <header><p>Banner</p></header>
            <main><p>Real content here.</p></main>
            <footer><p>Copyright 2024</p></footer>
            <script>track();</script>
            <style>.x { color: red }</style>
        </body></html>"#;

        let extraction = extract(html, &base());
        assert_eq!(extraction.text_content, "Real content here.");
        assert!(!extraction.text_content.contains("Navigation"));
        assert!(!extraction.text_content.contains("Copyright"));
        assert!(!extraction.text_content.contains("track()"));
    }

    #[test]
    fn comments_do_not_leak_into_text() {
        let html = "<html><body><main><p>visible</p><!-- hidden note --></main></body></html>";
        let extraction = extract(html, &base());
        assert_eq!(extraction.text_content, "visible");
    }

    #[test]
    fn resolves_relative_links() {
        let html = r##"<html><body><main>
            <a href="/faq">FAQ</a>
            <a href="chairs">Chairs</a>
            <a href="https://other.example/page">External</a>
            <a href="#section">Anchor</a>
            <a href="mailto:hi@shop.example">Mail</a>
            <a href="javascript:void(0)">JS</a>
        </main></body></html>"##;

        let extraction = extract(html, &base());
        let links: Vec<&str> = extraction
            .outbound_links
            .iter()
            .map(|u| u.as_str())
            .collect();

        assert_eq!(
            links,
            vec![
                "https://shop.example/faq",
                "https://shop.example/catalog/chairs",
                "https://other.example/page",
            ]
        );
    }

    #[test]
    fn duplicate_links_emitted_once() {
        let html = r#"<html><body><main>
            <a href="/faq">FAQ</a>
            <a href="/faq#shipping">FAQ shipping</a>
            <a href="/faq/">FAQ again</a>
        </main></body></html>"#;

        let extraction = extract(html, &base());
        assert_eq!(extraction.outbound_links.len(), 1);
        assert_eq!(extraction.outbound_links[0].as_str(), "https://shop.example/faq");
    }

    #[test]
    fn title_falls_back_to_title_element() {
        let html = "<html><head><title>Shop | Home</title></head><body><p>x y z</p></body></html>";
        let extraction = extract(html, &base());
        assert_eq!(extraction.title.as_deref(), Some("Shop | Home"));
    }

    #[test]
    fn nested_blocks_are_not_duplicated() {
        let html = r#"<html><body><main>
            <ul><li><p>Only once</p></li></ul>
        </main></body></html>"#;

        let extraction = extract(html, &base());
        assert_eq!(extraction.text_content, "Only once");
    }

    #[test]
    fn empty_page_yields_empty_extraction() {
        let extraction = extract("", &base());
        assert!(extraction.title.is_none());
        assert!(extraction.text_content.is_empty());
        assert!(extraction.outbound_links.is_empty());
    }
}
