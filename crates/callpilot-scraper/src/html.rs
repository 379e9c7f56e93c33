//! DOM-based HTML helpers: title, links, and readable text.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};

use crate::urls::resolve_and_canonicalize;

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid h1 selector"));

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));

/// Subtrees that are never content, wherever they appear.
const SKIPPED: &[&str] = &[
    "head", "script", "style", "noscript", "svg", "iframe", "template",
];

/// Site chrome, dropped only outside a content scope.
const PAGE_CHROME: &[&str] = &["nav", "header", "footer"];

/// Inside these, `PAGE_CHROME` elements are part of the content
/// (an article's own header, a section footer).
const CONTENT_SCOPES: &[&str] = &["main", "article", "section"];

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "ol", "p", "pre", "section", "summary", "table", "td", "th",
    "tr", "ul",
];

/// Title, readable text, and outgoing links of one page, from a single
/// parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PageParts {
    pub title: String,
    pub text: String,
    pub links: Vec<String>,
}

pub(crate) fn read_page(html: &str, base: &str) -> PageParts {
    let doc = Html::parse_document(html);
    PageParts {
        title: title_of(&doc),
        text: text_of(&doc),
        links: links_of(&doc, base),
    }
}

/// The `<title>`, or the first `<h1>` when the title is missing.
pub(crate) fn extract_title(html: &str) -> String {
    title_of(&Html::parse_document(html))
}

/// Every anchor target on the page, resolved against `base` and
/// canonicalized. Duplicates are kept; the crawler dedups.
#[cfg(test)]
pub(crate) fn extract_links(html: &str, base: &str) -> Vec<String> {
    links_of(&Html::parse_document(html), base)
}

/// Convert a page to line-oriented readable text. Block-level elements
/// become line breaks so the cleaner can work line by line.
pub(crate) fn html_to_text(html: &str) -> String {
    text_of(&Html::parse_document(html))
}

fn title_of(doc: &Html) -> String {
    let first = |sel: &Selector| {
        doc.select(sel)
            .next()
            .map(|el| collapse_inline(&el.text().collect::<String>()))
            .unwrap_or_default()
    };
    let title = first(&TITLE);
    if title.is_empty() {
        first(&H1)
    } else {
        title
    }
}

fn links_of(doc: &Html, base: &str) -> Vec<String> {
    doc.select(&ANCHOR)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| resolve_and_canonicalize(href.trim(), base))
        .collect()
}

fn text_of(doc: &Html) -> String {
    let mut raw = String::new();
    push_text(doc.root_element(), false, &mut raw);

    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        let line = collapse_inline(line);
        if line.is_empty() {
            continue;
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn push_text(el: ElementRef<'_>, in_content: bool, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child_el.value().name();
                if SKIPPED.contains(&name) || (!in_content && PAGE_CHROME.contains(&name)) {
                    out.push('\n');
                    continue;
                }
                let block = BLOCKS.contains(&name);
                if block {
                    out.push('\n');
                }
                push_text(child_el, in_content || CONTENT_SCOPES.contains(&name), out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn collapse_inline(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
