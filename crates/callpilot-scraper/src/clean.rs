//! Heuristic, line-oriented cleanup of extracted page text.
//!
//! Best-effort only: lines are kept or dropped by length, a small navigation
//! vocabulary, and boilerplate patterns. Nothing here understands the page.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::ScrapedPage;

/// Lines shorter than this (in chars) are dropped.
const MIN_LINE_CHARS: usize = 10;

/// A page whose cleaned text is shorter than this and reads like an error
/// page is discarded entirely.
const ERROR_PAGE_MAX_CHARS: usize = 600;

const NAV_WORDS: [&str; 40] = [
    "home",
    "menu",
    "main menu",
    "about",
    "about us",
    "contact",
    "contact us",
    "services",
    "our services",
    "team",
    "our team",
    "faq",
    "faqs",
    "blog",
    "news",
    "gallery",
    "locations",
    "careers",
    "search",
    "close",
    "open menu",
    "close menu",
    "toggle navigation",
    "navigation",
    "skip to content",
    "skip to main content",
    "back to top",
    "read more",
    "learn more",
    "view more",
    "see more",
    "next",
    "previous",
    "share",
    "login",
    "log in",
    "sign in",
    "sign up",
    "book now",
    "call now",
];

static MD_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid image regex"));

static MD_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid link regex"));

static NAV_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[|•·»>/]\s*").expect("valid separator regex"));

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?ix)
        \bwe\ use\ cookies\b
        | \bcookie\ (policy|settings|preferences|consent)\b
        | \baccept\ (all\ )?cookies\b
        | \bby\ continuing\ to\ (use|browse)\b
        | ©
        | \bcopyright\b
        | \ball\ rights\ reserved\b
        | \b(subscribe|sign\ up)\ (to|for)\ (our|the)\ newsletter\b
        | \bjoin\ our\ mailing\ list\b
        | \bskip\ to\ (main\ )?content\b
        | \bsign\ in\ to\ (your|my)\b
        | \blog\ in\ to\ (your|my)\b
        | \bforgot\ (your\ )?password\b
        | \bshare\ (this\ )?(on|via)\ (facebook|twitter|x|linkedin|pinterest|email)\b
        | \bfollow\ us\ on\b
        | \bpowered\ by\ (wordpress|squarespace|wix|shopify|godaddy|weebly)\b
        | \b(enable|requires)\ javascript\b
        | \byour\ browser\ (is\ out\ of\ date|does\ not\ support)\b
        ",
    )
    .expect("valid boilerplate regex")
});

static ERROR_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(404|page not found|not found|page (you requested )?(could not|cannot|can't) be found|access denied|403 forbidden|forbidden|500 internal server error|service unavailable|this page (doesn't|does not) exist)\b",
    )
    .expect("valid error page regex")
});

static ERROR_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/(404|error|not-found)(/|$|\.)").expect("valid regex"));

/// Clean the extracted text of one page.
///
/// Returns an empty string when nothing useful remains or when the page looks
/// like an error page.
#[must_use]
pub fn clean_text(raw: &str, source_url: &str) -> String {
    let mut kept: Vec<String> = Vec::new();
    let mut previous_key: Option<String> = None;

    for line in raw.lines() {
        let Some(line) = clean_line(line) else {
            continue;
        };
        let key = line.to_lowercase();
        if previous_key.as_deref() == Some(key.as_str()) {
            continue;
        }
        previous_key = Some(key);
        kept.push(line);
    }

    let text = kept.join("\n");
    if looks_like_error_page(&text, source_url) {
        tracing::debug!(url = %source_url, "cleaner: discarding error page");
        return String::new();
    }
    text
}

/// Clean a page in place. Returns `None` if the cleaned text is empty.
#[must_use]
pub fn clean_page(page: &ScrapedPage) -> Option<ScrapedPage> {
    let text = clean_text(&page.extracted_text, &page.url);
    if text.is_empty() {
        return None;
    }
    Some(ScrapedPage {
        url: page.url.clone(),
        title: page.title.trim().to_owned(),
        raw_html: String::new(),
        extracted_text: text,
    })
}

fn clean_line(line: &str) -> Option<String> {
    let line = MD_IMAGE.replace_all(line, " ");
    let line = MD_LINK.replace_all(&line, "$1");
    let line = line.split_whitespace().collect::<Vec<_>>().join(" ");

    if line.chars().count() < MIN_LINE_CHARS {
        return None;
    }
    if is_navigation(&line) || BOILERPLATE.is_match(&line) {
        return None;
    }
    Some(line)
}

/// A line made only of navigation words, optionally separated by `|`, `•`,
/// `/`, or `>`.
fn is_navigation(line: &str) -> bool {
    let lower = line.to_lowercase();
    let tokens: Vec<&str> = NAV_SEPARATORS
        .split(&lower)
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != ' ').trim())
        .filter(|t| !t.is_empty())
        .collect();
    !tokens.is_empty() && tokens.iter().all(|t| NAV_WORDS.contains(t))
}

fn looks_like_error_page(text: &str, source_url: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    if let Ok(url) = reqwest::Url::parse(source_url) {
        if ERROR_URL.is_match(url.path()) {
            return true;
        }
    }
    text.chars().count() < ERROR_PAGE_MAX_CHARS
        && text.lines().take(3).any(|line| ERROR_PAGE.is_match(line))
}
