//! URL normalization and crawl-frontier classification.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::error::ScraperError;

/// Business-relevant paths dequeued ahead of everything else.
static PRIORITY_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)/(about|about-us|contact|contact-us|services?|team|our-team|staff|doctors?|providers?|faqs?|pricing|prices|rates|locations?|hours|appointments?|book|booking|schedule|insurance|payment|new-patients?|treatments?|menu)(/|$|[-_.])",
    )
    .expect("valid priority path regex")
});

/// Paths that never contribute knowledge-base content.
static EXCLUDED_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)/(blog|blogs|news|articles?|posts?|tag|tags|category|categories|author|press|privacy|terms|legal|cookies?|disclaimer|accessibility|login|log-in|signin|sign-in|signup|sign-up|register|account|my-account|cart|basket|checkout|wp-admin|wp-login|wp-json|feed|rss)(/|$|[-_.])",
    )
    .expect("valid excluded path regex")
});

const EXCLUDED_EXTENSIONS: [&str; 24] = [
    "pdf", "jpg", "jpeg", "png", "gif", "svg", "webp", "ico", "css", "js", "zip", "mp4", "mp3",
    "mov", "avi", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "xml", "json", "woff2",
];

/// Parse a user-supplied website into an absolute http(s) URL, adding
/// `https://` when no scheme is given.
pub(crate) fn normalize_seed(raw: &str) -> Result<Url, ScraperError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScraperError::InvalidUrl {
            url: raw.to_owned(),
            reason: "empty".to_owned(),
        });
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| ScraperError::InvalidUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none() {
        return Err(ScraperError::InvalidUrl {
            url: raw.to_owned(),
            reason: "missing host".to_owned(),
        });
    }
    Ok(url)
}

/// Reject a seed that names this machine or a private network by literal
/// address or local-only hostname. Names are not resolved.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] for a malformed or non-public seed.
pub(crate) fn ensure_public_seed(raw: &str) -> Result<(), ScraperError> {
    let url = normalize_seed(raw)?;
    if is_internal_target(&url) {
        return Err(ScraperError::InvalidUrl {
            url: raw.to_owned(),
            reason: "private or local address".to_owned(),
        });
    }
    Ok(())
}

fn is_internal_target(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return true;
    };
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return is_internal_ip(ip);
    }
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
}

fn is_internal_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_internal_v4(mapped);
            }
            v6.is_loopback() || v6.is_unspecified() || is_unique_local(v6) || is_link_local_v6(v6)
        }
    }
}

fn is_internal_v4(v4: Ipv4Addr) -> bool {
    let [a, b, ..] = v4.octets();
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_unspecified()
        // 100.64.0.0/10, carrier-grade NAT
        || (a == 100 && (b & 0xC0) == 64)
}

fn is_unique_local(v6: Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xfe00) == 0xfc00
}

fn is_link_local_v6(v6: Ipv6Addr) -> bool {
    (v6.segments()[0] & 0xffc0) == 0xfe80
}

/// Drop fragment and query, and a trailing slash on non-root paths, so the
/// same page is visited once.
pub(crate) fn canonicalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    url.set_fragment(None);
    url.set_query(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    Some(url.to_string())
}

pub(crate) fn resolve_and_canonicalize(raw: &str, base: &str) -> Option<String> {
    let href = raw.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
        || href.starts_with("data:")
    {
        return None;
    }

    if href.starts_with("http://") || href.starts_with("https://") {
        canonicalize_url(href)
    } else {
        let base_url = Url::parse(base).ok()?;
        let joined = base_url.join(href).ok()?;
        canonicalize_url(joined.as_str())
    }
}

/// Hosts match ignoring a leading `www.`.
pub(crate) fn same_host(url: &str, host: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(candidate) = parsed.host_str() else {
        return false;
    };
    strip_www(candidate).eq_ignore_ascii_case(strip_www(host))
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

pub(crate) fn is_priority(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| PRIORITY_PATH.is_match(u.path()))
}

pub(crate) fn is_excluded(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return true;
    };
    let path = parsed.path();
    if EXCLUDED_PATH.is_match(path) {
        return true;
    }
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            EXCLUDED_EXTENSIONS
                .iter()
                .any(|excluded| ext.eq_ignore_ascii_case(excluded))
        })
}
