//! Link extraction from fetched pages
//!
//! Collects anchor and area hrefs, resolves them against the page URL and
//! keeps only in-scope content links.

use scraper::{Html, Selector};
use std::collections::BTreeSet;
use url::Url;

use leakhunt_core::is_onion_host;

/// Static assets never worth fetching
const EXCLUDED_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png", "gif", "doc", "js", "css"];

/// Extract absolute in-scope links from HTML.
///
/// With `scope_domain`, only links to exactly that host (any port) are kept;
/// otherwise any http(s) link to a .onion host. The set is sorted, so
/// iterating it is deterministic.
pub fn extract_links(base_url: &str, html: &str, scope_domain: Option<&str>) -> BTreeSet<String> {
    let mut links = BTreeSet::new();

    let base = match Url::parse(base_url) {
        Ok(base) => base,
        Err(_) => return links,
    };

    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href], area[href]").unwrap();

    for element in document.select(&link_selector) {
        let href = match element.value().attr("href") {
            Some(h) => h.trim(),
            None => continue,
        };

        if excluded_href(href) {
            continue;
        }

        let url = match base.join(href) {
            Ok(url) => url,
            Err(_) => continue,
        };

        if has_excluded_extension(&url) || !in_scope(&url, scope_domain) {
            continue;
        }

        links.insert(url.to_string());
    }

    links
}

/// Anchors, phone and mail links
fn excluded_href(href: &str) -> bool {
    if href.is_empty() || href.contains('#') {
        return true;
    }

    let lower = href.to_ascii_lowercase();
    lower.starts_with("tel:") || lower.starts_with("mailto:")
}

fn has_excluded_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    EXCLUDED_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)))
}

fn in_scope(url: &Url, scope_domain: Option<&str>) -> bool {
    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    let host = match url.host_str() {
        Some(host) => host,
        None => return false,
    };

    match scope_domain {
        Some(domain) => host.eq_ignore_ascii_case(domain.split(':').next().unwrap_or(domain)),
        None => is_onion_host(host),
    }
}
