//! URL normalization for visited-state tracking
//!
//! Two URLs name the same crawl target when scheme, host, path and query
//! agree. Fragments never matter.

use url::Url;

/// Normalize an absolute http(s) URL.
///
/// Lowercases scheme and host, drops default ports, turns an empty path into
/// `/` and strips the fragment. Returns `None` for anything that is not an
/// absolute http(s) URL with a host.
pub fn normalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.host_str()?;

    url.set_fragment(None);
    Some(url.to_string())
}

/// Lowercased host of a URL, without port
pub fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

/// Whether a host is a Tor hidden service
pub fn is_onion_host(host: &str) -> bool {
    host.to_ascii_lowercase().ends_with(".onion")
}

/// Turn an event payload into a seed URL.
///
/// Full URLs are normalized as they are; bare domains are crawled from
/// `http://<domain>/`.
pub fn seed_url(payload: &str) -> Option<String> {
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }

    if payload.contains("://") {
        normalize_url(payload)
    } else {
        normalize_url(&format!("http://{}/", payload.trim_end_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_fragment() {
        assert_eq!(
            normalize_url("http://abc123.onion/page#top").as_deref(),
            Some("http://abc123.onion/page")
        );
    }

    #[test]
    fn test_root_path_and_case() {
        assert_eq!(
            normalize_url("HTTP://ABC123.Onion").as_deref(),
            Some("http://abc123.onion/")
        );
        assert_eq!(
            normalize_url("http://abc123.onion:80/a?b=1").as_deref(),
            Some("http://abc123.onion/a?b=1")
        );
    }

    #[test]
    fn test_rejects_non_http() {
        assert!(normalize_url("mailto:admin@abc123.onion").is_none());
        assert!(normalize_url("ftp://abc123.onion/").is_none());
        assert!(normalize_url("/relative/path").is_none());
    }

    #[test]
    fn test_host_helpers() {
        assert_eq!(host_of("http://Forum.ABC.onion:8080/x").as_deref(), Some("forum.abc.onion"));
        assert!(is_onion_host("dread.ONION"));
        assert!(!is_onion_host("example.com"));
    }

    #[test]
    fn test_seed_url() {
        assert_eq!(seed_url("abc123.onion").as_deref(), Some("http://abc123.onion/"));
        assert_eq!(
            seed_url("https://abc123.onion/forum/").as_deref(),
            Some("https://abc123.onion/forum/")
        );
        assert!(seed_url("   ").is_none());
    }
}
