//! URL canonicalization for visited-set identity.
//!
//! Two URLs that normalize identically are the same crawl target. Callers
//! treat `None` as "do not enqueue" — normalization failure is never an error.

use url::Url;

/// Canonicalize and validate a candidate URL.
///
/// Rules:
/// - non-HTTP(S) schemes are rejected;
/// - if parsing fails and the string carries no scheme, retry once with
///   `https://` prefixed (so bare hosts like `shop.example` are accepted);
/// - fragments are stripped;
/// - an empty path collapses to `/`;
/// - the host is lowercased (the `url` crate does this for http/https);
/// - a trailing slash on a non-root path is dropped, so `/about/` and
///   `/about` are one target.
pub fn normalize(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) if !trimmed.contains("://") => Url::parse(&format!("https://{trimmed}")).ok()?,
        Err(_) => return None,
    };

    canonicalize(parsed)
}

fn canonicalize(mut url: Url) -> Option<Url> {
    match url.scheme() {
        "http" | "https" => {}
        _ => return None,
    }

    url.host_str()?;
    url.set_fragment(None);

    if url.path().is_empty() {
        url.set_path("/");
    } else if url.path() != "/" && url.path().ends_with('/') {
        let trimmed = url.path().trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }

    Some(url)
}
