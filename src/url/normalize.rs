use crate::UrlError;
use url::Url;

/// Canonicalizes a URL for use as a frontier identity
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an `http` or `https` scheme
/// 3. Require a host (the `url` crate lowercases it while parsing)
/// 4. Remove fragment (everything after #)
///
/// Query parameter order and trailing slashes are left untouched: two URLs
/// are the same unit of work only if their canonical strings are equal.
///
/// # Examples
///
/// ```
/// use listing_harvester::url::canonicalize_url;
///
/// let url = canonicalize_url("https://WWW.Example.com/anuncio/ID1.html#gallery").unwrap();
/// assert_eq!(url.as_str(), "https://www.example.com/anuncio/ID1.html");
/// ```
pub fn canonicalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    Ok(url)
}

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be excluded:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel: and data: schemes
/// - anything that does not resolve to an HTTP(S) URL
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(e) => {
            tracing::debug!("Failed to resolve link '{}' against {}: {}", href, base_url, e);
            None
        }
    }
}
