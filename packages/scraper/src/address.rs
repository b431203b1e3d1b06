//! Address derivation and normalization.
//!
//! Listing pages are derived from a base address by appending a page-index
//! path segment. Item links are resolved against the site root and stripped
//! of tracking query parameters so the same product reached through two
//! different campaign links deduplicates to one address.

use url::Url;

use crate::ScrapeError;

/// Placeholder replaced by the page number in a pagination template.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Query parameters stripped from item links when the site profile does not
/// list its own. A trailing `*` matches any parameter with that prefix.
pub const DEFAULT_TRACKING_PARAMS: &[&str] = &[
    "utm_*", "fbclid", "gclid", "msclkid", "mc_cid", "mc_eid", "_pos", "_sid", "_ss", "ref",
];

/// Parses an absolute `http(s)` address.
///
/// # Errors
///
/// Returns [`ScrapeError::InvalidUrl`] if `url` does not parse or uses a
/// scheme other than `http`/`https`.
pub fn parse_http_url(url: &str) -> Result<Url, ScrapeError> {
    let parsed = Url::parse(url.trim()).map_err(|e| ScrapeError::InvalidUrl {
        url: url.to_owned(),
        message: e.to_string(),
    })?;
    if !is_http(&parsed) {
        return Err(ScrapeError::InvalidUrl {
            url: url.to_owned(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(parsed)
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Returns the address of listing page `page` (1-based).
///
/// Page 1 is `base` itself. Later pages append the segments of `template`
/// with [`PAGE_PLACEHOLDER`] replaced by the page number, keeping any query
/// string on the base address. `https://shop.test/seeds` with template
/// `page/{page}` gives `https://shop.test/seeds/page/3` for page 3.
///
/// A template starting with `?` (e.g. `?page={page}`) is added to the
/// query string instead, replacing any existing parameter of the same name.
///
/// # Errors
///
/// Returns [`ScrapeError::InvalidUrl`] if `base` cannot have path segments.
pub fn page_url(base: &Url, template: &str, page: u32) -> Result<Url, ScrapeError> {
    if page <= 1 {
        return Ok(base.clone());
    }

    let suffix = template.replace(PAGE_PLACEHOLDER, &page.to_string());
    let mut url = base.clone();

    if let Some(query) = suffix.strip_prefix('?') {
        let added: Vec<(&str, &str)> = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
            .collect();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !added.iter().any(|(name, _)| key == name))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .extend_pairs(added);
        return Ok(url);
    }

    url.path_segments_mut()
        .map_err(|()| ScrapeError::InvalidUrl {
            url: base.to_string(),
            message: "address cannot be a base".to_owned(),
        })?
        .pop_if_empty()
        .extend(suffix.split('/').filter(|segment| !segment.is_empty()));
    Ok(url)
}

/// Returns `true` if `key` is one of the `strip` parameters.
fn is_stripped(key: &str, strip: &[String]) -> bool {
    strip.iter().any(|pattern| {
        pattern
            .strip_suffix('*')
            .map_or_else(|| key == pattern.as_str(), |prefix| key.starts_with(prefix))
    })
}

/// Resolves an item link against the site root and canonicalizes it.
///
/// Returns `None` for links that are not navigable pages (empty, fragment
/// only, `javascript:`/`mailto:`, non-`http(s)` after resolution). The
/// fragment is dropped and every query parameter matched by `strip` is
/// removed; the query is left untouched when nothing matches.
#[must_use]
pub fn normalize_item_url(root: &Url, href: &str, strip: &[String]) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = root.join(href).ok()?;
    if !is_http(&url) {
        return None;
    }
    url.set_fragment(None);

    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let kept: Vec<&(String, String)> = pairs
            .iter()
            .filter(|(key, _)| !is_stripped(key, strip))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else if kept.len() != pairs.len() {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
    }

    Some(url.to_string())
}

/// Resolves an asset reference (e.g. an image `src`) relative to the page it
/// appeared on. Returns `None` unless the result is an `http(s)` address.
#[must_use]
pub fn resolve_asset_url(page: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("data:") {
        return None;
    }
    page.join(href).ok().filter(is_http)
}

/// Returns the default tracking parameter list as owned strings.
#[must_use]
pub fn default_tracking_params() -> Vec<String> {
    DEFAULT_TRACKING_PARAMS
        .iter()
        .map(|&p| p.to_owned())
        .collect()
}
