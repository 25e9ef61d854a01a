//! Shared plumbing for the API flavor: JSON endpoints paginated by a
//! `{limit, offset}` pair, and the "at-home server" page-resolution pattern
//! (a base URL plus a hash plus a filename list, assembled as
//! `{base}/{hash}/{filename}`) used by providers whose image host is
//! decoupled from their API host.
//!
//! Concrete API providers (see [`crate::providers::mangadex`]) own their
//! response shapes directly via `serde::Deserialize`, the way the teacher's
//! MangaDex implementation did; this module only factors out the parts that
//! are identical across any such provider.

use std::collections::HashMap;

/// Builds a `key=value&...` query string for a `{limit, offset}` page,
/// percent-encoding every value.
pub fn paged_query(pairs: &[(&str, String)], limit: usize, offset: usize) -> String {
    let mut parts: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect();
    parts.push(format!("limit={limit}"));
    parts.push(format!("offset={offset}"));
    parts.join("&")
}

/// Picks the best title out of a locale → string map: `en` first, then the
/// first non-empty value in the map's iteration order. Mirrors
/// [`crate::extractor::Transform::PreferLocale`] for providers that parse
/// their responses with typed `serde` structs instead of the Field
/// Extractor.
pub fn prefer_locale(map: &HashMap<String, String>) -> Option<String> {
    if let Some(en) = map.get("en") {
        if !en.trim().is_empty() {
            return Some(en.trim().to_string());
        }
    }
    map.values()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Resolves at-home-server page URLs: `{base}/{variant}/{hash}/{filename}`
/// for each filename, in order. `variant` is typically `"data"` (full
/// quality) or `"data-saver"` (compressed fallback).
pub fn resolve_at_home_pages(base_url: &str, variant: &str, hash: &str, filenames: &[String]) -> Vec<String> {
    let base = base_url.trim_end_matches('/');
    filenames
        .iter()
        .map(|filename| format!("{base}/{variant}/{hash}/{filename}"))
        .collect()
}
