//! Core data types exchanged between the runtime's components.
//!
//! These are value-typed records; none survive a process exit. Identity for
//! manga and chapters is always `(providerId, entityId)` — see
//! [`combined_id`] and [`split_combined_id`] for the external string form.
//!
//! - [`Manga`] / [`MangaInfo`] - a series and its full chapter list
//! - [`ChapterInfo`] / [`Chapter`] - chapter metadata and its ordered pages
//! - [`Page`] - one image in a chapter
//! - [`SearchOptions`] - query/sort/filter parameters for `Search`

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A manga/comic series with its metadata, as returned by `Search` and
/// `GetManga`. Identity is `(provider_id, id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manga {
    /// Unique identifier within the provider.
    pub id: String,
    /// Id of the provider this manga came from.
    pub provider_id: String,
    /// Display title.
    pub title: String,
    /// Alternative titles, in the order the provider reported them.
    #[serde(default)]
    pub alt_titles: Vec<String>,
    /// Authors, ordered.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Tags/genres, ordered by first-seen insertion.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form status string (e.g. "ongoing", "completed") when the
    /// provider exposes one.
    pub status: Option<String>,
    /// Plot summary or description.
    pub description: Option<String>,
    /// Cover image URL.
    pub cover_url: Option<String>,
}

/// A [`Manga`] extended with its full chapter list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MangaInfo {
    #[serde(flatten)]
    pub manga: Manga,
    /// Ordered chapter list; complete (paginated internally by the
    /// provider), not a single page of results.
    pub chapters: Vec<ChapterInfo>,
    /// ISO-8601 timestamp of the most recent chapter update, when known.
    pub last_updated: Option<String>,
}

/// Chapter identity and metadata, without page URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterInfo {
    /// Unique identifier within the provider.
    pub id: String,
    /// Id of the manga this chapter belongs to. May be empty when not
    /// recoverable from the chapter response alone.
    pub manga_id: String,
    /// Id of the provider this chapter came from.
    pub provider_id: String,
    /// Display title. May be empty, in which case callers should derive a
    /// label from `number`/`volume`.
    pub title: String,
    /// Fractional chapter number (e.g. `1.5`). `0.0` is a sentinel meaning
    /// "no known number" — never a negative value.
    pub number: f64,
    /// Volume label, when the provider or inference regex found one.
    pub volume: Option<String>,
    /// ISO-639-1 language code.
    pub language: Option<String>,
    /// ISO-8601 publication timestamp.
    pub published_at: Option<String>,
}

/// One page image within a [`Chapter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based index; equals this page's position in the owning
    /// `Chapter::pages` array.
    pub index: usize,
    /// Absolute URL to the image.
    pub url: String,
    /// Filename suggestion — provider-derived or synthesized as
    /// `page_NNN.ext`.
    pub filename: String,
}

/// A [`ChapterInfo`] extended with its ordered page set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(flatten)]
    pub info: ChapterInfo,
    /// Pages in reading order; `pages[i].index == i`.
    pub pages: Vec<Page>,
}

/// Sort key accepted by `Search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Relevance,
    Name,
    Newest,
    Updated,
    Popularity,
}

/// Fields a search query may be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Author,
    Genre,
}

/// Parameters accepted by `Provider::search`.
///
/// Built with [`derive_builder`], following the same fluent pattern as the
/// rest of the runtime's configuration types.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct SearchOptions {
    pub query: String,
    /// 0 means "provider default".
    #[builder(default)]
    pub limit: usize,
    /// 0 means "derive from limit".
    #[builder(default)]
    pub pages: usize,
    #[builder(default)]
    pub sort: SortKey,
    #[builder(default)]
    pub fields: Vec<SearchField>,
    /// Filter map, e.g. `{"author": "Oda"}`.
    #[builder(default)]
    pub filters: HashMap<String, String>,
    #[builder(default)]
    pub include_alt_titles: bool,
    /// Concurrency hint for bounded-parallel pagination; must be >= 1.
    #[builder(default = "1")]
    pub concurrency: usize,
}

impl From<&str> for SearchOptions {
    fn from(query: &str) -> Self {
        SearchOptionsBuilder::default()
            .query(query)
            .build()
            .expect("query is the only required field")
    }
}

impl From<String> for SearchOptions {
    fn from(query: String) -> Self {
        SearchOptionsBuilder::default()
            .query(query)
            .build()
            .expect("query is the only required field")
    }
}

/// Implemented by entities the Paginator can deduplicate by
/// `(providerId, entityId)`.
pub trait Identifiable {
    fn provider_id(&self) -> &str;
    fn entity_id(&self) -> &str;
}

impl Identifiable for Manga {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl Identifiable for ChapterInfo {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }
    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// Formats the external combined-id string form `providerId:entityId`.
pub fn combined_id(provider_id: &str, entity_id: &str) -> String {
    format!("{provider_id}:{entity_id}")
}

/// Splits a combined id at its first colon. The entity id may itself
/// contain further colons, so only the first is significant.
pub fn split_combined_id(combined: &str) -> Option<(&str, &str)> {
    let idx = combined.find(':')?;
    Some((&combined[..idx], &combined[idx + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_id_round_trips() {
        let s = combined_id("mgd", "abc-123");
        assert_eq!(s, "mgd:abc-123");
        assert_eq!(split_combined_id(&s), Some(("mgd", "abc-123")));
    }

    #[test]
    fn combined_id_preserves_further_colons_in_entity_id() {
        let (provider, entity) = split_combined_id("kmg:/manga/foo:bar/").unwrap();
        assert_eq!(provider, "kmg");
        assert_eq!(entity, "/manga/foo:bar/");
    }

    #[test]
    fn search_options_from_str() {
        let opts: SearchOptions = "one piece".into();
        assert_eq!(opts.query, "one piece");
        assert_eq!(opts.limit, 0);
        assert_eq!(opts.concurrency, 1);
    }

    #[test]
    fn sort_key_defaults_to_relevance() {
        assert_eq!(SortKey::default(), SortKey::Relevance);
    }
}
