//! Fluent search API and result post-processing helpers.
//!
//! Kept from the teacher as the ergonomic entry point above the provider
//! runtime: `SearchBuilder` chains [`crate::types::SearchOptions`] fields
//! and dispatches through a [`Registry`] instead of the teacher's flat
//! `Sources` collection. `SearchResultExt` is unchanged in spirit — a
//! convenience layer on top of (not a replacement for) the Paginator's own
//! id-based dedup.

use crate::error::{Error, Result as LuminaryResult, TrackedError};
use crate::registry::Registry;
use crate::types::{Manga, SearchField, SearchOptions, SortKey};

/// Fluent builder over [`SearchOptions`], dispatching through a [`Registry`].
pub struct SearchBuilder<'a> {
    registry: &'a Registry,
    options: SearchOptions,
}

impl<'a> SearchBuilder<'a> {
    pub(crate) fn new(registry: &'a Registry, query: impl Into<String>) -> Self {
        Self {
            registry,
            options: query.into().into(),
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = limit;
        self
    }

    pub fn pages(mut self, pages: usize) -> Self {
        self.options.pages = pages;
        self
    }

    pub fn sort(mut self, sort: SortKey) -> Self {
        self.options.sort = sort;
        self
    }

    pub fn fields(mut self, fields: Vec<SearchField>) -> Self {
        self.options.fields = fields;
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.filters.insert(field.into(), value.into());
        self
    }

    pub fn include_alt_titles(mut self, include: bool) -> Self {
        self.options.include_alt_titles = include;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.options.concurrency = concurrency.max(1);
        self
    }

    /// Searches every registered provider concurrently, returning the
    /// union of successful results. Individual provider failures are
    /// logged and isolated; only an all-providers-failed outcome is
    /// surfaced as an error.
    pub async fn flatten(self) -> LuminaryResult<Vec<Manga>> {
        let grouped = self.group().await;
        let mut all_results = Vec::new();
        let mut errors = Vec::new();

        for (provider_id, result) in grouped {
            match result {
                Ok(mut manga) => all_results.append(&mut manga),
                Err(e) => errors.push(format!("{provider_id}: {e}")),
            }
        }

        if all_results.is_empty() && !errors.is_empty() {
            return Err(Error::Other(format!(
                "all providers failed: {}",
                errors.join(", ")
            )));
        }

        Ok(all_results)
    }

    /// Searches every registered provider concurrently, returning each
    /// provider's result (or error) separately.
    pub async fn group(self) -> Vec<(String, LuminaryResult<Vec<Manga>>)> {
        let providers = self.registry.list();
        let futures = providers.into_iter().map(|provider| {
            let query = self.options.query.clone();
            let options = self.options.clone();
            async move {
                let provider_id = provider.id().to_string();
                let result = provider
                    .search(&query, &options)
                    .await
                    .map(|mut manga| {
                        for m in &mut manga {
                            m.provider_id = provider_id.clone();
                        }
                        manga
                    })
                    .map_err(|e: TrackedError| Error::provider(provider_id.clone(), e.to_string()));
                (provider_id, result)
            }
        });

        futures::future::join_all(futures).await
    }

    /// Searches a single named provider.
    pub async fn from_provider(self, provider_id: &str) -> LuminaryResult<Vec<Manga>> {
        let provider = self
            .registry
            .get(provider_id)
            .map_err(|e| Error::provider(provider_id, e.to_string()))?;
        let mut results = provider
            .search(&self.options.query, &self.options)
            .await
            .map_err(|e| Error::provider(provider_id, e.to_string()))?;
        for manga in &mut results {
            manga.provider_id = provider_id.to_string();
        }
        Ok(results)
    }

    /// Returns the built options without executing the search.
    pub fn build(self) -> SearchOptions {
        self.options
    }
}

impl Registry {
    /// Starts a fluent search across every registered provider.
    pub fn search(&self, query: impl Into<String>) -> SearchBuilder<'_> {
        SearchBuilder::new(self, query)
    }
}

/// Post-processing helpers for `Vec<Manga>` search results.
pub trait SearchResultExt {
    /// Keeps entries whose metadata-completeness score is at least
    /// `min_popularity_score` (description +2, authors +1, cover +1, 3+
    /// tags +1, 5+ tags +1 more; 0-6 range).
    fn filter_popular(self, min_popularity_score: usize) -> Self;
    /// Removes duplicate titles (case-insensitive), keeping the first seen.
    fn dedupe_by_title(self) -> Self;
    /// Sorts by a metadata-completeness relevance heuristic, most relevant
    /// first.
    fn sort_by_relevance(self) -> Self;
    /// Sorts by how well each title matches `query`, most relevant first.
    fn sort_by_query_relevance(self, query: &str) -> Self;
}

impl SearchResultExt for Vec<Manga> {
    fn filter_popular(self, min_popularity_score: usize) -> Self {
        self.into_iter()
            .filter(|manga| popularity_score(manga) >= min_popularity_score)
            .collect()
    }

    fn dedupe_by_title(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.retain(|manga| seen.insert(manga.title.to_lowercase()));
        self
    }

    fn sort_by_relevance(mut self) -> Self {
        self.sort_by(|a, b| {
            relevance_score(b)
                .cmp(&relevance_score(a))
                .then_with(|| a.title.len().cmp(&b.title.len()))
        });
        self
    }

    fn sort_by_query_relevance(mut self, query: &str) -> Self {
        let query_lower = query.to_lowercase();
        self.sort_by(|a, b| {
            query_relevance_score(b, &query_lower)
                .cmp(&query_relevance_score(a, &query_lower))
                .then_with(|| a.title.len().cmp(&b.title.len()))
        });
        self
    }
}

fn popularity_score(manga: &Manga) -> usize {
    let mut score = 0;
    if manga.description.as_deref().is_some_and(|d| !d.trim().is_empty()) {
        score += 2;
    }
    if !manga.authors.is_empty() {
        score += 1;
    }
    if manga.cover_url.is_some() {
        score += 1;
    }
    let tag_count = manga.tags.len();
    if tag_count >= 3 {
        score += 1;
    }
    if tag_count >= 5 {
        score += 1;
    }
    score
}

fn relevance_score(manga: &Manga) -> u32 {
    let mut score = 0u32;
    if manga.description.as_deref().is_some_and(|d| !d.trim().is_empty()) {
        score += 10;
    }
    if !manga.authors.is_empty() {
        score += 5;
    }
    let tag_count = manga.tags.len();
    if tag_count >= 3 {
        score += 5;
    }
    if tag_count >= 5 {
        score += 5;
    }
    let title_len = manga.title.len();
    score += if title_len <= 20 {
        15
    } else if title_len <= 40 {
        10
    } else {
        5
    };
    if manga.title.contains("Official") || manga.title.contains("Colored") {
        score += 8;
    }
    if manga.title.chars().all(|c| c.is_ascii()) {
        score += 3;
    }
    score
}

fn query_relevance_score(manga: &Manga, query: &str) -> u32 {
    let mut score = 0u32;
    let title_lower = manga.title.to_lowercase();

    if title_lower == query {
        score += 100;
    } else if title_lower.contains(query) {
        score += 50;
    } else {
        let query_words: Vec<&str> = query.split_whitespace().collect();
        let title_words: Vec<&str> = title_lower.split_whitespace().collect();
        let mut word_matches = 0;
        for query_word in &query_words {
            if title_words
                .iter()
                .any(|tw| tw.contains(query_word) || query_word.contains(tw))
            {
                word_matches += 1;
            }
        }
        if !query_words.is_empty() {
            score += (word_matches * 25) / query_words.len() as u32;
        }
    }

    if let Some(desc) = &manga.description {
        if desc.to_lowercase().contains(query) {
            score += 15;
        }
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manga(title: &str) -> Manga {
        Manga {
            id: title.to_string(),
            provider_id: "test".to_string(),
            title: title.to_string(),
            alt_titles: vec![],
            authors: vec![],
            tags: vec![],
            status: None,
            description: None,
            cover_url: None,
        }
    }

    #[test]
    fn dedupe_by_title_is_case_insensitive() {
        let results = vec![manga("One Piece"), manga("one piece"), manga("Naruto")];
        let deduped = results.dedupe_by_title();
        assert_eq!(deduped.len(), 2);
    }

    #[test]
    fn sort_by_query_relevance_prefers_exact_match() {
        let results = vec![manga("One Piece Colored"), manga("One Piece")];
        let sorted = results.sort_by_query_relevance("one piece");
        assert_eq!(sorted[0].title, "One Piece");
    }

    #[test]
    fn filter_popular_drops_sparse_entries() {
        let mut rich = manga("Rich");
        rich.description = Some("a long plot synopsis".into());
        rich.authors = vec!["Author".into()];
        rich.cover_url = Some("http://x/cover.jpg".into());
        let sparse = manga("Sparse");

        let results = vec![rich, sparse].filter_popular(3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Rich");
    }
}
