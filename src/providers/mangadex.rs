//! Concrete MangaDex provider (API flavor).
//!
//! Generalizes the teacher's `sources/mangadex.rs` onto the [`Provider`]
//! trait: same response shapes, same locale-priority title/description
//! resolution, same relationship-based author/cover-art lookup, same
//! at-home-server page resolution — now built atop [`HttpClient`] and
//! [`crate::paginator::Paginator`] instead of a hand-rolled offset loop.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, TrackedError};
use crate::extractor::{ExtractorSet, Rule, Transform};
use crate::net::HttpClient;
use crate::paginator::{PageFetcher, PageResult, PaginationOptions, Paginator};
use crate::provider::Provider;
use crate::providers::api::{paged_query, resolve_at_home_pages};
use crate::types::{Chapter, ChapterInfo, Manga, MangaInfo, Page, SearchOptions};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<Value>,
    total: usize,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ChapterListResponse {
    data: Vec<Value>,
    total: usize,
    limit: usize,
    offset: usize,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    #[serde(rename = "type")]
    rel_type: String,
    attributes: Option<RelationshipAttributes>,
}

#[derive(Debug, Deserialize)]
struct RelationshipAttributes {
    name: Option<String>,
    #[serde(rename = "fileName")]
    file_name: Option<String>,
}

/// Field rules for a manga's scalar attributes; relationship-typed fields
/// (authors, cover art) are a filter-then-map join the Rule model doesn't
/// express, so those stay hand-resolved in [`MangaDexProvider::map_manga`].
fn manga_extractor() -> ExtractorSet {
    ExtractorSet::new()
        .with_rule(Rule::new(&["id"], "id").required())
        .with_rule(Rule::new(&["attributes", "title"], "title").with_transform(Transform::PreferLocale))
        .with_rule(Rule::new(&["attributes", "description"], "description").with_transform(Transform::PreferLocale))
        .with_rule(Rule::new(&["attributes", "status"], "status"))
}

/// Each `altTitles` array element is itself a locale map, not a field
/// wrapping one, so this rule's path is the element root.
fn alt_title_extractor() -> ExtractorSet {
    ExtractorSet::new().with_rule(Rule::new(&[], "value").with_transform(Transform::PreferLocale))
}

fn tag_extractor() -> ExtractorSet {
    ExtractorSet::new().with_rule(Rule::new(&["attributes", "name"], "name").with_transform(Transform::PreferLocale))
}

fn chapter_extractor() -> ExtractorSet {
    ExtractorSet::new()
        .with_rule(Rule::new(&["id"], "id").required())
        .with_rule(Rule::new(&["attributes", "title"], "title"))
        .with_rule(Rule::new(&["attributes", "chapter"], "chapter"))
        .with_rule(Rule::new(&["attributes", "volume"], "volume"))
        .with_rule(Rule::new(&["attributes", "publishAt"], "publishAt"))
        .with_rule(Rule::new(&["attributes", "translatedLanguage"], "translatedLanguage"))
}

fn extracted_str(map: &std::collections::BTreeMap<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct AtHomeResponse {
    #[serde(rename = "baseUrl")]
    base_url: String,
    chapter: AtHomeChapter,
}

#[derive(Debug, Deserialize)]
struct AtHomeChapter {
    hash: String,
    data: Vec<String>,
    #[serde(rename = "dataSaver")]
    data_saver: Vec<String>,
}

const CHAPTER_FEED_PAGE_SIZE: usize = 100;

pub struct MangaDexProvider {
    client: HttpClient,
    api_base: String,
}

impl MangaDexProvider {
    pub fn new() -> Self {
        Self {
            client: HttpClient::new("mgd")
                .with_rate_limit(std::time::Duration::from_secs(1))
                .with_max_retries(3),
            api_base: "https://api.mangadex.org".to_string(),
        }
    }

    fn map_manga(&self, data: &Value) -> Result<Manga, TrackedError> {
        let map = manga_extractor().extract(data)?;
        let id = extracted_str(&map, "id").unwrap_or_default();
        let title = extracted_str(&map, "title").unwrap_or_else(|| "Unknown Title".to_string());
        let description = extracted_str(&map, "description");
        let status = extracted_str(&map, "status");

        let alt_titles: Vec<String> = alt_title_extractor()
            .extract_list(data, "attributes.altTitles")
            .iter()
            .filter_map(|m| extracted_str(m, "value"))
            .collect();

        let tags: Vec<String> = tag_extractor()
            .extract_list(data, "attributes.tags")
            .iter()
            .filter_map(|m| extracted_str(m, "name"))
            .collect();

        let relationships: Vec<Relationship> = data
            .get("relationships")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let authors: Vec<String> = relationships
            .iter()
            .filter(|r| r.rel_type == "author" || r.rel_type == "artist")
            .filter_map(|r| r.attributes.as_ref()?.name.clone())
            .collect();

        let cover_url = relationships
            .iter()
            .find(|r| r.rel_type == "cover_art")
            .and_then(|r| r.attributes.as_ref()?.file_name.clone())
            .map(|filename| format!("https://uploads.mangadex.org/covers/{id}/{filename}"));

        Ok(Manga {
            id,
            provider_id: self.id().to_string(),
            title,
            alt_titles,
            authors,
            tags,
            status,
            description,
            cover_url,
        })
    }

    fn map_chapter(&self, data: &Value, manga_id: &str) -> Result<ChapterInfo, TrackedError> {
        let map = chapter_extractor().extract(data)?;
        let number = extracted_str(&map, "chapter")
            .and_then(|c| c.parse::<f64>().ok())
            .unwrap_or(0.0);

        Ok(ChapterInfo {
            id: extracted_str(&map, "id").unwrap_or_default(),
            manga_id: manga_id.to_string(),
            provider_id: self.id().to_string(),
            title: extracted_str(&map, "title").unwrap_or_default(),
            number,
            volume: extracted_str(&map, "volume"),
            language: extracted_str(&map, "translatedLanguage"),
            published_at: extracted_str(&map, "publishAt"),
        })
    }

    async fn get_manga_impl(&self, manga_id: &str, all_languages: bool) -> Result<MangaInfo, TrackedError> {
        #[derive(Deserialize)]
        struct MangaResponse {
            data: Value,
        }
        let url = format!("{}/manga/{manga_id}?includes[]=cover_art&includes[]=author", self.api_base);
        let response: MangaResponse = self.client.get_json(&url).await?;
        let manga = self.map_manga(&response.data)?;

        let fetcher = ChapterFeedFetcher {
            provider: self,
            manga_id: manga_id.to_string(),
            all_languages,
        };
        let chapters = Paginator::run(&fetcher, PaginationOptions::default()).await?;

        Ok(MangaInfo {
            manga,
            chapters,
            last_updated: None,
        })
    }

    fn search_query(&self, query: &str, options: &SearchOptions) -> String {
        let mut parts = vec!["includes[]=cover_art".to_string(), "includes[]=author".to_string()];
        if !query.trim().is_empty() {
            parts.push(format!("title={}", urlencoding::encode(query)));
        }
        match options.sort {
            crate::types::SortKey::Newest => parts.push("order[createdAt]=desc".to_string()),
            crate::types::SortKey::Updated => parts.push("order[updatedAt]=desc".to_string()),
            crate::types::SortKey::Name => parts.push("order[title]=asc".to_string()),
            _ => parts.push("order[relevance]=desc".to_string()),
        }
        for rating in ["safe", "suggestive", "erotica", "pornographic"] {
            parts.push(format!("contentRating[]={rating}"));
        }
        parts.join("&")
    }
}

impl Default for MangaDexProvider {
    fn default() -> Self {
        Self::new()
    }
}

struct SearchPageFetcher<'a> {
    provider: &'a MangaDexProvider,
    base_params: String,
}

#[async_trait]
impl PageFetcher<Manga> for SearchPageFetcher<'_> {
    async fn fetch_page(&self, page: usize) -> Result<PageResult<Manga>, TrackedError> {
        let offset = page * CHAPTER_FEED_PAGE_SIZE;
        let page_params = paged_query(&[], CHAPTER_FEED_PAGE_SIZE, offset);
        let url = format!("{}/manga?{}&{page_params}", self.provider.api_base, self.base_params);
        let response: SearchResponse = self.provider.client.get_json(&url).await?;
        let items = response
            .data
            .iter()
            .map(|d| self.provider.map_manga(d))
            .collect::<Result<Vec<_>, TrackedError>>()?;
        Ok(PageResult {
            items,
            total: Some(response.total),
        })
    }
}

struct ChapterFeedFetcher<'a> {
    provider: &'a MangaDexProvider,
    manga_id: String,
    all_languages: bool,
}

#[async_trait]
impl PageFetcher<ChapterInfo> for ChapterFeedFetcher<'_> {
    async fn fetch_page(&self, page: usize) -> Result<PageResult<ChapterInfo>, TrackedError> {
        let offset = page * CHAPTER_FEED_PAGE_SIZE;
        let page_params = paged_query(&[], CHAPTER_FEED_PAGE_SIZE, offset);
        let language_filter = if self.all_languages { "" } else { "&translatedLanguage[]=en" };
        let url = format!(
            "{}/manga/{}/feed?{page_params}{language_filter}&order[volume]=asc&order[chapter]=asc\
             &contentRating[]=safe&contentRating[]=suggestive&contentRating[]=erotica&contentRating[]=pornographic",
            self.provider.api_base, self.manga_id
        );
        let response: ChapterListResponse = self.provider.client.get_json(&url).await?;
        let items = response
            .data
            .iter()
            .map(|d| self.provider.map_chapter(d, &self.manga_id))
            .collect::<Result<Vec<_>, TrackedError>>()?;
        Ok(PageResult {
            items,
            total: Some(response.total),
        })
    }
}

#[async_trait]
impl Provider for MangaDexProvider {
    fn id(&self) -> &'static str {
        "mgd"
    }

    fn name(&self) -> &'static str {
        "MangaDex"
    }

    fn description(&self) -> &'static str {
        "MangaDex.org, a large open-source, multilingual manga platform."
    }

    fn site_url(&self) -> &str {
        "https://mangadex.org"
    }

    fn http_client(&self) -> &HttpClient {
        &self.client
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Manga>, TrackedError> {
        let fetcher = SearchPageFetcher {
            provider: self,
            base_params: self.search_query(query, options),
        };
        Paginator::run(
            &fetcher,
            PaginationOptions {
                pages: options.pages,
                limit: options.limit,
                concurrency: options.concurrency,
            },
        )
        .await
    }

    async fn get_manga(&self, manga_id: &str) -> Result<MangaInfo, TrackedError> {
        self.get_manga_impl(manga_id, false).await
    }

    async fn get_manga_with_languages(&self, manga_id: &str, all_languages: bool) -> Result<MangaInfo, TrackedError> {
        self.get_manga_impl(manga_id, all_languages).await
    }

    async fn get_chapter(&self, chapter_id: &str) -> Result<Chapter, TrackedError> {
        #[derive(Deserialize)]
        struct ChapterResponse {
            data: Value,
        }
        let chapter_url = format!("{}/chapter/{chapter_id}", self.api_base);
        let response: ChapterResponse = self.client.get_json(&chapter_url).await?;
        let manga_id = String::new();
        let info = self.map_chapter(&response.data, &manga_id)?;

        let at_home_url = format!("{}/at-home/server/{chapter_id}", self.api_base);
        let at_home: AtHomeResponse = self.client.get_json(&at_home_url).await?;

        if at_home.chapter.hash.is_empty() || at_home.base_url.is_empty() {
            return Err(TrackedError::from(Error::parse("at-home response missing base url or hash")));
        }

        let page_urls = if !at_home.chapter.data.is_empty() {
            resolve_at_home_pages(&at_home.base_url, "data", &at_home.chapter.hash, &at_home.chapter.data)
        } else {
            resolve_at_home_pages(
                &at_home.base_url,
                "data-saver",
                &at_home.chapter.hash,
                &at_home.chapter.data_saver,
            )
        };

        if page_urls.is_empty() {
            return Err(TrackedError::from(Error::not_found(format!(
                "no pages found for chapter {chapter_id}"
            ))));
        }

        let pages = page_urls
            .into_iter()
            .enumerate()
            .map(|(i, url)| {
                let filename = crate::downloader::extract_extension(&url)
                    .map(|ext| format!("page_{i:03}.{ext}"))
                    .unwrap_or_else(|| format!("page_{i:03}.jpg"));
                Page { index: i, url, filename }
            })
            .collect();

        Ok(Chapter { info, pages })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn map_manga_prefers_english_title_and_resolves_cover() {
        let provider = MangaDexProvider::new();
        let data: Value = json!({
            "id": "abc",
            "attributes": {
                "title": {"ja": "ワンピース", "en": "One Piece"},
                "altTitles": [],
                "description": {"en": "A pirate adventure."},
                "status": "ongoing",
                "tags": [],
            },
            "relationships": [
                {"type": "cover_art", "attributes": {"fileName": "cover.jpg"}},
                {"type": "author", "attributes": {"name": "Oda"}},
            ],
        });

        let manga = provider.map_manga(&data).unwrap();
        assert_eq!(manga.title, "One Piece");
        assert_eq!(manga.authors, vec!["Oda".to_string()]);
        assert_eq!(
            manga.cover_url,
            Some("https://uploads.mangadex.org/covers/abc/cover.jpg".to_string())
        );
    }

    #[test]
    fn map_chapter_parses_fractional_number() {
        let provider = MangaDexProvider::new();
        let data: Value = json!({
            "id": "c1",
            "attributes": {
                "title": null,
                "chapter": "12.5",
                "volume": "2",
                "publishAt": null,
                "translatedLanguage": "en",
            },
        });

        let info = provider.map_chapter(&data, "abc").unwrap();
        assert_eq!(info.number, 12.5);
        assert_eq!(info.volume, Some("2".to_string()));
    }
}
