//! Generic Web (HTML-scraping) flavor.
//!
//! Drives HTML pages described by a [`WebSelectors`] dictionary of candidate
//! CSS selectors per field; for each field the first selector that yields a
//! non-empty match wins, generalizing the candidate-selector-list pattern
//! the teacher hand-rolled per call site in `kissmanga.rs`. Chapter number
//! is extracted by regex from the chapter title or URL path, also
//! generalizing `kissmanga.rs`'s `extract_chapter_number`.
//!
//! [`crate::providers::madara`] builds on the free functions here rather
//! than on [`WebProvider`] directly, since the Madara specialization
//! overrides enough of search/chapter-enumeration that composing a `Provider`
//! impl out of shared helpers reads clearer than simulating inheritance.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

use crate::error::{Error, TrackedError};
use crate::net::{html, HttpClient};
use crate::provider::Provider;
use crate::types::{Chapter, ChapterInfo, Manga, MangaInfo, Page, SearchOptions};

/// Candidate CSS selectors per field. Every `Vec` is tried in order; the
/// first selector producing a non-empty match is used.
#[derive(Debug, Clone)]
pub struct WebSelectors {
    pub listing_item: Vec<&'static str>,
    pub cover: Vec<&'static str>,
    pub description: Vec<&'static str>,
    pub authors: Vec<&'static str>,
    pub tags: Vec<&'static str>,
    pub status: Vec<&'static str>,
    pub chapter_list: Vec<&'static str>,
    pub chapter_date: Vec<&'static str>,
    pub page_image: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct WebConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub base_url: String,
    pub selectors: WebSelectors,
}

/// First selector (in order) whose first match has non-empty text.
pub fn first_nonempty_text(doc: &Html, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|sel| html::select_text(doc, sel).filter(|t| !t.is_empty()))
}

/// First selector whose first match has a non-empty `attr` value.
pub fn first_nonempty_attr(doc: &Html, candidates: &[&str], attr: &str) -> Option<String> {
    candidates
        .iter()
        .find_map(|sel| html::select_attr(doc, sel, attr).filter(|v| !v.is_empty()))
}

/// First selector that matches at least one element, returning every
/// matched element's text.
pub fn first_nonempty_all_text(doc: &Html, candidates: &[&str]) -> Vec<String> {
    for sel in candidates {
        let texts = html::select_all_text(doc, sel);
        if !texts.is_empty() {
            return texts;
        }
    }
    Vec::new()
}

/// First selector that matches at least one element, returning every
/// matched element's `attr` value.
pub fn first_nonempty_all_attr(doc: &Html, candidates: &[&str], attr: &str) -> Vec<String> {
    for sel in candidates {
        let attrs = html::select_all_attr(doc, sel, attr);
        if !attrs.is_empty() {
            return attrs;
        }
    }
    Vec::new()
}

static CHAPTER_NUMBER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(?:chapter|ch\.?)\s*(\d+(?:\.\d+)?)",
        r"(\d+(?:\.\d+)?)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static chapter-number pattern compiles"))
    .collect()
});

static VOLUME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)vol(?:ume)?\.?\s*(\d+)").expect("static volume pattern compiles"));

/// Extracts a fractional chapter number from free text (a chapter title or
/// URL path), trying `"Chapter N"` / `"Ch. N"` first, then any standalone
/// number.
pub fn infer_chapter_number(text: &str) -> Option<f64> {
    CHAPTER_NUMBER_PATTERNS.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    })
}

/// Extracts a volume label from free text via `Vol[.]? N`.
pub fn infer_volume(text: &str) -> Option<String> {
    VOLUME_PATTERN
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Resolves a possibly-relative URL against `base_url`.
pub fn full_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http") {
        return path.to_string();
    }
    if let Some(rest) = path.strip_prefix("//") {
        return format!("https://{rest}");
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Last non-empty path segment of a URL, used as an id when a site has no
/// other stable identifier.
pub fn last_path_segment(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .map(str::to_string)
}

/// Standalone generic Web provider, fully parameterized by [`WebConfig`].
pub struct WebProvider {
    config: WebConfig,
    client: HttpClient,
}

impl WebProvider {
    pub fn new(config: WebConfig) -> Self {
        Self {
            client: HttpClient::new(config.id),
            config,
        }
    }

    fn manga_page_url(&self, manga_id: &str) -> String {
        full_url(&self.config.base_url, manga_id)
    }
}

#[async_trait]
impl Provider for WebProvider {
    fn id(&self) -> &'static str {
        self.config.id
    }

    fn name(&self) -> &'static str {
        self.config.name
    }

    fn description(&self) -> &'static str {
        self.config.description
    }

    fn site_url(&self) -> &str {
        &self.config.base_url
    }

    fn http_client(&self) -> &HttpClient {
        &self.client
    }

    async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Manga>, TrackedError> {
        let url = format!("{}/?s={}", self.config.base_url, urlencoding::encode(query));
        let html_str = self.client.get_text(&url).await?;
        let doc = html::parse(&html_str);

        let links = first_nonempty_all_attr(&doc, &self.config.selectors.listing_item, "href");
        let titles = first_nonempty_all_text(&doc, &self.config.selectors.listing_item);

        let mut manga: Vec<Manga> = links
            .into_iter()
            .zip(titles)
            .filter_map(|(href, title)| {
                if title.is_empty() || href.is_empty() {
                    return None;
                }
                Some(Manga {
                    id: last_path_segment(&href)?,
                    provider_id: self.id().to_string(),
                    title,
                    alt_titles: vec![],
                    authors: vec![],
                    tags: vec![],
                    status: None,
                    description: None,
                    cover_url: None,
                })
            })
            .collect();

        if options.limit > 0 {
            manga.truncate(options.limit);
        }
        Ok(manga)
    }

    async fn get_manga(&self, manga_id: &str) -> Result<MangaInfo, TrackedError> {
        let url = self.manga_page_url(manga_id);
        let html_str = self.client.get_text(&url).await?;
        let doc = html::parse(&html_str);

        let title = first_nonempty_text(&doc, &self.config.selectors.listing_item)
            .or_else(|| html::select_text(&doc, "title"))
            .unwrap_or_else(|| manga_id.to_string());
        let description = first_nonempty_text(&doc, &self.config.selectors.description);
        let cover_url = first_nonempty_attr(&doc, &self.config.selectors.cover, "src")
            .map(|src| full_url(&self.config.base_url, &src));
        let authors = first_nonempty_all_text(&doc, &self.config.selectors.authors);
        let tags = first_nonempty_all_text(&doc, &self.config.selectors.tags);
        let status = first_nonempty_text(&doc, &self.config.selectors.status);

        let chapter_links = first_nonempty_all_attr(&doc, &self.config.selectors.chapter_list, "href");
        let chapter_titles = first_nonempty_all_text(&doc, &self.config.selectors.chapter_list);
        let chapter_dates = first_nonempty_all_text(&doc, &self.config.selectors.chapter_date);

        let chapters: Vec<ChapterInfo> = chapter_links
            .into_iter()
            .zip(chapter_titles)
            .enumerate()
            .filter_map(|(i, (href, title))| {
                if href.is_empty() {
                    return None;
                }
                let number = infer_chapter_number(&title)
                    .or_else(|| infer_chapter_number(&href))
                    .unwrap_or((i + 1) as f64);
                Some(ChapterInfo {
                    id: href,
                    manga_id: manga_id.to_string(),
                    provider_id: self.id().to_string(),
                    title,
                    number,
                    volume: None,
                    language: None,
                    published_at: chapter_dates.get(i).cloned(),
                })
            })
            .collect();

        Ok(MangaInfo {
            manga: Manga {
                id: manga_id.to_string(),
                provider_id: self.id().to_string(),
                title,
                alt_titles: vec![],
                authors,
                tags,
                status,
                description,
                cover_url,
            },
            chapters,
            last_updated: None,
        })
    }

    async fn get_chapter(&self, chapter_id: &str) -> Result<Chapter, TrackedError> {
        let url = full_url(&self.config.base_url, chapter_id);
        let html_str = self.client.get_text(&url).await?;
        let doc = html::parse(&html_str);

        let image_urls = first_nonempty_all_attr(&doc, &self.config.selectors.page_image, "src");
        if image_urls.is_empty() {
            return Err(TrackedError::from(Error::not_found(format!(
                "no pages found for chapter {chapter_id}"
            ))));
        }

        let pages = image_urls
            .into_iter()
            .enumerate()
            .map(|(i, url)| Page {
                index: i,
                filename: crate::downloader::extract_extension(&url)
                    .map(|ext| format!("page_{i:03}.{ext}"))
                    .unwrap_or_else(|| format!("page_{i:03}.jpg")),
                url: full_url(&self.config.base_url, &url),
            })
            .collect();

        Ok(Chapter {
            info: ChapterInfo {
                id: chapter_id.to_string(),
                manga_id: String::new(),
                provider_id: self.id().to_string(),
                title: String::new(),
                number: infer_chapter_number(chapter_id).unwrap_or(0.0),
                volume: infer_volume(chapter_id),
                language: None,
                published_at: None,
            },
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_chapter_number_prefers_chapter_prefix() {
        assert_eq!(infer_chapter_number("Chapter 42"), Some(42.0));
        assert_eq!(infer_chapter_number("Ch. 12.5"), Some(12.5));
        assert_eq!(infer_chapter_number("the-105-update"), Some(105.0));
        assert_eq!(infer_chapter_number("no numbers here"), None);
    }

    #[test]
    fn infer_volume_extracts_digits() {
        assert_eq!(infer_volume("Vol. 3 Chapter 10"), Some("3".to_string()));
        assert_eq!(infer_volume("Volume12"), Some("12".to_string()));
        assert_eq!(infer_volume("no volume"), None);
    }

    #[test]
    fn full_url_resolves_relative_and_protocol_relative() {
        assert_eq!(
            full_url("https://example.com", "/manga/one-piece"),
            "https://example.com/manga/one-piece"
        );
        assert_eq!(
            full_url("https://example.com", "//cdn.example.com/x.jpg"),
            "https://cdn.example.com/x.jpg"
        );
        assert_eq!(
            full_url("https://example.com", "https://already.absolute/x"),
            "https://already.absolute/x"
        );
    }

    #[test]
    fn last_path_segment_strips_trailing_slash() {
        assert_eq!(
            last_path_segment("https://example.com/manga/one-piece/"),
            Some("one-piece".to_string())
        );
    }

    #[test]
    fn first_nonempty_text_tries_candidates_in_order() {
        let doc = html::parse(r#"<div><h2 class="b">Fallback Title</h2></div>"#);
        let found = first_nonempty_text(&doc, &["h1.a", "h2.b"]);
        assert_eq!(found, Some("Fallback Title".to_string()));
    }
}
