//! Madara (WordPress manga theme) specialization of the Web flavor.
//!
//! Generalizes the teacher's `sources/madara_configurable.rs` selector
//! dictionary and `sources/madara.rs`/`sources/kissmanga.rs` fallback
//! heuristics into the fuller Madara flavor: a hybrid search strategy
//! (`admin-ajax.php`'s `madara_load_more` action for empty-query/listing
//! calls and large limits, landing-page scraping for small targeted
//! searches), a three-layer chapter-enumeration fallback (direct scrape,
//! the `ajax/chapters/` endpoint, the legacy `manga_get_chapters`
//! admin-ajax action), and a description cleanup pass that strips Madara's
//! boilerplate summary prefix and "Show more" suffix.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

use crate::error::{Error, TrackedError};
use crate::net::{html, HttpClient};
use crate::paginator::{PageFetcher, PageResult, PaginationOptions, Paginator};
use crate::provider::Provider;
use crate::providers::web::{
    first_nonempty_all_attr, first_nonempty_all_text, first_nonempty_attr, first_nonempty_text,
    full_url, infer_chapter_number, infer_volume, last_path_segment,
};
use crate::types::{Chapter, ChapterInfo, Manga, MangaInfo, Page, SearchOptions};

/// Above this requested limit, search is driven through `admin-ajax.php`'s
/// `madara_load_more` action instead of a single landing-page scrape, since
/// the landing page alone rarely carries enough results.
const LARGE_LIMIT_THRESHOLD: usize = 20;

/// `posts_per_page` sent on every `madara_load_more` request, regardless of
/// the caller's requested limit; limiting happens afterward via
/// [`crate::paginator::Paginator`].
const LOAD_MORE_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct MadaraSelectors {
    pub listing_item: Vec<&'static str>,
    pub cover: Vec<&'static str>,
    pub description: Vec<&'static str>,
    pub authors: Vec<&'static str>,
    pub tags: Vec<&'static str>,
    pub status: Vec<&'static str>,
    pub chapter_list: Vec<&'static str>,
    pub chapter_date: Vec<&'static str>,
    pub page_image: Vec<&'static str>,
    /// Holds the internal WordPress post id used by the legacy
    /// `manga_get_chapters` ajax action, e.g. `.rating-post-id`.
    pub post_id: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct MadaraConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub base_url: String,
    /// Path segment preceding the manga slug, e.g. `"manga"` for
    /// `{base}/manga/{slug}/`.
    pub manga_path_segment: &'static str,
    pub selectors: MadaraSelectors,
    pub headers: Vec<(&'static str, &'static str)>,
}

pub struct MadaraProvider {
    config: MadaraConfig,
    client: HttpClient,
}

impl MadaraProvider {
    pub fn new(config: MadaraConfig) -> Self {
        let mut client = HttpClient::new(config.id)
            .with_rate_limit(std::time::Duration::from_secs(2))
            .with_max_retries(3);
        for (name, value) in &config.headers {
            client = client.with_header(name, value);
        }
        Self { client, config }
    }

    fn manga_url(&self, manga_id: &str) -> String {
        if manga_id.starts_with("http") {
            return manga_id.to_string();
        }
        full_url(
            &self.config.base_url,
            &format!("{}/{}", self.config.manga_path_segment, manga_id),
        )
    }

    fn admin_ajax_url(&self) -> String {
        format!("{}/wp-admin/admin-ajax.php", self.config.base_url.trim_end_matches('/'))
    }

    fn parse_listing(&self, html_str: &str) -> Vec<Manga> {
        let doc = html::parse(html_str);
        let links = first_nonempty_all_attr(&doc, &self.config.selectors.listing_item, "href");
        let titles = first_nonempty_all_text(&doc, &self.config.selectors.listing_item);

        links
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
            .collect()
    }

    async fn search_via_landing_page(&self, query: &str) -> Result<Vec<Manga>, TrackedError> {
        let url = format!(
            "{}/?s={}&post_type=wp-manga",
            self.config.base_url,
            urlencoding::encode(query)
        );
        let html_str = self.client.get_text(&url).await?;
        Ok(self.parse_listing(&html_str))
    }

    /// Fetches one `madara_load_more` page. `page` is 0-indexed; the
    /// admin-ajax form's own `page`/`vars[paged]` fields follow the site's
    /// quirk of `page=0,vars[paged]=1` for the first page and
    /// `page=N,vars[paged]=N+1` thereafter, which is just `page.to_string()`
    /// and `(page + 1).to_string()` uniformly.
    async fn fetch_load_more_page(&self, query: &str, page: usize) -> Result<Vec<Manga>, TrackedError> {
        let page_s = page.to_string();
        let paged_s = (page + 1).to_string();
        let posts_per_page_s = LOAD_MORE_PAGE_SIZE.to_string();
        let form = [
            ("action", "madara_load_more"),
            ("template", "madara-core/content/content-search"),
            ("page", page_s.as_str()),
            ("vars[paged]", paged_s.as_str()),
            ("vars[post_type]", "wp-manga"),
            ("vars[posts_per_page]", posts_per_page_s.as_str()),
            ("vars[s]", query),
            ("vars[orderby]", "date"),
            ("vars[order]", "DESC"),
        ];
        let html_str = self.client.post_form(&self.admin_ajax_url(), &form).await?;
        Ok(self.parse_listing(&html_str))
    }

    fn extract_post_id(&self, doc: &Html) -> Option<String> {
        first_nonempty_attr(doc, &self.config.selectors.post_id, "data-id")
            .or_else(|| first_nonempty_text(doc, &self.config.selectors.post_id))
    }

    fn parse_chapter_list(&self, html_str: &str, manga_id: &str) -> Vec<ChapterInfo> {
        let doc = html::parse(html_str);
        let links = first_nonempty_all_attr(&doc, &self.config.selectors.chapter_list, "href");
        let titles = first_nonempty_all_text(&doc, &self.config.selectors.chapter_list);
        let dates = first_nonempty_all_text(&doc, &self.config.selectors.chapter_date);

        links
            .into_iter()
            .zip(titles)
            .enumerate()
            .filter_map(|(i, (href, title))| {
                if href.is_empty() {
                    return None;
                }
                let number = infer_chapter_number(&title)
                    .or_else(|| infer_chapter_number(&href))
                    .unwrap_or((i + 1) as f64);
                Some(ChapterInfo {
                    id: href.clone(),
                    manga_id: manga_id.to_string(),
                    provider_id: self.id().to_string(),
                    title,
                    number,
                    volume: infer_volume(&href),
                    language: None,
                    published_at: dates.get(i).cloned(),
                })
            })
            .collect()
    }

    /// Three-layer chapter enumeration: direct scrape of the manga page,
    /// then the `ajax/chapters/` endpoint, then the legacy
    /// `manga_get_chapters` admin-ajax action keyed by the page's internal
    /// post id.
    async fn fetch_chapters(&self, manga_id: &str, manga_html: &str) -> Vec<ChapterInfo> {
        let direct = self.parse_chapter_list(manga_html, manga_id);
        if !direct.is_empty() {
            return direct;
        }

        let ajax_url = format!("{}/ajax/chapters/", self.manga_url(manga_id).trim_end_matches('/'));
        if let Ok(html_str) = self.client.post_form(&ajax_url, &[]).await {
            let via_ajax = self.parse_chapter_list(&html_str, manga_id);
            if !via_ajax.is_empty() {
                return via_ajax;
            }
        }

        let doc = html::parse(manga_html);
        if let Some(post_id) = self.extract_post_id(&doc) {
            let form = [("action", "manga_get_chapters"), ("manga", post_id.as_str())];
            if let Ok(html_str) = self.client.post_form(&self.admin_ajax_url(), &form).await {
                return self.parse_chapter_list(&html_str, manga_id);
            }
        }

        Vec::new()
    }
}

struct LoadMoreFetcher<'a> {
    provider: &'a MadaraProvider,
    query: String,
}

#[async_trait]
impl PageFetcher<Manga> for LoadMoreFetcher<'_> {
    async fn fetch_page(&self, page: usize) -> Result<PageResult<Manga>, TrackedError> {
        let items = self.provider.fetch_load_more_page(&self.query, page).await?;
        Ok(PageResult { items, total: None })
    }
}

static SUMMARY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^.*?is an? (?:manga|manhwa|manhua|webtoon|comic).*?the summary is[:\s]*")
        .expect("static summary-prefix pattern compiles")
});

/// Strips Madara's boilerplate description prefix ("... is a Manga/Manhwa/
/// Manhua ... The Summary is") and "Show more"/"Show less" suffixes, then
/// collapses whitespace.
pub fn clean_description(raw: &str) -> String {
    let without_prefix = SUMMARY_PREFIX.replace(raw, "");
    let without_suffix = without_prefix
        .replace("Show more", "")
        .replace("Show less", "");
    without_suffix.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl Provider for MadaraProvider {
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
        let use_load_more = query.trim().is_empty() || options.limit > LARGE_LIMIT_THRESHOLD || options.pages > 0;
        if use_load_more {
            let fetcher = LoadMoreFetcher {
                provider: self,
                query: query.to_string(),
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
        } else {
            let mut manga = self.search_via_landing_page(query).await?;
            if options.limit > 0 {
                manga.truncate(options.limit);
            }
            Ok(manga)
        }
    }

    async fn get_manga(&self, manga_id: &str) -> Result<MangaInfo, TrackedError> {
        let url = self.manga_url(manga_id);
        let html_str = self.client.get_text(&url).await?;
        let doc = html::parse(&html_str);

        let title = first_nonempty_text(&doc, &self.config.selectors.listing_item)
            .or_else(|| html::select_text(&doc, "title"))
            .unwrap_or_else(|| manga_id.to_string());
        let description =
            first_nonempty_text(&doc, &self.config.selectors.description).map(|d| clean_description(&d));
        let cover_url = first_nonempty_attr(&doc, &self.config.selectors.cover, "src")
            .map(|src| full_url(&self.config.base_url, &src));
        let authors = first_nonempty_all_text(&doc, &self.config.selectors.authors);
        let tags = first_nonempty_all_text(&doc, &self.config.selectors.tags);
        let status = first_nonempty_text(&doc, &self.config.selectors.status);

        let chapters = self.fetch_chapters(manga_id, &html_str).await;

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

        let mut image_urls = first_nonempty_all_attr(&doc, &self.config.selectors.page_image, "src");
        if image_urls.is_empty() {
            image_urls = first_nonempty_all_attr(&doc, &self.config.selectors.page_image, "data-src");
        }

        let pages: Vec<Page> = image_urls
            .into_iter()
            .map(|src| src.trim().replace('\n', "").replace('\t', ""))
            .filter(|src| {
                src.len() > 10
                    && !src.contains("loading")
                    && !src.contains("advertisement")
                    && !src.contains("banner")
                    && !src.ends_with(".gif")
            })
            .enumerate()
            .map(|(i, src)| {
                let url = full_url(&self.config.base_url, &src);
                Page {
                    index: i,
                    filename: crate::downloader::extract_extension(&url)
                        .map(|ext| format!("page_{i:03}.{ext}"))
                        .unwrap_or_else(|| format!("page_{i:03}.jpg")),
                    url,
                }
            })
            .collect();

        if pages.is_empty() {
            return Err(TrackedError::from(Error::not_found(format!(
                "no pages found for chapter {chapter_id}"
            ))));
        }

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
