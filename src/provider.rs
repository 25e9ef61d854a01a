//! The five-operation provider contract shared by every acquisition style.
//!
//! A [`Provider`] is defined by an immutable identity block (`id`, `name`,
//! `description`, `site_url`) and five operations: `initialize`, `search`,
//! `get_manga`, `get_chapter`, `download_chapter`. Implementations are
//! reentrant and may be invoked concurrently once constructed; all
//! configuration is read-only after construction.
//!
//! The three flavors in [`crate::providers`] (API, Web, Madara) supply
//! default implementations of `search`/`get_manga`/`get_chapter`
//! parameterized by per-site configuration; `download_chapter` has one
//! default implementation here, shared by all flavors, that resolves
//! titles/volume and delegates to [`crate::downloader::Downloader`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::downloader::{ChapterDownloadRequest, Downloader, PageRequest};
use crate::error::{Error, TrackedError};
use crate::net::HttpClient;
use crate::types::{Chapter, MangaInfo, SearchOptions};

/// Per-download overrides for `Provider::download_chapter`. `concurrency`
/// overrides `Provider::download_concurrency()`'s default; `volume`
/// overrides the chapter's own volume label when the caller knows better
/// (e.g. a `--vol` flag disambiguating a chapter the source left unlabeled).
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub concurrency: Option<usize>,
    pub volume: Option<String>,
}

/// Shared provider contract. All five operations surface a `TrackedError`
/// carrying the category appropriate to the failure (see the runtime's
/// error handling design): `notFound` for absent entities, `parse` for
/// required-extraction failures, `network` for transport failures, and
/// `provider` for contract violations or unexpected response shapes.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, used in combined ids (`providerId:entityId`) and
    /// Registry lookups.
    fn id(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str {
        ""
    }
    fn site_url(&self) -> &str;

    /// This provider's HTTP client, used by the default `download_chapter`
    /// implementation and available to flavor default methods.
    fn http_client(&self) -> &HttpClient;

    /// Page-download concurrency bound for `download_chapter`.
    fn download_concurrency(&self) -> usize {
        4
    }

    /// Optional one-shot setup (e.g. learning a content-delivery prefix).
    /// Idempotent; the default does nothing.
    async fn initialize(&self) -> Result<(), TrackedError> {
        Ok(())
    }

    /// Empty `query` means "list latest". Must deduplicate across pages and
    /// across fallback strategies.
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<crate::types::Manga>, TrackedError>;

    /// Returns the full chapter list; chapters must be complete (the
    /// implementation paginates internally rather than returning one page).
    async fn get_manga(&self, manga_id: &str) -> Result<MangaInfo, TrackedError>;

    /// Like `get_manga`, but lets API-flavor providers that filter chapters
    /// by translated language include every language when `all_languages`
    /// is set. Flavors with no such concept (Web, Madara) ignore the flag.
    async fn get_manga_with_languages(&self, manga_id: &str, _all_languages: bool) -> Result<MangaInfo, TrackedError> {
        self.get_manga(manga_id).await
    }

    /// Returns the ordered page URL set. `mangaId` on the result may be
    /// incomplete when it isn't recoverable from the chapter response
    /// alone.
    async fn get_chapter(&self, chapter_id: &str) -> Result<Chapter, TrackedError>;

    /// Fetches the chapter, resolves its manga title and volume (via
    /// `get_manga` when the chapter doesn't carry them directly), and
    /// delegates to the Downloader. Providers with a cheaper path to this
    /// metadata may override it.
    async fn download_chapter(
        &self,
        chapter_id: &str,
        dest_dir: &Path,
        options: &DownloadOptions,
    ) -> Result<PathBuf, TrackedError> {
        let chapter = self.get_chapter(chapter_id).await?;
        if chapter.pages.is_empty() {
            return Err(TrackedError::from(Error::provider(
                self.id(),
                "chapter has no pages",
            )));
        }

        let manga_title = if !chapter.info.manga_id.is_empty() {
            match self.get_manga(&chapter.info.manga_id).await {
                Ok(info) => info.manga.title,
                Err(_) => chapter.info.manga_id.clone(),
            }
        } else {
            chapter_id.to_string()
        };

        let pages = chapter
            .pages
            .into_iter()
            .map(|p| PageRequest {
                index: p.index,
                url: p.url,
                filename_hint: Some(p.filename),
            })
            .collect();

        let request = ChapterDownloadRequest {
            provider_id: self.id().to_string(),
            manga_title,
            chapter_id: chapter.info.id.clone(),
            chapter_number: chapter.info.number,
            volume: options.volume.clone().or(chapter.info.volume.clone()),
            chapter_title: (!chapter.info.title.is_empty()).then_some(chapter.info.title),
            output_root: dest_dir.to_path_buf(),
            concurrency: options.concurrency.unwrap_or_else(|| self.download_concurrency()),
            pages,
        };

        let image_client = HttpClient::new_for_images(self.id());
        Downloader::download_chapter(&image_client, request).await
    }
}
