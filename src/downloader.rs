//! Concurrent chapter page download with bounded parallelism, filename
//! normalization, and hierarchical directory layout.
//!
//! Generalizes the teacher's `download_file`/`sanitize_filename`/
//! `extract_extension` helpers into a full chapter downloader: resolving a
//! three-level directory (`outputRoot/sanitizedMangaTitle/volume-or-flat/
//! chapterDirname`), fanning out page fetches bounded by a semaphore, and
//! guaranteeing read-order via zero-padded filenames rather than
//! completion order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, TrackedError};
use crate::net::HttpClient;

/// One page to fetch, as supplied by a provider's `GetChapter`.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub index: usize,
    pub url: String,
    pub filename_hint: Option<String>,
}

/// Chapter identity and placement metadata needed to resolve the on-disk
/// layout, independent of the page URLs themselves.
#[derive(Debug, Clone)]
pub struct ChapterDownloadRequest {
    pub provider_id: String,
    pub manga_title: String,
    pub chapter_id: String,
    pub chapter_number: f64,
    pub volume: Option<String>,
    pub chapter_title: Option<String>,
    pub output_root: PathBuf,
    pub concurrency: usize,
    pub pages: Vec<PageRequest>,
}

pub struct Downloader;

impl Downloader {
    /// Downloads every page of a chapter into its resolved directory.
    ///
    /// On the first page failure (after the HTTP Client's own retries are
    /// exhausted), in-flight peers are cancelled and the error is returned
    /// with `{chapterId, pageIndex, url}` context. Partially written files
    /// are left on disk; no rollback is attempted.
    pub async fn download_chapter(
        client: &HttpClient,
        request: ChapterDownloadRequest,
    ) -> Result<PathBuf, TrackedError> {
        let chapter_dir = resolve_chapter_dir(&request);
        fs::create_dir_all(&chapter_dir)
            .await
            .map_err(|e| TrackedError::from(Error::Io(e)))?;

        let concurrency = request.concurrency.max(1);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(request.pages.len());

        for page in request.pages {
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let client = client.clone();
            let chapter_dir = chapter_dir.clone();
            let chapter_id = request.chapter_id.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.unwrap();
                if cancel.is_cancelled() {
                    return Ok(());
                }

                let filename = page_filename(&page);
                let path = chapter_dir.join(&filename);

                let result = download_page(&client, &cancel, &page.url, &path).await;
                if result.is_err() {
                    cancel.cancel();
                }
                result.map_err(|e| {
                    e.with_context("chapterId", &chapter_id)
                        .with_context("pageIndex", page.index)
                        .with_context("url", &page.url)
                })
            }));
        }

        let mut first_error = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error = Some(TrackedError::from(Error::Join(join_err)));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(chapter_dir),
        }
    }
}

async fn download_page(
    client: &HttpClient,
    cancel: &CancellationToken,
    url: &str,
    path: &Path,
) -> Result<(), TrackedError> {
    let bytes = client.get_cancellable(url, cancel).await?;
    let mut file = fs::File::create(path)
        .await
        .map_err(|e| TrackedError::from(Error::Io(e)))?;
    file.write_all(&bytes)
        .await
        .map_err(|e| TrackedError::from(Error::Io(e)))?;
    Ok(())
}

fn resolve_chapter_dir(request: &ChapterDownloadRequest) -> PathBuf {
    let manga_dir = sanitize_filename(&request.manga_title);
    let chapter_dirname = chapter_dirname(request);

    let mut dir = request.output_root.join(manga_dir);
    if let Some(volume) = &request.volume {
        dir = dir.join(format!("Vol. {}", sanitize_filename(volume)));
    }
    dir.join(chapter_dirname)
}

/// Builds the chapter directory name: zero-padded chapter number so lexical
/// sort matches numeric sort, optionally followed by the chapter title.
fn chapter_dirname(request: &ChapterDownloadRequest) -> String {
    let number = format_chapter_number(request.chapter_number);
    match &request.chapter_title {
        Some(title) if !title.is_empty() => {
            format!("Ch.{number} - {}", sanitize_filename(title))
        }
        _ => format!("Ch.{number}"),
    }
}

/// Formats a fractional chapter number with a zero-padded 4-digit integer
/// part, e.g. `1.5` -> `"0001.5"`, `12.0` -> `"0012"`.
fn format_chapter_number(number: f64) -> String {
    let whole = number.trunc() as i64;
    let frac = number.fract();
    if frac.abs() > f64::EPSILON {
        format!("{:04}.{}", whole, (frac * 10.0).round().abs() as i64)
    } else {
        format!("{whole:04}")
    }
}

/// Resolves a page's on-disk filename: sanitized hint if provided, else a
/// synthesized `page_NNN.ext` using the index and the URL's extension (or
/// `.jpg` if none is found). Always zero-padded to guarantee reading order.
fn page_filename(page: &PageRequest) -> String {
    let ext = extract_extension(&page.url).unwrap_or_else(|| "jpg".to_string());
    match &page.filename_hint {
        Some(hint) if !hint.is_empty() => {
            format!("{:03}_{}", page.index, sanitize_filename(hint))
        }
        _ => format!("page_{:03}.{ext}", page.index),
    }
}

/// Sanitizes a filename by replacing invalid characters, trimming, and
/// bounding length.
pub fn sanitize_filename(name: &str) -> String {
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
    let mut sanitized = name.to_string();

    for &ch in &invalid_chars {
        sanitized = sanitized.replace(ch, "_");
    }

    sanitized = sanitized.trim().to_string();
    if sanitized.len() > 200 {
        sanitized.truncate(200);
    }

    if sanitized.is_empty() {
        sanitized = "untitled".to_string();
    }

    sanitized
}

/// Extracts a file extension from a URL, ignoring query/fragment.
pub fn extract_extension(url: &str) -> Option<String> {
    let clean_url = url.split('?').next()?.split('#').next()?;
    let path = clean_url.split('/').next_back()?;

    if let Some(dot_pos) = path.rfind('.') {
        let ext = &path[dot_pos + 1..];
        if !ext.is_empty() && ext.len() <= 10 {
            return Some(ext.to_lowercase());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_replaces_invalid_chars() {
        assert_eq!(sanitize_filename("normal_file.txt"), "normal_file.txt");
        assert_eq!(
            sanitize_filename("file/with\\bad:chars"),
            "file_with_bad_chars"
        );
        assert_eq!(sanitize_filename(""), "untitled");

        let long_name = "a".repeat(250);
        let sanitized = sanitize_filename(&long_name);
        assert!(sanitized.len() <= 200);
    }

    #[test]
    fn extract_extension_handles_query_and_case() {
        assert_eq!(
            extract_extension("https://example.com/image.jpg"),
            Some("jpg".to_string())
        );
        assert_eq!(
            extract_extension("https://example.com/image.PNG"),
            Some("png".to_string())
        );
        assert_eq!(
            extract_extension("https://example.com/image.jpg?v=123"),
            Some("jpg".to_string())
        );
        assert_eq!(extract_extension("https://example.com/image"), None);
        assert_eq!(extract_extension("https://example.com/image."), None);
    }

    #[test]
    fn format_chapter_number_zero_pads_and_keeps_fraction() {
        assert_eq!(format_chapter_number(1.0), "0001");
        assert_eq!(format_chapter_number(1.5), "0001.5");
        assert_eq!(format_chapter_number(120.0), "0120");
    }

    #[test]
    fn chapter_dirname_omits_title_when_absent() {
        let request = ChapterDownloadRequest {
            provider_id: "mgd".into(),
            manga_title: "One Piece".into(),
            chapter_id: "c1".into(),
            chapter_number: 1.5,
            volume: None,
            chapter_title: None,
            output_root: PathBuf::from("/tmp/out"),
            concurrency: 2,
            pages: vec![],
        };
        assert_eq!(chapter_dirname(&request), "Ch.0001.5");
    }

    #[test]
    fn resolve_chapter_dir_omits_volume_level_when_unknown() {
        let request = ChapterDownloadRequest {
            provider_id: "mgd".into(),
            manga_title: "One Piece".into(),
            chapter_id: "c1".into(),
            chapter_number: 1.0,
            volume: None,
            chapter_title: None,
            output_root: PathBuf::from("/tmp/out"),
            concurrency: 2,
            pages: vec![],
        };
        let dir = resolve_chapter_dir(&request);
        assert_eq!(dir, PathBuf::from("/tmp/out/One Piece/Ch.0001"));
    }

    #[test]
    fn resolve_chapter_dir_includes_volume_level_when_known() {
        let request = ChapterDownloadRequest {
            provider_id: "mgd".into(),
            manga_title: "One Piece".into(),
            chapter_id: "c1".into(),
            chapter_number: 1.0,
            volume: Some("2".into()),
            chapter_title: None,
            output_root: PathBuf::from("/tmp/out"),
            concurrency: 2,
            pages: vec![],
        };
        let dir = resolve_chapter_dir(&request);
        assert_eq!(dir, PathBuf::from("/tmp/out/One Piece/Vol. 2/Ch.0001"));
    }
}
