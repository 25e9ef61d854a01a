//! Common test utilities and constants
//!
//! Shared functionality used across all integration test binaries.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A fresh scratch directory under `tests/downloads`, unique per call so
/// parallel test binaries never collide. Git-ignored, cleaned up by the
/// caller via [`cleanup_dir`].
#[allow(dead_code)]
pub async fn scratch_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let dir = PathBuf::from("tests/downloads").join(format!("{label}-{nanos}"));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    dir
}

#[allow(dead_code)]
pub async fn cleanup_dir(dir: &std::path::Path) {
    let _ = tokio::fs::remove_dir_all(dir).await;
}

/// A minimal Madara selector set matching the fixture HTML used across
/// `sources.rs`/`integration.rs`.
#[allow(dead_code)]
pub fn madara_selectors() -> luminary::providers::madara::MadaraSelectors {
    luminary::providers::madara::MadaraSelectors {
        listing_item: vec!["div.post-title h3 a"],
        cover: vec![".post-thumb img"],
        description: vec![".summary__content"],
        authors: vec![".author-content a"],
        tags: vec![".genres-content a"],
        status: vec![".post-status .summary-content"],
        chapter_list: vec!["li.wp-manga-chapter > a"],
        chapter_date: vec![".chapter-release-date"],
        page_image: vec!["div.page-break img"],
        post_id: vec![".rating-post-id"],
    }
}
