//! End-to-end tests exercising the Madara flavor's full search → manga →
//! chapter → download pipeline against a mocked HTTP origin.

use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use luminary::prelude::*;
use luminary::providers::madara::{MadaraConfig, MadaraProvider};

mod common;
use common::{cleanup_dir, madara_selectors, scratch_dir};

const LISTING_HTML: &str = r#"
<html><body>
<div class="post-title"><h3><a href="/manga/solo-leveling">Solo Leveling</a></h3></div>
</body></html>
"#;

const MANGA_PAGE_HTML: &str = r#"
<html><body>
<div class="post-title"><h3><a href="/manga/solo-leveling">Solo Leveling</a></h3></div>
<div class="post-thumb"><img src="/covers/solo-leveling.jpg" /></div>
<div class="summary__content">A weak hunter gains the power to level up. Show more</div>
<div class="author-content"><a href="#">Chugong</a></div>
<div class="genres-content"><a href="#">Action</a></div>
<div class="post-status"><div class="summary-content">Completed</div></div>
<li class="wp-manga-chapter"><a href="/manga/solo-leveling/chapter-1">Chapter 1</a></li>
<li class="wp-manga-chapter"><a href="/manga/solo-leveling/chapter-2">Chapter 2</a></li>
</body></html>
"#;

const CHAPTER_PAGE_HTML: &str = r#"
<html><body>
<div class="page-break"><img src="/pages/c1/001.jpg" /></div>
<div class="page-break"><img src="/pages/c1/002.png" /></div>
</body></html>
"#;

fn config(base_url: String) -> MadaraConfig {
    MadaraConfig {
        id: "mock",
        name: "MockManga",
        description: "test fixture",
        base_url,
        manga_path_segment: "manga",
        selectors: madara_selectors(),
        headers: vec![],
    }
}

#[tokio::test]
async fn search_then_get_manga_then_get_chapter_round_trips() {
    let server = MockServer::start();
    let provider = MadaraProvider::new(config(server.base_url()));

    let search_mock = server.mock(|when, then| {
        when.method(GET).path("/").query_param_exists("s").query_param("post_type", "wp-manga");
        then.status(200).body(LISTING_HTML);
    });

    let results = provider.search("solo leveling", &"solo leveling".into()).await.unwrap();
    search_mock.assert();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Solo Leveling");
    assert_eq!(results[0].id, "solo-leveling");

    let manga_mock = server.mock(|when, then| {
        when.method(GET).path("/manga/solo-leveling");
        then.status(200).body(MANGA_PAGE_HTML);
    });

    let info = provider.get_manga("solo-leveling").await.unwrap();
    manga_mock.assert();
    assert_eq!(info.manga.title, "Solo Leveling");
    assert_eq!(info.manga.authors, vec!["Chugong".to_string()]);
    assert!(!info.manga.description.as_deref().unwrap().contains("Show more"));
    assert_eq!(info.chapters.len(), 2);
    assert_eq!(info.chapters[0].number, 1.0);
    assert_eq!(info.chapters[1].number, 2.0);

    let chapter_mock = server.mock(|when, then| {
        when.method(GET).path("/manga/solo-leveling/chapter-1");
        then.status(200).body(CHAPTER_PAGE_HTML);
    });

    let chapter = provider.get_chapter("/manga/solo-leveling/chapter-1").await.unwrap();
    chapter_mock.assert();
    assert_eq!(chapter.pages.len(), 2);
    assert_eq!(chapter.pages[0].index, 0);
    assert_eq!(chapter.pages[1].index, 1);
}

#[tokio::test]
async fn download_chapter_writes_pages_in_order() {
    let server = MockServer::start();
    let provider = MadaraProvider::new(config(server.base_url()));

    server.mock(|when, then| {
        when.method(GET).path("/manga/solo-leveling/chapter-1");
        then.status(200).body(CHAPTER_PAGE_HTML);
    });
    server.mock(|when, then| {
        when.method(GET).path("/manga/solo-leveling");
        then.status(200).body(MANGA_PAGE_HTML);
    });
    server.mock(|when, then| {
        when.method(GET).path("/pages/c1/001.jpg");
        then.status(200).body(b"page-one-bytes".to_vec());
    });
    server.mock(|when, then| {
        when.method(GET).path("/pages/c1/002.png");
        then.status(200).body(b"page-two-bytes".to_vec());
    });

    let dest = scratch_dir("madara-download").await;
    let chapter_dir = provider
        .download_chapter("/manga/solo-leveling/chapter-1", &dest, &DownloadOptions::default())
        .await
        .unwrap();

    let mut entries: Vec<_> = std::fs::read_dir(&chapter_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries.len(), 2);
    assert!(entries[0] < entries[1], "page filenames must sort in reading order");

    cleanup_dir(&dest).await;
}

#[tokio::test]
async fn large_limit_search_drives_admin_ajax_load_more() {
    let server = MockServer::start();
    let provider = MadaraProvider::new(config(server.base_url()));

    let ajax_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/wp-admin/admin-ajax.php")
            .body_contains("action=madara_load_more");
        then.status(200).body(LISTING_HTML);
    });

    let options = luminary::types::SearchOptionsBuilder::default()
        .query("")
        .limit(50usize)
        .pages(1usize)
        .build()
        .unwrap();
    let results = provider.search("", &options).await.unwrap();
    ajax_mock.assert();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn explicit_pages_drives_successive_admin_ajax_requests() {
    let server = MockServer::start();
    let provider = MadaraProvider::new(config(server.base_url()));

    let ajax_mock = server.mock(|when, then| {
        when.method(POST)
            .path("/wp-admin/admin-ajax.php")
            .body_contains("action=madara_load_more");
        then.status(200).body(LISTING_HTML);
    });

    let options = luminary::types::SearchOptionsBuilder::default()
        .query("")
        .pages(2usize)
        .build()
        .unwrap();
    let results = provider.search("", &options).await.unwrap();
    assert_eq!(ajax_mock.hits(), 2);
    assert_eq!(results.len(), 1, "same manga id on both pages dedupes to one result");
}
