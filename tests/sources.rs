//! Provider-specific functionality tests: identity metadata for the
//! concrete providers, and a mocked end-to-end pass through the generic
//! Web flavor (KissManga's own flavor, Madara, is covered in
//! `integration.rs`).

use httpmock::Method::GET;
use httpmock::MockServer;
use luminary::prelude::*;
use luminary::providers::web::{WebConfig, WebProvider, WebSelectors};

#[cfg(feature = "provider-mangadex")]
#[test]
fn mangadex_identity_matches_provider_contract() {
    let provider = luminary::providers::MangaDexProvider::new();
    assert_eq!(provider.id(), "mgd");
    assert_eq!(provider.name(), "MangaDex");
    assert!(provider.site_url().starts_with("https://"));
}

#[cfg(feature = "provider-kissmanga")]
#[test]
fn kissmanga_identity_matches_provider_contract() {
    let provider = luminary::providers::KissMangaProvider::new();
    assert_eq!(provider.id(), "kmg");
    assert_eq!(provider.name(), "KissManga");
    assert!(provider.site_url().starts_with("https://"));
}

fn web_config(base_url: String) -> WebConfig {
    WebConfig {
        id: "web-fixture",
        name: "Web Fixture",
        description: "generic scraping flavor test fixture",
        base_url,
        selectors: WebSelectors {
            listing_item: vec!["a.manga-link"],
            cover: vec!["img.cover"],
            description: vec![".desc"],
            authors: vec![".author"],
            tags: vec![".tag"],
            status: vec![".status"],
            chapter_list: vec!["a.chapter-link"],
            chapter_date: vec![".chapter-date"],
            page_image: vec!["img.page"],
        },
    }
}

const SEARCH_HTML: &str = r#"
<html><body>
<a class="manga-link" href="/series/my-hero">My Hero</a>
</body></html>
"#;

const MANGA_HTML: &str = r#"
<html><body>
<a class="manga-link" href="/series/my-hero">My Hero</a>
<img class="cover" src="/img/my-hero.jpg" />
<div class="desc">A story about heroes.</div>
<div class="author">Horikoshi</div>
<div class="tag">Action</div>
<div class="status">Ongoing</div>
<a class="chapter-link" href="/series/my-hero/chapter-1">Chapter 1</a>
</body></html>
"#;

#[tokio::test]
async fn web_provider_search_and_get_manga_use_configured_selectors() {
    let server = MockServer::start();
    let provider = WebProvider::new(web_config(server.base_url()));

    let search_mock = server.mock(|when, then| {
        when.method(GET).path("/").query_param_exists("s");
        then.status(200).body(SEARCH_HTML);
    });
    let results = provider.search("my hero", &"my hero".into()).await.unwrap();
    search_mock.assert();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "my-hero");

    let manga_mock = server.mock(|when, then| {
        when.method(GET).path("/series/my-hero");
        then.status(200).body(MANGA_HTML);
    });
    let info = provider.get_manga("/series/my-hero").await.unwrap();
    manga_mock.assert();
    assert_eq!(info.manga.title, "My Hero");
    assert_eq!(info.manga.authors, vec!["Horikoshi".to_string()]);
    assert_eq!(info.chapters.len(), 1);
    assert_eq!(info.chapters[0].number, 1.0);
}

#[test]
fn registry_holds_every_feature_enabled_provider() {
    let registry = Registry::new();
    #[cfg(feature = "provider-mangadex")]
    registry
        .register(std::sync::Arc::new(luminary::providers::MangaDexProvider::new()))
        .unwrap();
    #[cfg(feature = "provider-kissmanga")]
    registry
        .register(std::sync::Arc::new(luminary::providers::KissMangaProvider::new()))
        .unwrap();

    let ids: Vec<_> = registry.list().iter().map(|p| p.id().to_string()).collect();
    #[cfg(feature = "provider-mangadex")]
    assert!(ids.contains(&"mgd".to_string()));
    #[cfg(feature = "provider-kissmanga")]
    assert!(ids.contains(&"kmg".to_string()));
}
