//! # Luminary — a provider execution runtime for manga acquisition
//!
//! Luminary drives search, metadata, and chapter downloads across
//! heterogeneous manga sources through one shared [`Provider`] contract,
//! backed by a rate limiter, retrying HTTP client, HTML/JSON extraction
//! helpers, a pagination driver, and a concurrent chapter downloader.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use luminary::prelude::*;
//! use luminary::error::Result;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let registry = Registry::new();
//!     #[cfg(feature = "provider-mangadex")]
//!     registry.register(Arc::new(MangaDexProvider::new()))?;
//!
//!     let results = registry
//!         .search("one piece")
//!         .limit(20)
//!         .sort(SortKey::Updated)
//!         .flatten()
//!         .await?;
//!
//!     println!("Found {} results", results.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Downloading a chapter
//!
//! ```rust,no_run
//! use luminary::prelude::*;
//! use luminary::error::Result;
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     #[cfg(feature = "provider-mangadex")]
//!     let provider = MangaDexProvider::new();
//!     #[cfg(feature = "provider-mangadex")]
//!     {
//!         let manga = provider.search("oneshot", &"oneshot".into()).await?;
//!         let info = provider.get_manga(&manga[0].id).await?;
//!         let chapter = &info.chapters[0];
//!         let dest = PathBuf::from("./downloads");
//!         let path = provider.download_chapter(&chapter.id, &dest, &DownloadOptions::default()).await?;
//!         println!("Downloaded to: {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`provider`]: the shared `Provider` contract every acquisition style implements
//! - [`providers`]: the API/Web/Madara flavors and concrete providers
//! - [`registry`]: the process-wide `id -> provider` map
//! - [`search`]: fluent search builder and result post-processing
//! - [`paginator`]: multi-page fetch driver with dedup and stop conditions
//! - [`downloader`]: concurrent chapter page download
//! - [`extractor`]: declarative JSON-to-entity field extraction
//! - [`net`]: HTTP client, rate limiting, and HTML parsing utilities
//! - [`types`]: core data structures
//! - [`error`]: tracked error handling

pub mod downloader;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod net;
pub mod paginator;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod search;
pub mod types;

/// Prelude module for convenient imports.
///
/// ```rust
/// use luminary::prelude::*;
/// ```
pub mod prelude {
    pub use crate::provider::{DownloadOptions, Provider};
    pub use crate::registry::Registry;
    pub use crate::search::{SearchBuilder, SearchResultExt};
    pub use crate::types::{
        Chapter, ChapterInfo, Manga, MangaInfo, Page, SearchField, SearchOptions, SortKey,
    };

    #[cfg(feature = "provider-mangadex")]
    pub use crate::providers::MangaDexProvider;
    #[cfg(feature = "provider-kissmanga")]
    pub use crate::providers::KissMangaProvider;
}

pub use error::{Error, Result};
pub use provider::{DownloadOptions, Provider};
pub use registry::Registry;
pub use search::{SearchBuilder, SearchResultExt};
pub use types::{Chapter, ChapterInfo, Manga, MangaInfo, Page, SearchField, SearchOptions, SortKey};
