//! Concrete and generic [`crate::provider::Provider`] implementations.
//!
//! - [`api`] — shared plumbing for the API flavor (paginated JSON endpoints,
//!   at-home-server page resolution).
//! - [`web`] — the generic HTML-scraping flavor: a selector dictionary with
//!   first-non-empty-wins candidate matching.
//! - [`madara`] — the Madara/WordPress specialization of `web`, adding the
//!   `admin-ajax.php` hybrid search and the three-layer chapter fallback.
//! - [`mangadex`] / [`kissmanga`] — concrete providers, feature-gated the
//!   same way the teacher gated its `sources` module.

pub mod api;
pub mod madara;
pub mod web;

#[cfg(feature = "provider-mangadex")]
pub mod mangadex;

#[cfg(feature = "provider-kissmanga")]
pub mod kissmanga;

#[cfg(feature = "provider-mangadex")]
pub use mangadex::MangaDexProvider;

#[cfg(feature = "provider-kissmanga")]
pub use kissmanga::KissMangaProvider;
