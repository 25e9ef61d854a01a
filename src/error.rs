//! Error types and result handling for Luminary operations.
//!
//! This module defines the comprehensive error handling system used throughout
//! Luminary. All operations return a [`Result<T>`] which is a type alias for
//! `std::result::Result<T, Error>`.
//!
//! # Error Categories
//!
//! Every error surfaced by a provider or component carries a [`Category`], a
//! free-form context map, and an ordered call chain recording where it was
//! accreted. This is exposed as [`TrackedError`], which wraps the leaf
//! [`Error`] produced by the underlying HTTP/parsing/io layers.

use std::collections::BTreeMap;
use thiserror::Error;

/// Type alias for Results with Luminary errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Leaf error type for all Luminary operations.
///
/// This enum covers the possible failure conditions that can occur during
/// provider operations, from network issues to parsing failures. Higher-level
/// callers generally want [`TrackedError`] instead, which accretes category
/// and context on top of one of these.
#[derive(Error, Debug)]
pub enum Error {
    /// Network-related errors from HTTP operations (connection, DNS, TLS,
    /// timeouts, non-2xx status after exhausted retries, cancellation).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML/JSON parsing and data format errors, including required field
    /// extraction failures.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider-specific errors with contextual information: a violation of
    /// the provider contract or an unexpected response shape.
    #[error("Provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Resource not found at the source (manga, chapter, page set, or
    /// unregistered provider id).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed id, missing argument, or unknown provider supplied by a
    /// caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File system and IO operation errors encountered while writing
    /// downloaded pages or the log file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization and deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors joining a spawned tokio task (e.g. a cancelled download
    /// worker).
    #[error("Join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Generic error messages that don't fit another category.
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub fn provider(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Classifies this leaf error into one of the six tracked categories.
    pub fn category(&self) -> Category {
        match self {
            Error::Network(_) => Category::Network,
            Error::Parse(_) | Error::Json(_) => Category::Parse,
            Error::Provider { .. } => Category::Provider,
            Error::NotFound(_) => Category::NotFound,
            Error::InvalidInput(_) => Category::InvalidInput,
            Error::Io(_) | Error::Join(_) | Error::Other(_) => Category::Unknown,
        }
    }
}

/// The six tracked error categories from the error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Network,
    Provider,
    Parse,
    NotFound,
    InvalidInput,
    Unknown,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::Network => "network",
            Category::Provider => "provider",
            Category::Parse => "parse",
            Category::NotFound => "notFound",
            Category::InvalidInput => "invalidInput",
            Category::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One entry in a `TrackedError`'s call chain: the function, file, and line
/// at which context was accreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}:{})", self.function, self.file, self.line)
    }
}

/// An error accreted with category, free-form context, and an ordered call
/// chain, per the error handling design's context-accretion policy.
///
/// `TrackedError` wraps a leaf [`Error`] and is the type providers, the
/// Paginator, and the Downloader surface to their callers. Context and call
/// chain frames are added as the error propagates upward without losing the
/// original cause.
#[derive(Debug)]
pub struct TrackedError {
    source: Error,
    category: Category,
    context: BTreeMap<String, String>,
    chain: Vec<Frame>,
}

impl TrackedError {
    /// Wraps a leaf error, deriving its initial category from the leaf
    /// itself.
    pub fn new(source: Error) -> Self {
        let category = source.category();
        Self {
            source,
            category,
            context: BTreeMap::new(),
            chain: Vec::new(),
        }
    }

    /// Wraps a leaf error with an explicit category override (used when the
    /// calling context knows better than the leaf's default classification,
    /// e.g. a cancellation surfaced through `Error::Other`).
    pub fn with_category(source: Error, category: Category) -> Self {
        Self {
            source,
            category,
            context: BTreeMap::new(),
            chain: Vec::new(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn source_error(&self) -> &Error {
        &self.source
    }

    /// Adds a context key/value, returning `self` for chaining.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    /// Appends a call-chain frame recording where this error passed through.
    pub fn with_frame(mut self, function: &str, file: &str, line: u32) -> Self {
        self.chain.push(Frame {
            function: function.to_string(),
            file: file.to_string(),
            line,
        });
        self
    }

    pub fn chain(&self) -> &[Frame] {
        &self.chain
    }

    /// Merges another tracked error into this one: call chains are
    /// concatenated and deduplicated by (function, file, line), context maps
    /// are merged (self wins on key collision), and the predominant category
    /// — this error's, unless it is `Unknown` and the other is not — is
    /// kept.
    pub fn merge(mut self, other: TrackedError) -> Self {
        for (k, v) in other.context {
            self.context.entry(k).or_insert(v);
        }
        for frame in other.chain {
            if !self.chain.contains(&frame) {
                self.chain.push(frame);
            }
        }
        if self.category == Category::Unknown && other.category != Category::Unknown {
            self.category = other.category;
        }
        self
    }
}

impl std::fmt::Display for TrackedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.category, self.source)?;
        if !self.context.is_empty() {
            write!(f, " {{")?;
            for (i, (k, v)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{k}={v}")?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TrackedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<Error> for TrackedError {
    fn from(e: Error) -> Self {
        TrackedError::new(e)
    }
}

/// Accretes a call-chain frame at the current location onto a
/// `TrackedError`-producing expression.
#[macro_export]
macro_rules! track {
    ($err:expr) => {
        $crate::error::TrackedError::from($err).with_frame(module_path!(), file!(), line!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_leaf() {
        let e = Error::not_found("manga missing");
        assert_eq!(e.category(), Category::NotFound);
    }

    #[test]
    fn merge_dedupes_chain_and_keeps_context() {
        let a = TrackedError::new(Error::parse("bad json"))
            .with_context("provider", "mgd")
            .with_frame("search", "provider.rs", 10);
        let b = TrackedError::new(Error::parse("bad json"))
            .with_context("resourceId", "abc")
            .with_frame("search", "provider.rs", 10)
            .with_frame("fetch_page", "paginator.rs", 20);

        let merged = a.merge(b);
        assert_eq!(merged.chain().len(), 2);
        assert_eq!(merged.context().get("provider").unwrap(), "mgd");
        assert_eq!(merged.context().get("resourceId").unwrap(), "abc");
    }

    #[test]
    fn merge_prefers_known_category_over_unknown() {
        let a = TrackedError::with_category(Error::Other("x".into()), Category::Unknown);
        let b = TrackedError::new(Error::not_found("y"));
        let merged = a.merge(b);
        assert_eq!(merged.category(), Category::NotFound);
    }

    #[test]
    fn display_includes_category_and_context() {
        let e =
            TrackedError::new(Error::not_found("chapter missing")).with_context("providerId", "mgd");
        let s = format!("{e}");
        assert!(s.contains("notFound"));
        assert!(s.contains("providerId=mgd"));
    }
}
