// src/ingest/types.rs
use chrono::{DateTime, Utc};

/// Fallback category label for feeds configured without one.
pub const DEFAULT_CATEGORY: &str = "Autres";

/// A configured RSS/Atom endpoint. Owned by configuration, read-only here.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub category: String,
}

/// The normalized record extracted from one feed entry.
///
/// `description` is plain text (markup stripped, length-capped) and
/// `published_at` is never absent: entries without a parseable date carry
/// the fetch time instead.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub link: String, // may be empty; such articles are never deduplicated
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub category: String,
    pub fetched_at: DateTime<Utc>,
}

impl Article {
    /// Copy with a rewritten description; stages never mutate in place.
    pub fn with_description(&self, description: String) -> Self {
        Self {
            description,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedErrorKind {
    Timeout,
    Connection,
    Http(u16),
    Parse,
}

impl std::fmt::Display for FeedErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedErrorKind::Timeout => write!(f, "timeout"),
            FeedErrorKind::Connection => write!(f, "connection error"),
            FeedErrorKind::Http(status) => write!(f, "HTTP {status}"),
            FeedErrorKind::Parse => write!(f, "parse error"),
        }
    }
}

/// One failed source. Collected, never thrown; siblings keep running.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct FeedError {
    pub source: String,
    pub kind: FeedErrorKind,
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Success,
    PartialSuccess,
}

/// Result of one ingestion pass over all configured sources.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: FetchStatus,
    pub articles: Vec<Article>,
    pub errors: Vec<FeedError>,
}
