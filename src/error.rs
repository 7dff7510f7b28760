//! Crate-wide error type and result alias.
//!
//! One enum covers the failure taxonomy of the pipeline: transport errors
//! from fetches and sends, store I/O, platform-level API rejections, and the
//! precondition failure raised when comment-threaded delivery is requested
//! for a channel with no linked discussion group. Extraction gaps are not
//! errors; adapters model them as `Option`s.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PosterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("telegram API error: {0}")]
    Telegram(String),

    #[error("no discussion group linked to channel {0}")]
    NoDiscussionGroup(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("AI helper error: {0}")]
    Ai(String),

    /// Cooperative cancellation observed at a suspension point. Unwinds the
    /// in-flight item without marking it processed.
    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PosterError>;
