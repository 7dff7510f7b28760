//! Data models for scraped articles and their delivery shape.
//!
//! This module defines the core data structures flowing through the pipeline:
//! - [`ScrapedItem`]: a normalized article record produced by one scraper
//!   invocation and consumed once by the delivery orchestrator
//! - [`PostFormat`]: how an item is decomposed into outbound messages
//! - [`ArticleData`]: intermediate per-article extraction result used by
//!   scrapers that dereference the article page for full body text
//!
//! A `ScrapedItem`'s URL is its identity: two items with the same URL are the
//! same logical article regardless of any other field. Items are immutable
//! after construction.

use chrono::{DateTime, Utc};

/// How one article is delivered to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostFormat {
    /// One photo message; caption truncated to the platform ceiling.
    #[default]
    SinglePost,
    /// Photo with the leading segment as caption, remaining segments posted
    /// as threaded replies in the channel's linked discussion group.
    MultiViaComments,
    /// Photo with the leading segment as caption, remaining segments sent as
    /// standalone text messages to the same channel.
    MultiViaPosts,
}

/// A normalized article record as produced by a source scraper.
///
/// Constructed entirely by one `scrape` call; the orchestrator consumes it
/// without further mutation. `url` is non-empty and is the sole
/// deduplication key.
#[derive(Debug, Clone)]
pub struct ScrapedItem {
    /// Canonical article URL. Identity key for deduplication.
    pub url: String,
    /// Lead image URL, if the source exposed one. Items without an image are
    /// filtered out before delivery.
    pub image_url: Option<String>,
    /// Markup-ready message text (title + excerpt + link).
    pub formatted_message: String,
    /// Best-effort publish timestamp. May be an exact parsed date, a
    /// synthesized "hours ago" estimate, or a sentinel when unparseable.
    pub publish_date: DateTime<Utc>,
    /// Delivery shape for this item.
    pub format: PostFormat,
    /// Ordered topic tags. Duplicates allowed.
    pub tags: Vec<String>,
    pub author_name: Option<String>,
    pub author_link: Option<String>,
    pub title: String,
    /// Plain article body text, used for comment-threaded delivery.
    pub plain_text: String,
    /// Publish date as displayed by the source, for the closing comment.
    pub plain_date: Option<String>,
    /// Additional embedded media found in the article body.
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

impl Default for ScrapedItem {
    fn default() -> Self {
        Self {
            url: String::new(),
            image_url: None,
            formatted_message: String::new(),
            publish_date: DateTime::<Utc>::MIN_UTC,
            format: PostFormat::default(),
            tags: Vec::new(),
            author_name: None,
            author_link: None,
            title: String::new(),
            plain_text: String::new(),
            plain_date: None,
            images: Vec::new(),
            videos: Vec::new(),
        }
    }
}

/// Fields extracted from a single article page.
///
/// Every field is optional or defaultable: a missing markup node yields an
/// absent value, never an extraction error.
#[derive(Debug, Default)]
pub struct ArticleData {
    pub main_image_url: Option<String>,
    pub category: Option<String>,
    pub post_date: Option<String>,
    pub author_name: Option<String>,
    pub author_link: Option<String>,
    pub title: Option<String>,
    pub article_text: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub videos: Vec<String>,
}
