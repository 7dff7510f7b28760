//! Source scrapers for fetching articles from the configured news sites.
//!
//! Each submodule implements the [`Scraper`] trait for one source. All
//! scrapers share the same shape:
//!
//! 1. Fetch the listing page and select repeated item nodes
//! 2. Extract fields defensively: a missing node yields an absent value,
//!    never a panic or an error
//! 3. Where the listing lacks the full body, dereference the article's own
//!    URL for a second fetch (body text, author, tags, embedded media)
//!
//! Items without a resolvable title and URL are dropped silently. A failed
//! listing fetch fails the whole `scrape` call; a failed per-article fetch
//! skips only that article.
//!
//! # Supported Sources
//!
//! | Source | Module | Listing only | Delivery shape |
//! |--------|--------|--------------|----------------|
//! | AlienWire | [`alienwire`] | yes | single post |
//! | BMW News | [`bmwnews`] | no | post + comments |
//! | Car News | [`carnews`] | yes | single post |
//! | TechCrunch | [`techcrunch`] | no | post + comments |
//!
//! New sources are new registry entries in [`build_registry`]; nothing else
//! in the pipeline changes.

use async_trait::async_trait;
use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::ScrapedItem;

pub mod alienwire;
pub mod bmwnews;
pub mod carnews;
pub mod techcrunch;

/// One content source: an id for feed wiring plus the scrape operation.
///
/// `scrape` fails only when the listing fetch itself fails; per-article
/// problems degrade to skipped articles. The returned sequence is
/// materialized once per invocation.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Registry key referenced by feed configuration.
    fn id(&self) -> &'static str;

    /// Fetch the listing at `url` and extract normalized records.
    async fn scrape(&self, url: &str) -> Result<Vec<ScrapedItem>>;
}

/// Build the scraper registry keyed by id.
pub fn build_registry(http: &reqwest::Client) -> HashMap<String, Box<dyn Scraper>> {
    let scrapers: Vec<Box<dyn Scraper>> = vec![
        Box::new(alienwire::AlienWireScraper::new(http.clone())),
        Box::new(bmwnews::BmwNewsScraper::new(http.clone())),
        Box::new(carnews::CarNewsScraper::new(http.clone())),
        Box::new(techcrunch::TechCrunchScraper::new(http.clone())),
    ];
    scrapers
        .into_iter()
        .map(|scraper| (scraper.id().to_string(), scraper))
        .collect()
}

/// Fetch a page body as text.
pub(crate) async fn fetch_text(http: &reqwest::Client, url: &str) -> Result<String> {
    Ok(http.get(url).send().await?.text().await?)
}

/// Joined, trimmed text content of an element.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// An attribute value as an owned string, absent when missing or empty.
pub(crate) fn attr_of(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::to_string)
        .filter(|value| !value.is_empty())
}

static HOURS_AGO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Posted\s+(\d+)\s+Hours?\s+Ago").unwrap());
static POSTED_ON: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Posted on (.+)").unwrap());

/// Parse a "Posted …" byline into a timestamp.
///
/// Handles, in order: a relative "Posted N Hours Ago" offset from now, an
/// absolute "Posted on {date}", and the literal "Posted Yesterday"
/// (previous midnight, UTC). Returns `None` for anything else; callers fall
/// back to a sentinel rather than failing the record.
pub(crate) fn parse_posted_date(text: &str) -> Option<DateTime<Utc>> {
    if let Some(captures) = HOURS_AGO.captures(text) {
        if let Ok(hours) = captures[1].parse::<i64>() {
            return Some(Utc::now() - Duration::hours(hours));
        }
    }
    if let Some(captures) = POSTED_ON.captures(text) {
        if let Some(date) = parse_absolute_date(captures[1].trim()) {
            return Some(date);
        }
    }
    if text.trim().eq_ignore_ascii_case("Posted Yesterday") {
        let yesterday = Utc::now().date_naive().checked_sub_days(Days::new(1))?;
        return Some(Utc.from_utc_datetime(&yesterday.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Parse an absolute date display string, trying the exact long-month form
/// first, then common fallbacks.
pub(crate) fn parse_absolute_date(text: &str) -> Option<DateTime<Utc>> {
    for format in ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}
