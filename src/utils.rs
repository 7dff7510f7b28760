//! Utility functions for text cleanup, logging, and pacing.
//!
//! Helpers used across the pipeline:
//! - Markup-safe text cleanup before sending to the platform
//! - String truncation for log output
//! - Cancellable delays (randomized inter-item pacing and fixed waits)

use rand::{rng, Rng};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::error::{PosterError, Result};

/// Clean article text for lightweight-markup delivery.
///
/// Decodes HTML entities (e.g. `&#8220;` -> `“`) and normalizes non-breaking
/// spaces to regular spaces. Markup control characters (`*`, `_`, `[`, `]`)
/// are intentionally left untouched: they are the intended markup syntax of
/// the outgoing messages, not content to be escaped.
pub fn clean_text(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    decoded.replace('\u{a0}', " ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes with an ellipsis and byte-count
/// indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Strip a URL's query string.
///
/// Photo URLs are sent without tracking parameters.
pub fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

/// Sleep for `duration`, waking early with [`PosterError::Cancelled`] if the
/// cancellation token fires first.
pub async fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(PosterError::Cancelled),
        _ = sleep(duration) => Ok(()),
    }
}

/// Wait a randomized short delay between item deliveries.
///
/// Uniformly distributed over 0.5–3.5 seconds to avoid a mechanical posting
/// cadence. Honors cancellation.
pub async fn delay_random(cancel: &CancellationToken) -> Result<()> {
    let delay_secs: f64 = rng().random_range(0.5..3.5);
    sleep_cancellable(Duration::from_millis((delay_secs * 1000.0) as u64), cancel).await
}
