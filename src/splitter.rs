//! Long-form message segmentation.
//!
//! Splits article text into a caption-length first segment plus zero or more
//! body-length continuation segments, cutting at natural text boundaries
//! where possible. The caption limit sits well under the platform's
//! 1024-character ceiling; the orchestrator composes the title, byline, and
//! tags around the first segment.
//!
//! Limits are counted in characters and cuts always land on `char`
//! boundaries, so multi-byte text never splits mid-codepoint.

/// Character limit for the first segment (photo caption body).
pub const CAPTION_LIMIT: usize = 700;

/// Character limit for each continuation segment.
pub const BODY_LIMIT: usize = 3500;

/// Split `text` into a first segment of at most `caption_limit` characters
/// and continuation segments of at most `body_limit` characters each.
///
/// The first segment is the longest prefix within `caption_limit`; when the
/// raw prefix would overrun, the cut is moved back to the nearest preferred
/// break point (closing smart quote, sentence end, or paragraph break,
/// checked in that priority at equal positions). If no break exists in the scanned
/// range the cut is a hard cut exactly at the limit. The remainder is
/// trimmed and re-split the same way with `body_limit` until exhausted.
///
/// Concatenating the returned segments reconstructs the trimmed input with
/// only whitespace normalization at the cut points. Segments are never
/// empty; empty input yields an empty first segment and no continuations.
pub fn split_message(text: &str, caption_limit: usize, body_limit: usize) -> (String, Vec<String>) {
    debug_assert!(caption_limit > 0 && body_limit > 0);

    let (first, rest) = take_chunk(text, caption_limit);
    let first = first.trim().to_string();

    let mut parts = Vec::new();
    let mut remaining = rest.trim();
    while !remaining.is_empty() {
        let (chunk, tail) = take_chunk(remaining, body_limit);
        parts.push(chunk.trim().to_string());
        remaining = tail.trim();
    }

    (first, parts)
}

/// Take the next chunk of at most `max_chars` characters off the front of
/// `text`, returning `(chunk, rest)` as untrimmed subslices.
fn take_chunk(text: &str, max_chars: usize) -> (&str, &str) {
    if text.chars().count() <= max_chars {
        return (text, "");
    }
    let cut = find_split_position(text, max_chars);
    (&text[..cut], &text[cut..])
}

/// Byte offset of the best split position within the first `max_chars`
/// characters of `text`. `text` is known to be longer than `max_chars`.
///
/// Scans backward from the limit; at each position the break kinds are
/// checked in priority order:
/// 1. after a closing smart quote followed by whitespace
/// 2. after sentence-ending punctuation followed by whitespace
/// 3. after a paragraph break (two consecutive newlines)
///
/// Falls back to a hard cut exactly at `max_chars` characters.
fn find_split_position(text: &str, max_chars: usize) -> usize {
    // Byte offset + char for each of the first max_chars + 1 characters.
    let idx: Vec<(usize, char)> = text.char_indices().take(max_chars + 1).collect();

    for i in (0..max_chars).rev() {
        let c = idx[i].1;
        let next = idx[i + 1].1;
        let after = idx[i + 1].0;

        if c == '\u{201d}' && (next == ' ' || next == '\n') {
            return after;
        }
        if matches!(c, '.' | '!' | '?') && (next == ' ' || next == '\n') {
            return after;
        }
        if c == '\n' && i > 0 && idx[i - 1].1 == '\n' {
            return after;
        }
    }

    idx[max_chars].0
}
