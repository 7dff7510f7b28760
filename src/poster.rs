//! Delivery orchestrator.
//!
//! Turns one scraped item into the sequence of remote send calls its
//! delivery shape requires: a single captioned photo, a photo followed by
//! standalone text posts, or a photo followed by threaded comments in the
//! channel's linked discussion group. Fails per item; the schedule loop
//! catches and logs.

use itertools::Itertools;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{PosterError, Result};
use crate::models::{PostFormat, ScrapedItem};
use crate::splitter::{split_message, BODY_LIMIT, CAPTION_LIMIT};
use crate::telegram::{discussion_message_link, BotApi, Message};
use crate::utils::{clean_text, sleep_cancellable, strip_query};

/// Hard platform ceiling for photo captions.
const MAX_CAPTION_LENGTH: usize = 1024;

/// Pause between consecutive sends of one item, to stay under rate limits.
const INTER_MESSAGE_DELAY: Duration = Duration::from_millis(500);

/// Wait after resolving the discussion group before reading its history,
/// giving the platform time to mirror the channel post.
const DISCUSSION_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Deliver one item to `channel` according to its delivery shape.
#[instrument(level = "info", skip_all, fields(url = %item.url, shape = ?item.format))]
pub async fn deliver(
    bot: &dyn BotApi,
    item: &ScrapedItem,
    channel: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let Some(image_url) = item.image_url.as_deref().filter(|u| !u.is_empty()) else {
        return Err(PosterError::Telegram("item has no image URL".to_string()));
    };
    let photo = strip_query(image_url);

    if !item.images.is_empty() || !item.videos.is_empty() {
        debug!(
            images = item.images.len(),
            videos = item.videos.len(),
            "Item carries auxiliary media; only the lead image is attached"
        );
    }

    match item.format {
        PostFormat::SinglePost => deliver_single(bot, item, channel, photo).await,
        PostFormat::MultiViaPosts => deliver_multi_posts(bot, item, channel, photo, cancel).await,
        PostFormat::MultiViaComments => deliver_via_comments(bot, item, channel, photo, cancel).await,
    }
}

async fn deliver_single(
    bot: &dyn BotApi,
    item: &ScrapedItem,
    channel: &str,
    photo: &str,
) -> Result<()> {
    let cleaned = clean_text(&item.formatted_message);
    let caption = if cleaned.chars().count() > MAX_CAPTION_LENGTH {
        let truncated: String = cleaned.chars().take(MAX_CAPTION_LENGTH - 4).collect();
        format!("{truncated}...")
    } else {
        cleaned
    };

    bot.send_photo(channel, photo, &caption).await?;
    info!("Posted single photo message");
    Ok(())
}

async fn deliver_multi_posts(
    bot: &dyn BotApi,
    item: &ScrapedItem,
    channel: &str,
    photo: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let cleaned = clean_text(&item.formatted_message);
    let (first, remaining) = split_message(&cleaned, CAPTION_LIMIT, BODY_LIMIT);

    bot.send_photo(channel, photo, &first).await?;

    for part in &remaining {
        sleep_cancellable(INTER_MESSAGE_DELAY, cancel).await?;
        bot.send_message(channel, part, None, true).await?;
    }

    info!(continuations = remaining.len(), "Posted multi-part message");
    Ok(())
}

async fn deliver_via_comments(
    bot: &dyn BotApi,
    item: &ScrapedItem,
    channel: &str,
    photo: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let title = format!("*{}*", item.title);
    let byline = byline_for(item);
    let hashtags = hashtags_for(item);

    let (caption_part, comment_parts) =
        split_message(&clean_text(&item.plain_text), CAPTION_LIMIT, BODY_LIMIT);
    let continue_note = if comment_parts.is_empty() {
        ""
    } else {
        "\n\n_Continue reading in comments_"
    };

    let caption = format!("{title}\n\n{caption_part}{continue_note}{byline}{hashtags}");
    bot.send_photo(channel, photo, &caption).await?;

    let chat = bot.get_chat(channel).await?;
    let discussion_chat_id = chat
        .linked_chat_id
        .ok_or_else(|| PosterError::NoDiscussionGroup(channel.to_string()))?;
    debug!(channel_chat_id = chat.id, discussion_chat_id, "Resolved discussion group");

    sleep_cancellable(DISCUSSION_SETTLE_DELAY, cancel).await?;

    if comment_parts.is_empty() {
        info!("Posted photo with caption only; nothing to thread");
        return Ok(());
    }

    // Best-effort anchor: the latest message visible in the recent-update
    // window. Under concurrent bot traffic this can pick an unrelated
    // message; there is no precise per-post thread lookup here.
    let anchor_id = latest_discussion_message_id(bot).await?.ok_or_else(|| {
        PosterError::Telegram("no anchor message visible in update history".to_string())
    })?;

    let discussion_chat = discussion_chat_id.to_string();
    let count = comment_parts.len();
    let mut previous: Option<Message> = None;

    for (index, part) in comment_parts.iter().enumerate() {
        let is_last = index + 1 == count;
        let mut text = part.clone();
        if is_last {
            text.push_str(&byline);
            if let Some(date) = &item.plain_date {
                text.push_str(&format!("\nPosted: {date}"));
            }
            text.push_str(&hashtags);
        }

        let reply_to = previous.as_ref().map(|m| m.message_id).unwrap_or(anchor_id);
        let comment = bot.send_message(&discussion_chat, &text, Some(reply_to), true).await?;
        debug!(
            link = %discussion_message_link(discussion_chat_id, comment.message_id),
            "Posted comment"
        );
        previous = Some(comment);

        sleep_cancellable(INTER_MESSAGE_DELAY, cancel).await?;
    }

    info!(comments = count, "Posted photo with threaded comments");
    Ok(())
}

fn byline_for(item: &ScrapedItem) -> String {
    match (&item.author_name, &item.author_link) {
        (Some(name), Some(link)) => format!("\n\nBy [{name}]({link})"),
        (Some(name), None) => format!("\n\nBy {name}"),
        _ => String::new(),
    }
}

fn hashtags_for(item: &ScrapedItem) -> String {
    if item.tags.is_empty() {
        return String::new();
    }
    let tags = item
        .tags
        .iter()
        .map(|tag| format!("#{}", tag.replace(' ', "").replace('-', "")))
        .join(" ");
    format!("\n\n{tags}")
}

/// Latest-by-date message id in the bot's recent update history.
async fn latest_discussion_message_id(bot: &dyn BotApi) -> Result<Option<i64>> {
    let updates = bot.get_updates().await?;
    if let Some(last) = updates.last() {
        debug!(count = updates.len(), last_update_id = last.update_id, "Fetched update history");
    }
    Ok(updates
        .into_iter()
        .filter_map(|update| update.message)
        .max_by_key(|message| message.date)
        .map(|message| message.message_id))
}
