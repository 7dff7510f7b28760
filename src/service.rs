//! Hourly scrape-and-post cycle.
//!
//! One logical worker drives the whole pipeline: feeds are polled
//! sequentially, items delivered sequentially, and the loop sleeps a fixed
//! hour between cycles. A failure anywhere inside a cycle is logged and
//! never terminates the loop; only cancellation does. Cancellation is
//! cooperative: the token is checked at loop top and selected against
//! every sleep.

use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::FeedConfig;
use crate::error::{PosterError, Result};
use crate::poster::deliver;
use crate::scrapers::Scraper;
use crate::store::ProcessedItemStore;
use crate::telegram::BotApi;
use crate::utils::{delay_random, sleep_cancellable};

/// Sleep between cycles.
const CYCLE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// The long-running delivery service.
pub struct AutoPoster {
    scrapers: HashMap<String, Box<dyn Scraper>>,
    bot: Box<dyn BotApi>,
    store: ProcessedItemStore,
    feeds: Vec<FeedConfig>,
}

impl AutoPoster {
    pub fn new(
        scrapers: HashMap<String, Box<dyn Scraper>>,
        bot: Box<dyn BotApi>,
        store: ProcessedItemStore,
        feeds: Vec<FeedConfig>,
    ) -> Self {
        Self {
            scrapers,
            bot,
            store,
            feeds,
        }
    }

    /// Run cycles until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!("Auto poster started");

        while !cancel.is_cancelled() {
            match self.run_cycle(&cancel).await {
                Ok(()) => {}
                Err(PosterError::Cancelled) => break,
                Err(e) => error!(error = %e, "Error occurred during posting cycle"),
            }

            info!("Waiting 1 hour until next run");
            if sleep_cancellable(CYCLE_INTERVAL, &cancel).await.is_err() {
                break;
            }
            info!("Woke up; starting next scraping cycle");
        }

        info!("Auto poster stopped");
    }

    /// One pass over all configured feeds.
    #[instrument(level = "info", skip_all)]
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<()> {
        for feed in &self.feeds {
            if cancel.is_cancelled() {
                return Err(PosterError::Cancelled);
            }

            let Some(scraper) = self.scrapers.get(&feed.scraper_id) else {
                warn!(scraper_id = %feed.scraper_id, "No scraper found for ID");
                continue;
            };

            let items = match scraper.scrape(&feed.feed_url).await {
                Ok(items) => items,
                Err(e) => {
                    error!(error = %e, feed_url = %feed.feed_url, "Feed scrape failed; skipping feed");
                    continue;
                }
            };

            let mut fresh = Vec::new();
            for item in items {
                if !self.store.is_processed(&item.url).await? {
                    fresh.push(item);
                }
            }
            fresh.retain(|item| item.image_url.as_deref().is_some_and(|u| !u.is_empty()));
            info!(
                feed_url = %feed.feed_url,
                channel = %feed.channel_id,
                count = fresh.len(),
                "New items to deliver"
            );

            for item in fresh {
                debug!(url = %item.url, published = %item.publish_date, "Delivering item");
                match deliver(self.bot.as_ref(), &item, &feed.channel_id, cancel).await {
                    Ok(()) => {
                        if let Err(e) = self.store.mark_processed(&item.url, Some(&feed.scraper_id)).await
                        {
                            error!(error = %e, url = %item.url, "Failed to mark item processed");
                        }
                    }
                    Err(PosterError::Cancelled) => return Err(PosterError::Cancelled),
                    Err(e) => error!(error = %e, url = %item.url, "Failed to process item"),
                }

                delay_random(cancel).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PostFormat, ScrapedItem};
    use crate::telegram::{ChatInfo, Message, Update};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    struct StaticScraper {
        id: &'static str,
        items: Vec<ScrapedItem>,
    }

    #[async_trait]
    impl Scraper for StaticScraper {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn scrape(&self, _url: &str) -> Result<Vec<ScrapedItem>> {
            Ok(self.items.clone())
        }
    }

    struct FailingScraper;

    #[async_trait]
    impl Scraper for FailingScraper {
        fn id(&self) -> &'static str {
            "Failing"
        }

        async fn scrape(&self, _url: &str) -> Result<Vec<ScrapedItem>> {
            Err(PosterError::Telegram("listing fetch refused".to_string()))
        }
    }

    /// Records photo sends into a shared log; optionally refuses every send.
    struct RecordingBot {
        photos: Arc<Mutex<Vec<(String, String)>>>,
        fail_sends: bool,
        next_id: AtomicI64,
    }

    impl RecordingBot {
        fn new(fail_sends: bool) -> (Self, Arc<Mutex<Vec<(String, String)>>>) {
            let photos = Arc::new(Mutex::new(Vec::new()));
            let bot = Self {
                photos: Arc::clone(&photos),
                fail_sends,
                next_id: AtomicI64::new(1),
            };
            (bot, photos)
        }
    }

    #[async_trait]
    impl BotApi for RecordingBot {
        async fn send_photo(&self, chat: &str, _photo_url: &str, caption: &str) -> Result<Message> {
            if self.fail_sends {
                return Err(PosterError::Telegram("send refused".to_string()));
            }
            self.photos.lock().unwrap().push((chat.to_string(), caption.to_string()));
            Ok(Message {
                message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
                date: 0,
            })
        }

        async fn send_message(
            &self,
            _chat: &str,
            _text: &str,
            _reply_to: Option<i64>,
            _disable_preview: bool,
        ) -> Result<Message> {
            Ok(Message {
                message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
                date: 0,
            })
        }

        async fn get_chat(&self, _chat: &str) -> Result<ChatInfo> {
            Ok(ChatInfo {
                id: -1,
                linked_chat_id: None,
            })
        }

        async fn get_updates(&self) -> Result<Vec<Update>> {
            Ok(vec![])
        }
    }

    fn item(url: &str, image: Option<&str>) -> ScrapedItem {
        ScrapedItem {
            url: url.to_string(),
            image_url: image.map(str::to_string),
            title: "Title".to_string(),
            formatted_message: "*Title*\n\nBody".to_string(),
            format: PostFormat::SinglePost,
            ..ScrapedItem::default()
        }
    }

    fn feed(scraper_id: &str, channel: &str) -> FeedConfig {
        FeedConfig {
            scraper_id: scraper_id.to_string(),
            feed_url: format!("https://example.com/{scraper_id}"),
            channel_id: channel.to_string(),
        }
    }

    fn registry(scrapers: Vec<Box<dyn Scraper>>) -> HashMap<String, Box<dyn Scraper>> {
        scrapers.into_iter().map(|s| (s.id().to_string(), s)).collect()
    }

    async fn store() -> ProcessedItemStore {
        ProcessedItemStore::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_cycle_delivers_and_marks_new_items() {
        let (bot, photos) = RecordingBot::new(false);
        let scrapers = registry(vec![Box::new(StaticScraper {
            id: "Static",
            items: vec![item("https://example.com/a", Some("https://cdn/a.jpg"))],
        })]);
        let poster = AutoPoster::new(
            scrapers,
            Box::new(bot),
            store().await,
            vec![feed("Static", "@chan")],
        );

        poster.run_cycle(&CancellationToken::new()).await.unwrap();

        assert!(poster.store.is_processed("https://example.com/a").await.unwrap());
        let photos = photos.lock().unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].0, "@chan");
    }

    #[tokio::test]
    async fn test_already_processed_items_are_not_resent() {
        let (bot, photos) = RecordingBot::new(false);
        let scrapers = registry(vec![Box::new(StaticScraper {
            id: "Static",
            items: vec![item("https://example.com/seen", Some("https://cdn/a.jpg"))],
        })]);
        let store = store().await;
        store.mark_processed("https://example.com/seen", None).await.unwrap();

        let poster = AutoPoster::new(scrapers, Box::new(bot), store, vec![feed("Static", "@chan")]);
        poster.run_cycle(&CancellationToken::new()).await.unwrap();

        assert!(photos.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_items_without_image_are_filtered() {
        let (bot, photos) = RecordingBot::new(false);
        let scrapers = registry(vec![Box::new(StaticScraper {
            id: "Static",
            items: vec![
                item("https://example.com/no-image", None),
                item("https://example.com/with-image", Some("https://cdn/b.jpg")),
            ],
        })]);
        let poster = AutoPoster::new(
            scrapers,
            Box::new(bot),
            store().await,
            vec![feed("Static", "@chan")],
        );

        poster.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(photos.lock().unwrap().len(), 1);
        assert!(!poster.store.is_processed("https://example.com/no-image").await.unwrap());
        assert!(poster.store.is_processed("https://example.com/with-image").await.unwrap());
    }

    #[tokio::test]
    async fn test_unregistered_scraper_is_skipped() {
        let (bot, _photos) = RecordingBot::new(false);
        let poster = AutoPoster::new(
            registry(vec![]),
            Box::new(bot),
            store().await,
            vec![feed("Unknown", "@chan")],
        );
        // A feed with no registered scraper is a warning, not an error.
        poster.run_cycle(&CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_failing_feed_does_not_block_next_feed() {
        let (bot, photos) = RecordingBot::new(false);
        let scrapers = registry(vec![
            Box::new(FailingScraper),
            Box::new(StaticScraper {
                id: "Static",
                items: vec![item("https://example.com/b", Some("https://cdn/b.jpg"))],
            }),
        ]);
        let poster = AutoPoster::new(
            scrapers,
            Box::new(bot),
            store().await,
            vec![feed("Failing", "@first"), feed("Static", "@second")],
        );

        poster.run_cycle(&CancellationToken::new()).await.unwrap();

        assert_eq!(photos.lock().unwrap().len(), 1);
        assert!(poster.store.is_processed("https://example.com/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_delivery_leaves_item_unmarked() {
        let (bot, _photos) = RecordingBot::new(true);
        let scrapers = registry(vec![Box::new(StaticScraper {
            id: "Static",
            items: vec![
                item("https://example.com/fails", Some("https://cdn/a.jpg")),
                item("https://example.com/also-fails", Some("https://cdn/b.jpg")),
            ],
        })]);
        let poster = AutoPoster::new(
            scrapers,
            Box::new(bot),
            store().await,
            vec![feed("Static", "@chan")],
        );

        // Send failures are per-item: the cycle itself still succeeds.
        poster.run_cycle(&CancellationToken::new()).await.unwrap();

        assert!(!poster.store.is_processed("https://example.com/fails").await.unwrap());
        assert!(!poster.store.is_processed("https://example.com/also-fails").await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_cycle() {
        let (bot, _photos) = RecordingBot::new(false);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let poster = AutoPoster::new(
            registry(vec![]),
            Box::new(bot),
            store().await,
            vec![feed("Static", "@chan")],
        );
        assert!(matches!(
            poster.run_cycle(&cancel).await,
            Err(PosterError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_run_exits_when_cancelled() {
        let (bot, _photos) = RecordingBot::new(false);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let poster = AutoPoster::new(registry(vec![]), Box::new(bot), store().await, vec![]);
        // Returns promptly instead of sleeping an hour.
        poster.run(cancel).await;
    }
}
