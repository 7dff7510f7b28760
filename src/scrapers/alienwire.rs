//! AlienWire feed scraper.
//!
//! Listing-only source: every field needed for a post is present on the
//! feed page itself, so no per-article fetch happens. Items are delivered
//! as single photo posts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use super::{attr_of, parse_absolute_date, text_of, Scraper};
use crate::error::Result;
use crate::models::ScrapedItem;

static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("div.coast-feed-item").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.item-title").unwrap());
static TIME: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static SUMMARY: Lazy<Selector> = Lazy::new(|| Selector::parse("section.item-summary > span").unwrap());

pub struct AlienWireScraper {
    http: reqwest::Client,
}

impl AlienWireScraper {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Scraper for AlienWireScraper {
    fn id(&self) -> &'static str {
        "AlienWire"
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn scrape(&self, url: &str) -> Result<Vec<ScrapedItem>> {
        let base_url = Url::parse(url)?;
        let html = self.http.get(url).send().await?.text().await?;
        let items = parse_listing(&html, &base_url);
        info!(count = items.len(), "Scraped AlienWire listing");
        Ok(items)
    }
}

fn parse_listing(html: &str, base_url: &Url) -> Vec<ScrapedItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for node in document.select(&ITEM) {
        let image_url = node.select(&IMAGE).next().and_then(|img| attr_of(img, "data-src"));

        let link_node = node.select(&TITLE_LINK).next();
        let title = link_node.map(text_of).unwrap_or_default();
        // Feed hrefs may be relative; resolve against the listing URL.
        let link = link_node
            .and_then(|a| attr_of(a, "href"))
            .and_then(|href| base_url.join(&href).ok())
            .map(|resolved| resolved.to_string());

        let publish_date = node
            .select(&TIME)
            .next()
            .and_then(|time| parse_absolute_date(&text_of(time)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let summary = node.select(&SUMMARY).next().map(text_of).unwrap_or_default();

        let Some(link) = link else {
            debug!("Item without link skipped");
            continue;
        };
        if title.is_empty() {
            debug!(%link, "Item without title skipped");
            continue;
        }

        items.push(ScrapedItem {
            url: link.clone(),
            image_url,
            formatted_message: format!("*{title}*\n\n{summary}\n\n[Read more]({link})"),
            publish_date,
            title,
            ..ScrapedItem::default()
        });
    }

    items
}
