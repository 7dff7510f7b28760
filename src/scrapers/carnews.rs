//! Car News archive scraper.
//!
//! Listing-only source. The archive page shows relative dates ("Posted 11
//! Hours Ago", "Posted Yesterday") alongside absolute ones, handled by the
//! shared "Posted …" heuristics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};

use super::{attr_of, parse_posted_date, text_of, Scraper};
use crate::error::Result;
use crate::models::ScrapedItem;

static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("div.category-archive-post").unwrap());
static THUMB: Lazy<Selector> = Lazy::new(|| Selector::parse("img.archive-post-thumb").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.card-post-title-link").unwrap());
static TITLE_DESKTOP: Lazy<Selector> = Lazy::new(|| Selector::parse("span.desktop").unwrap());
static TITLE_MOBILE: Lazy<Selector> = Lazy::new(|| Selector::parse("span.mobile").unwrap());
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.item-wrapper--author a").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("p.card-post-date").unwrap());

pub struct CarNewsScraper {
    http: reqwest::Client,
}

impl CarNewsScraper {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Scraper for CarNewsScraper {
    fn id(&self) -> &'static str {
        "CarNews"
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn scrape(&self, url: &str) -> Result<Vec<ScrapedItem>> {
        let html = self.http.get(url).send().await?.text().await?;
        let items = parse_listing(&html);
        info!(count = items.len(), "Scraped CarNews listing");
        Ok(items)
    }
}

fn parse_listing(html: &str) -> Vec<ScrapedItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for node in document.select(&ITEM) {
        let image_url = node.select(&THUMB).next().and_then(|img| attr_of(img, "src"));

        let link_node = node.select(&TITLE_LINK).next();
        let link = link_node.and_then(|a| attr_of(a, "href"));
        // Desktop title span preferred; mobile variant as fallback.
        let title = link_node
            .and_then(|a| a.select(&TITLE_DESKTOP).next().or_else(|| a.select(&TITLE_MOBILE).next()))
            .map(text_of)
            .unwrap_or_default();

        let author_node = node.select(&AUTHOR).next();
        let author_name = author_node.map(text_of).filter(|name| !name.is_empty());
        let author_link = author_node.and_then(|a| attr_of(a, "href"));

        let publish_date = node
            .select(&DATE)
            .next()
            .and_then(|date| parse_posted_date(&text_of(date)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let Some(link) = link else {
            debug!("Item without link skipped");
            continue;
        };
        if title.is_empty() {
            debug!(%link, "Item without title skipped");
            continue;
        }

        let byline = match (&author_name, &author_link) {
            (Some(name), Some(author_url)) => format!("\n\nBy [{name}]({author_url})"),
            (Some(name), None) => format!("\n\nBy {name}"),
            _ => String::new(),
        };

        items.push(ScrapedItem {
            url: link.clone(),
            image_url,
            formatted_message: format!("*{title}*\n\n[Read more]({link}){byline}"),
            publish_date,
            title,
            author_name,
            author_link,
            ..ScrapedItem::default()
        });
    }

    items
}
