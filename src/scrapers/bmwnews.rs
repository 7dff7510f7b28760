//! BMW news scraper.
//!
//! Two-phase source: the listing page carries title, link, image, and an
//! exact-format date; each article page is fetched separately for the full
//! body text, author, and tags. Items are delivered as a photo post with
//! the body threaded into comments.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, instrument, warn};

use super::{attr_of, fetch_text, text_of, Scraper};
use crate::error::Result;
use crate::models::{ArticleData, PostFormat, ScrapedItem};

static ARTICLE: Lazy<Selector> = Lazy::new(|| Selector::parse("article").unwrap());
static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("h3.post-title a").unwrap());
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.post-image img").unwrap());
static DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.post-meta span.post-date").unwrap());

static CONTENT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.post-content").unwrap());
static BODY_BLOCKS: Lazy<Selector> = Lazy::new(|| Selector::parse("p, h1, h2, h3").unwrap());
static AUTHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"p.byline span[itemprop="author"] a"#).unwrap());
static AUTHOR_NAME: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"span[itemprop="name"]"#).unwrap());
static TAGS: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"div.the-tags li a[rel="tag"]"#).unwrap());
static EMBEDDED_IMAGES: Lazy<Selector> = Lazy::new(|| Selector::parse("img").unwrap());
static EMBEDDED_VIDEOS: Lazy<Selector> = Lazy::new(|| Selector::parse("iframe").unwrap());

struct ListingEntry {
    title: String,
    link: String,
    image_url: Option<String>,
    publish_date: DateTime<Utc>,
}

pub struct BmwNewsScraper {
    http: reqwest::Client,
}

impl BmwNewsScraper {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Scraper for BmwNewsScraper {
    fn id(&self) -> &'static str {
        "BmwNews"
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn scrape(&self, url: &str) -> Result<Vec<ScrapedItem>> {
        let html = fetch_text(&self.http, url).await?;
        let entries = parse_listing(&html);
        debug!(count = entries.len(), "Indexed listing entries");

        let items: Vec<ScrapedItem> = stream::iter(entries)
            .then(|entry| {
                let http = self.http.clone();
                async move {
                    let article = match fetch_text(&http, &entry.link).await {
                        Ok(body) => parse_article(&body),
                        Err(e) => {
                            error!(error = %e, url = %entry.link, "Article fetch failed; skipping");
                            return None;
                        }
                    };

                    let formatted_message = format!(
                        "📰 *{}*\n\n[Read more]({})\n🕒 {}",
                        entry.title,
                        entry.link,
                        entry.publish_date.format("%Y-%m-%d %H:%M")
                    );

                    Some(ScrapedItem {
                        url: entry.link,
                        image_url: entry.image_url,
                        formatted_message,
                        publish_date: entry.publish_date,
                        format: PostFormat::MultiViaComments,
                        tags: article.tags,
                        author_name: article.author_name,
                        author_link: article.author_link,
                        title: entry.title,
                        plain_text: article.article_text,
                        images: article.images,
                        videos: article.videos,
                        ..ScrapedItem::default()
                    })
                }
            })
            .filter_map(|item| std::future::ready(item))
            .collect()
            .await;

        info!(count = items.len(), "Scraped BmwNews articles");
        Ok(items)
    }
}

fn parse_listing(html: &str) -> Vec<ListingEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    for node in document.select(&ARTICLE) {
        let link_node = node.select(&TITLE_LINK).next();
        let title = link_node.map(text_of).unwrap_or_default();
        let link = link_node.and_then(|a| attr_of(a, "href"));

        let image_url = node.select(&IMAGE).next().and_then(|img| attr_of(img, "src"));

        // Exact listing format first; anything else becomes "now".
        let publish_date = node
            .select(&DATE)
            .next()
            .and_then(|date| NaiveDate::parse_from_str(&text_of(date), "%B %d, %Y").ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|date| Utc.from_utc_datetime(&date))
            .unwrap_or_else(Utc::now);

        let Some(link) = link else { continue };
        if title.is_empty() {
            continue;
        }

        entries.push(ListingEntry {
            title,
            link,
            image_url,
            publish_date,
        });
    }

    entries
}

/// Whether an element sits inside one of the site's promo/widget blocks.
fn inside_promo(element: ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().classes().any(|class| class.starts_with("bmwbl-")))
}

fn parse_article(html: &str) -> ArticleData {
    let document = Html::parse_document(html);
    let mut article = ArticleData::default();

    if let Some(content) = document.select(&CONTENT).next() {
        let blocks: Vec<String> = content
            .select(&BODY_BLOCKS)
            .filter(|block| !inside_promo(*block))
            .map(text_of)
            .filter(|text| !text.is_empty())
            .collect();
        article.article_text = blocks.join("\n\n");

        article.images = content
            .select(&EMBEDDED_IMAGES)
            .filter(|img| !inside_promo(*img))
            .filter_map(|img| attr_of(img, "src"))
            .collect();
        article.videos = content
            .select(&EMBEDDED_VIDEOS)
            .filter_map(|frame| attr_of(frame, "src"))
            .collect();
    } else {
        warn!("Post content not found");
    }

    if let Some(author) = document.select(&AUTHOR).next() {
        article.author_name = author
            .select(&AUTHOR_NAME)
            .next()
            .map(text_of)
            .filter(|name| !name.is_empty());
        article.author_link = attr_of(author, "href");
    } else {
        warn!("Author not found");
    }

    article.tags = document
        .select(&TAGS)
        .map(text_of)
        .filter(|tag| !tag.is_empty())
        .collect();

    article
}
