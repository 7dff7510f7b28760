//! TechCrunch scraper.
//!
//! Two-phase source with two article layouts: regular stories use the
//! "article hero" template, short takes use the "In Brief" template. The
//! layout is detected per article page and each has its own field
//! selectors. Items are delivered as a photo post with the body threaded
//! into comments.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, instrument};

use super::{attr_of, fetch_text, text_of, Scraper};
use crate::error::Result;
use crate::models::{ArticleData, PostFormat, ScrapedItem};

static LISTING_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.loop-card__title-link").unwrap());

static BRIEF_CAT: Lazy<Selector> = Lazy::new(|| Selector::parse("span.loop-card__cat").unwrap());
static HERO: Lazy<Selector> = Lazy::new(|| Selector::parse("div.article-hero").unwrap());

static HERO_IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.article-hero figure img").unwrap());
static HERO_CATEGORY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.wp-block-tenup-post-primary-term").unwrap());
static HERO_DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.article-hero__date time").unwrap());
static HERO_AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("div.article-hero__authors a").unwrap());
static HERO_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h1.article-hero__title").unwrap());

static BRIEF_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("figure.wp-block-post-featured-image > img").unwrap());
static BRIEF_CATEGORY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.wp-block-tenup-post-primary-term").unwrap());
static BRIEF_DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("time").unwrap());
static BRIEF_AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a.post-authors-list__author").unwrap());
static BRIEF_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h1.wp-block-post-title").unwrap());

static ENTRY_CONTENT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.entry-content").unwrap());
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static TERMS: Lazy<Selector> = Lazy::new(|| Selector::parse("div.tc23-post-relevant-terms__terms").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

pub struct TechCrunchScraper {
    http: reqwest::Client,
}

impl TechCrunchScraper {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Scraper for TechCrunchScraper {
    fn id(&self) -> &'static str {
        "TechCrunch"
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    async fn scrape(&self, url: &str) -> Result<Vec<ScrapedItem>> {
        let html = fetch_text(&self.http, url).await?;
        let links = parse_listing_links(&html);
        debug!(count = links.len(), "Indexed article links");

        let items: Vec<ScrapedItem> = stream::iter(links)
            .then(|link| {
                let http = self.http.clone();
                async move {
                    let article = match fetch_text(&http, &link).await {
                        Ok(body) => parse_article(&body),
                        Err(e) => {
                            error!(error = %e, url = %link, "Article fetch failed; skipping");
                            return None;
                        }
                    };
                    let Some(article) = article else {
                        debug!(url = %link, "Cannot determine article type; skipping");
                        return None;
                    };
                    debug!(url = %link, category = ?article.category, "Parsed article");
                    let title = article.title.clone().filter(|title| !title.is_empty())?;

                    let byline = match (&article.author_name, &article.author_link) {
                        (Some(name), Some(author_url)) => format!("\n\nBy [{name}]({author_url})"),
                        (Some(name), None) => format!("\n\nBy {name}"),
                        _ => String::new(),
                    };

                    Some(ScrapedItem {
                        url: link,
                        image_url: article.main_image_url.clone(),
                        formatted_message: format!("*{title}*\n\n{}{byline}", article.article_text),
                        publish_date: Utc::now(),
                        format: PostFormat::MultiViaComments,
                        tags: article.tags,
                        author_name: article.author_name,
                        author_link: article.author_link,
                        title,
                        plain_text: article.article_text,
                        plain_date: article.post_date,
                        ..ScrapedItem::default()
                    })
                }
            })
            .filter_map(|item| std::future::ready(item))
            .collect()
            .await;

        info!(count = items.len(), "Scraped TechCrunch articles");
        Ok(items)
    }
}

fn parse_listing_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LISTING_LINK)
        .filter_map(|a| attr_of(a, "href"))
        .unique()
        .collect()
}

/// Detect the article layout and extract fields; `None` when the page
/// matches neither layout.
fn parse_article(html: &str) -> Option<ArticleData> {
    let document = Html::parse_document(html);

    let is_brief = document
        .select(&BRIEF_CAT)
        .any(|cat| text_of(cat).contains("In Brief"));

    if is_brief {
        Some(parse_brief_article(&document))
    } else if document.select(&HERO).next().is_some() {
        Some(parse_full_article(&document))
    } else {
        None
    }
}

fn parse_full_article(document: &Html) -> ArticleData {
    let mut article = ArticleData::default();

    article.main_image_url = document.select(&HERO_IMAGE).next().and_then(|img| attr_of(img, "src"));
    article.category = document.select(&HERO_CATEGORY).next().map(text_of);
    article.post_date = document.select(&HERO_DATE).next().map(text_of);

    if let Some(author) = document.select(&HERO_AUTHOR).next() {
        article.author_name = Some(text_of(author)).filter(|name| !name.is_empty());
        article.author_link = attr_of(author, "href");
    }

    article.title = document.select(&HERO_TITLE).next().map(text_of);
    article.article_text = entry_content_text(document);
    article.tags = relevant_terms(document, false);

    article
}

fn parse_brief_article(document: &Html) -> ArticleData {
    let mut article = ArticleData::default();

    article.main_image_url = document.select(&BRIEF_IMAGE).next().and_then(|img| attr_of(img, "src"));
    article.category = document.select(&BRIEF_CATEGORY).next().map(text_of);
    article.post_date = document.select(&BRIEF_DATE).next().map(text_of);

    if let Some(author) = document.select(&BRIEF_AUTHOR).next() {
        article.author_name = Some(text_of(author)).filter(|name| !name.is_empty());
        article.author_link = attr_of(author, "href");
    }

    article.title = document.select(&BRIEF_TITLE).next().map(text_of);
    article.article_text = entry_content_text(document);
    article.tags = relevant_terms(document, true);

    article
}

/// Whether a paragraph sits inside an ad unit or inline CTA container.
fn inside_ad(element: ElementRef<'_>) -> bool {
    element.ancestors().filter_map(ElementRef::wrap).any(|ancestor| {
        ancestor
            .value()
            .classes()
            .any(|class| class.contains("ad-unit") || class.contains("inline-cta"))
    })
}

fn entry_content_text(document: &Html) -> String {
    let Some(content) = document.select(&ENTRY_CONTENT).next() else {
        return String::new();
    };
    content
        .select(&PARAGRAPH)
        .filter(|paragraph| !inside_ad(*paragraph))
        .map(text_of)
        .filter(|text| !text.is_empty())
        .join("\n\n")
}

fn relevant_terms(document: &Html, skip_region_links: bool) -> Vec<String> {
    let Some(container) = document.select(&TERMS).next() else {
        return Vec::new();
    };
    container
        .select(&ANCHOR)
        .filter(|a| {
            !skip_region_links
                || !attr_of(*a, "href").is_some_and(|href| href.contains("/region/"))
        })
        .map(text_of)
        .filter(|tag| !tag.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <a class="loop-card__title-link" href="https://techcrunch.com/2025/05/13/story-one/">One</a>
        <a class="loop-card__title-link" href="https://techcrunch.com/2025/05/13/story-two/">Two</a>
        <a class="loop-card__title-link" href="https://techcrunch.com/2025/05/13/story-one/">One again</a>
        </body></html>
    "#;

    const FULL_ARTICLE: &str = r#"
        <html><body>
        <div class="article-hero">
            <figure><img src="https://cdn.example.com/hero.jpg?w=1024"></figure>
            <h1 class="article-hero__title">Startup Raises Big Round</h1>
            <div class="article-hero__date"><time>May 13, 2025</time></div>
            <div class="article-hero__authors"><a href="https://techcrunch.com/author/sam">Sam Writer</a></div>
        </div>
        <a class="wp-block-tenup-post-primary-term" href="/category/startups/">Startups</a>
        <div class="entry-content">
            <p>The company announced a round.</p>
            <div class="ad-unit"><p>Sponsored content.</p></div>
            <div class="inline-cta"><p>Subscribe to our newsletter.</p></div>
            <p>Investors are excited.</p>
        </div>
        <div class="tc23-post-relevant-terms__terms">
            <a href="/tag/funding/">Funding</a>
            <a href="/region/europe/">Europe</a>
        </div>
        </body></html>
    "#;

    const BRIEF_ARTICLE: &str = r#"
        <html><body>
        <span class="loop-card__cat">In Brief</span>
        <figure class="wp-block-post-featured-image"><img src="https://cdn.example.com/brief.jpg"></figure>
        <h1 class="wp-block-post-title">Quick Take on a Deal</h1>
        <time>May 14, 2025</time>
        <a class="post-authors-list__author" href="https://techcrunch.com/author/kim">Kim Reporter</a>
        <div class="entry-content"><p>A short update.</p></div>
        <div class="tc23-post-relevant-terms__terms">
            <a href="/tag/deals/">Deals</a>
            <a href="/region/asia/">Asia</a>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_listing_links_are_deduplicated() {
        let links = parse_listing_links(LISTING);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0], "https://techcrunch.com/2025/05/13/story-one/");
    }

    #[test]
    fn test_full_article_extraction() {
        let article = parse_article(FULL_ARTICLE).unwrap();
        assert_eq!(article.title.as_deref(), Some("Startup Raises Big Round"));
        assert_eq!(article.main_image_url.as_deref(), Some("https://cdn.example.com/hero.jpg?w=1024"));
        assert_eq!(article.category.as_deref(), Some("Startups"));
        assert_eq!(article.post_date.as_deref(), Some("May 13, 2025"));
        assert_eq!(article.author_name.as_deref(), Some("Sam Writer"));
        assert_eq!(
            article.article_text,
            "The company announced a round.\n\nInvestors are excited."
        );
    }

    #[test]
    fn test_full_article_keeps_region_terms() {
        let article = parse_article(FULL_ARTICLE).unwrap();
        assert_eq!(article.tags, vec!["Funding", "Europe"]);
    }

    #[test]
    fn test_brief_article_extraction() {
        let article = parse_article(BRIEF_ARTICLE).unwrap();
        assert_eq!(article.title.as_deref(), Some("Quick Take on a Deal"));
        assert_eq!(article.author_name.as_deref(), Some("Kim Reporter"));
        assert_eq!(article.article_text, "A short update.");
    }

    #[test]
    fn test_brief_article_skips_region_terms() {
        let article = parse_article(BRIEF_ARTICLE).unwrap();
        assert_eq!(article.tags, vec!["Deals"]);
    }

    #[test]
    fn test_unknown_layout_is_none() {
        assert!(parse_article("<html><body><p>plain page</p></body></html>").is_none());
    }
}
