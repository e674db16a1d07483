pub mod selectors;

use crate::http::build_client;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::Html;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;
use urlencoding::encode;

pub static CATALOG_PAGE_ROOT: Lazy<String> = Lazy::new(|| {
    std::env::var("CATALOG_PAGE_ROOT")
        .unwrap_or_else(|_| "https://sp.cargo-avto.ru/catalog/".to_string())
});

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("page request failed for {url}: {message}")]
    Request { url: String, message: String },
    #[error("page {url} has no element matching `{selector}`")]
    MissingElement { url: String, selector: &'static str },
}

/// Which page to read for a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeTarget {
    /// Catalog product page addressed by product key.
    Catalog { product_key: String },
    /// Bag supplier page resolved from the URL table.
    Bags { url: String },
}

impl ScrapeTarget {
    pub fn url(&self) -> String {
        match self {
            ScrapeTarget::Catalog { product_key } => {
                format!("{}{}/", *CATALOG_PAGE_ROOT, encode(product_key))
            }
            ScrapeTarget::Bags { url } => url.clone(),
        }
    }
}

/// Raw text pulled from a page; validated into an `Offer` by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOffer {
    pub price: String,
    pub available_count: String,
}

pub trait PageScraper {
    async fn scrape(&self, target: &ScrapeTarget) -> Result<RawOffer, ScrapeError>;
}

/// Fetches supplier pages over HTTP and reads them with CSS selectors.
pub struct HttpScraper {
    http: Client,
    delay: Duration,
}

impl HttpScraper {
    pub fn new(delay: Duration) -> Self {
        Self {
            http: build_client(30),
            delay,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, ScrapeError> {
        let request_err = |message: String| ScrapeError::Request {
            url: url.to_string(),
            message,
        };
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| request_err(err.to_string()))?;
        if !response.status().is_success() {
            return Err(request_err(format!("HTTP {}", response.status())));
        }
        response.text().await.map_err(|err| request_err(err.to_string()))
    }
}

impl PageScraper for HttpScraper {
    async fn scrape(&self, target: &ScrapeTarget) -> Result<RawOffer, ScrapeError> {
        let url = target.url();
        // supplier pages throttle bursts
        sleep(self.delay).await;
        debug!(target = "unitsync.scrape", url = %url, "page_fetch");
        let body = self.fetch(&url).await?;
        match target {
            ScrapeTarget::Catalog { .. } => parse_catalog_page(&url, &body),
            ScrapeTarget::Bags { .. } => parse_bags_page(&url, &body),
        }
    }
}

pub fn parse_catalog_page(url: &str, html: &str) -> Result<RawOffer, ScrapeError> {
    let document = Html::parse_document(html);
    let price = document
        .select(&selectors::catalog::PRICE)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or_else(|| ScrapeError::MissingElement {
            url: url.to_string(),
            selector: "catalog price",
        })?;
    let stores = document
        .select(&selectors::catalog::AVAILABLE_STORE)
        .count();
    Ok(RawOffer {
        price: clean_catalog_price(&price),
        available_count: stores.to_string(),
    })
}

pub fn parse_bags_page(url: &str, html: &str) -> Result<RawOffer, ScrapeError> {
    let document = Html::parse_document(html);
    let in_stock = document
        .select(&selectors::bags::STOCK_LABEL)
        .next()
        .map(|el| el.text().collect::<String>())
        .is_some_and(|label| label.contains(selectors::bags::IN_STOCK_TEXT));
    let price = document
        .select(&selectors::bags::PRICE)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or_else(|| ScrapeError::MissingElement {
            url: url.to_string(),
            selector: "bags price",
        })?;
    let available = if in_stock {
        selectors::bags::IN_STOCK_LEVEL
    } else {
        0
    };
    Ok(RawOffer {
        price: clean_bags_price(&price),
        available_count: available.to_string(),
    })
}

/// `"1 234 p"` -> `"1234"`.
fn clean_catalog_price(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ch.is_whitespace() && !matches!(ch, 'p' | 'р'))
        .collect()
}

/// `"23 руб."` -> `"23"`; an empty label reads as zero.
fn clean_bags_price(raw: &str) -> String {
    raw.split_whitespace()
        .next()
        .map(|token| token.replace('№', ""))
        .filter(|token| !token.is_empty())
        .unwrap_or_else(|| "0".to_string())
}
