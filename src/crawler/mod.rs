use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use scraper::Html;

use crate::{config::Source, declare::PriceRecord, util};

/// schema.org microdata 解析
pub mod microdata;

/// Where the current price comes from.
#[async_trait]
pub trait PriceSource {
    async fn fetch_price(&self, ident: &str) -> Result<PriceRecord>;
}

/// A public web page that publishes the price as schema.org microdata.
#[derive(Debug, Clone)]
pub struct WebPage {
    pub url: String,
    pub timeout: Option<Duration>,
}

impl WebPage {
    pub fn new(url: String, timeout: Option<Duration>) -> Self {
        Self { url, timeout }
    }

    pub fn from_source(source: &Source, timeout: Option<Duration>) -> Self {
        Self::new(source.url.clone(), timeout)
    }
}

#[async_trait]
impl PriceSource for WebPage {
    async fn fetch_price(&self, ident: &str) -> Result<PriceRecord> {
        let text = util::http::get(&self.url, None, self.timeout).await?;
        parse_price(&text, ident)
            .map_err(|why| anyhow!("Failed to extract the price from {} because {:?}", self.url, why))
    }
}

/// Parses the page text and extracts the price record from it.
///
/// Kept synchronous so the parsed document never lives across an await point.
pub fn parse_price(text: &str, ident: &str) -> Result<PriceRecord> {
    let document = Html::parse_document(text);
    microdata::extract_price(document.root_element(), ident)
}
