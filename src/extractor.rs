use rust_decimal::Decimal;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::SiteConfig;
use crate::models::{FlightOffer, RouteSegment};
use crate::utils::error::{AppError, Result};

static PRICE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("valid price regex"));

/// Reads offer cards out of a results page snapshot.
pub struct ResultExtractor {
    card: Selector,
    price: Selector,
    dates: Selector,
    times: Selector,
    routes: Selector,
}

impl ResultExtractor {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        Ok(Self {
            card: parse_selector(&site.result_card)?,
            price: parse_selector(&site.card_price)?,
            dates: parse_selector(&site.card_dates)?,
            times: parse_selector(&site.card_times)?,
            routes: parse_selector(&site.card_routes)?,
        })
    }

    /// Offers in card order, at most `limit` cards.
    ///
    /// Within a card the n-th date, time and route belong to the same segment.
    pub fn extract(&self, html: &str, limit: usize) -> Vec<FlightOffer> {
        let document = Html::parse_document(html);
        let mut offers = Vec::new();

        for (index, card) in document.select(&self.card).take(limit).enumerate() {
            match self.read_card(card) {
                Some(offer) => offers.push(offer),
                None => debug!("Skipped result card {}", index + 1),
            }
        }

        debug!("Extracted {} offers", offers.len());
        offers
    }

    fn read_card(&self, card: ElementRef<'_>) -> Option<FlightOffer> {
        let price_text = card.select(&self.price).next().map(element_text)?;
        let Some(price) = parse_price(&price_text) else {
            warn!("Skipping card with unreadable price '{}'", price_text);
            return None;
        };

        let dates: Vec<String> = card.select(&self.dates).map(element_text).collect();
        let times: Vec<String> = card.select(&self.times).map(element_text).collect();
        let routes: Vec<String> = card.select(&self.routes).map(element_text).collect();

        if dates.len() != routes.len() || times.len() != routes.len() {
            warn!(
                "Card segment fields differ in length (dates {}, times {}, routes {})",
                dates.len(),
                times.len(),
                routes.len()
            );
        }

        let segments: Vec<RouteSegment> = dates
            .into_iter()
            .zip(times)
            .zip(routes)
            .map(|((date, time), route)| RouteSegment::new(date, time, route))
            .collect();

        if segments.is_empty() {
            warn!("Skipping card without segments (price {})", price);
            return None;
        }

        Some(FlightOffer::new(segments, price))
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::Validation(format!("Invalid CSS selector '{}': {:?}", selector, e)))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First number in a price label: "$1,299.99" -> 1299.99, "27 USD" -> 27.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let number = PRICE_NUMBER.find(text)?.as_str().replace(',', "");
    Decimal::from_str(&number).ok()
}
