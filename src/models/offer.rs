use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::utils::dates::parse_offer_date;

/// One leg of an offer as printed on the result card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSegment {
    pub date: String,
    pub time: String,
    pub route: String,
}

impl RouteSegment {
    pub fn new(date: impl Into<String>, time: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            route: route.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlightOffer {
    pub segments: Vec<RouteSegment>,
    pub price: Decimal,
    pub trip_duration_days: Option<i64>,
    pub earliest_date: Option<NaiveDate>,
}

impl FlightOffer {
    pub fn new(segments: Vec<RouteSegment>, price: Decimal) -> Self {
        Self {
            segments,
            price,
            trip_duration_days: None,
            earliest_date: None,
        }
    }

    /// Parse segment dates and fill in the derived duration and earliest date.
    ///
    /// The duration needs every segment date; the earliest date only needs one.
    pub fn annotate_dates(&mut self, reference: NaiveDate) {
        let parsed: Vec<Option<NaiveDate>> = self
            .segments
            .iter()
            .map(|segment| match parse_offer_date(&segment.date, reference) {
                Ok(date) => Some(date),
                Err(err) => {
                    tracing::debug!("{}", err);
                    None
                }
            })
            .collect();

        let known: Vec<NaiveDate> = parsed.iter().flatten().copied().collect();
        self.earliest_date = known.iter().min().copied();
        self.trip_duration_days = match (known.len() == parsed.len(), known.iter().min(), known.iter().max()) {
            (true, Some(first), Some(last)) => Some((*last - *first).num_days() + 1),
            _ => None,
        };
    }

    /// Earliest segment date, or `NaiveDate::MAX` so undated offers sort last.
    pub fn sort_key(&self) -> NaiveDate {
        self.earliest_date.unwrap_or(NaiveDate::MAX)
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|segment| segment.route.as_str())
    }
}
