use tracing::{debug, info};

use crate::models::{FilterSpec, FlightOffer};

/// Route-text tokens that disqualify an offer, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct ExcludedAirports {
    tokens: Vec<String>,
}

impl ExcludedAirports {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|token| token.as_ref().trim().to_lowercase())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }

    /// The first excluded token found in `route`, if any.
    pub fn matching(&self, route: &str) -> Option<&str> {
        let route = route.to_lowercase();
        self.tokens
            .iter()
            .find(|token| route.contains(token.as_str()))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: usize,
    pub excluded_airport: usize,
    pub too_long: usize,
}

/// Drops offers touching an excluded airport or exceeding the trip length limit.
pub struct ResultFilter<'a> {
    excluded: &'a ExcludedAirports,
}

impl<'a> ResultFilter<'a> {
    pub fn new(excluded: &'a ExcludedAirports) -> Self {
        Self { excluded }
    }

    /// Keep the offers `spec` accepts, with dates annotated, in their original order.
    ///
    /// One excluded segment drops the whole offer. Offers whose dates cannot be
    /// read are kept with an unknown duration.
    pub fn apply(&self, spec: &FilterSpec, offers: Vec<FlightOffer>) -> (Vec<FlightOffer>, FilterStats) {
        let mut stats = FilterStats::default();
        let max_days = spec.trip.max_trip_days();

        let kept: Vec<FlightOffer> = offers
            .into_iter()
            .filter_map(|mut offer| {
                if let Some((route, token)) = offer
                    .routes()
                    .find_map(|route| self.excluded.matching(route).map(|token| (route, token)))
                {
                    debug!("Dropping {} offer: route '{}' contains '{}'", offer.price, route, token);
                    stats.excluded_airport += 1;
                    return None;
                }

                offer.annotate_dates(spec.reference_date());

                if let (Some(limit), Some(days)) = (max_days, offer.trip_duration_days) {
                    if days > i64::from(limit) {
                        debug!("Dropping {} offer: {} days exceeds {}", offer.price, days, limit);
                        stats.too_long += 1;
                        return None;
                    }
                }

                Some(offer)
            })
            .collect();

        stats.kept = kept.len();
        info!(
            "Filter '{}': kept {} offers, dropped {} for excluded airports, {} for trip length",
            spec.name, stats.kept, stats.excluded_airport, stats.too_long
        );
        (kept, stats)
    }
}
