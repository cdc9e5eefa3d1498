use std::sync::LazyLock;

use chrono::{Datelike, Month, NaiveDate, Weekday};
use regex::Regex;

use super::error::{AppError, Result};

static ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex"));

/// Dates further than this before the reference are assumed to belong to the next year.
const ROLLOVER_DAYS: i64 = 183;

/// Remove English ordinal suffixes: "May 1st" -> "May 1".
pub fn strip_ordinals(text: &str) -> String {
    ORDINAL_SUFFIX.replace_all(text, "$1").into_owned()
}

/// Parse an offer date as shown on a result card.
///
/// Accepts ISO dates and any ordering of day, month name and optional year,
/// with or without a weekday ("Sat, May 10th", "10th May 2025", "May 10th, 2025").
/// When the year is missing it is taken from `reference`, rolling into the
/// following year for dates that would otherwise lie far in the past.
pub fn parse_offer_date(text: &str, reference: NaiveDate) -> Result<NaiveDate> {
    let trimmed = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    let cleaned = strip_ordinals(trimmed);
    let mut day = None;
    let mut month = None;
    let mut year = None;

    for token in cleaned
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | '/' | '-'))
        .filter(|t| !t.is_empty())
    {
        if let Ok(number) = token.parse::<u32>() {
            match token.len() {
                4 if year.is_none() => year = Some(number as i32),
                1 | 2 if day.is_none() => day = Some(number),
                _ => return Err(unparseable(text)),
            }
        } else if let Ok(parsed) = token.parse::<Month>() {
            if month.replace(parsed).is_some() {
                return Err(unparseable(text));
            }
        } else if token.parse::<Weekday>().is_err() {
            return Err(unparseable(text));
        }
    }

    let (Some(day), Some(month)) = (day, month) else {
        return Err(unparseable(text));
    };

    match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month.number_from_month(), day)
            .ok_or_else(|| unparseable(text)),
        None => {
            let date = NaiveDate::from_ymd_opt(reference.year(), month.number_from_month(), day)
                .ok_or_else(|| unparseable(text))?;
            if (reference - date).num_days() > ROLLOVER_DAYS {
                NaiveDate::from_ymd_opt(reference.year() + 1, month.number_from_month(), day)
                    .ok_or_else(|| unparseable(text))
            } else {
                Ok(date)
            }
        }
    }
}

/// Label a month the way the date picker headers do: "May 2025".
pub fn month_label(month: Month, year: i32) -> String {
    format!("{} {}", month.name(), year)
}

pub fn month_of(date: NaiveDate) -> Month {
    Month::try_from(date.month() as u8).unwrap_or(Month::January)
}

fn unparseable(text: &str) -> AppError {
    AppError::OfferDateUnparseable {
        text: text.to_string(),
    }
}
