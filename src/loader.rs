use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::{Month, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::models::{DateRange, FilterSpec, TripType};
use crate::utils::error::{AppError, Result};

/// One row of the filters file: lowercase column name -> trimmed text.
pub type RawRow = BTreeMap<String, String>;

#[derive(Debug, Default)]
pub struct LoadReport {
    pub specs: Vec<FilterSpec>,
    pub rejected: Vec<AppError>,
    pub disabled: usize,
}

#[derive(Debug, Deserialize)]
struct FiltersFile {
    #[serde(default)]
    filters: Vec<toml::Table>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TripKind {
    OneWay,
    Return,
}

/// Read the filters file and normalize every row.
pub fn load_filters_file(path: &Path) -> Result<LoadReport> {
    let text = std::fs::read_to_string(path)?;
    let rows = rows_from_toml(&text)?;
    info!("Loaded {} filter rows from {}", rows.len(), path.display());
    Ok(load_filters(&rows))
}

/// Flatten `[[filters]]` tables into text rows. Nested values are dropped with a warning.
pub fn rows_from_toml(text: &str) -> Result<Vec<RawRow>> {
    let file: FiltersFile = toml::from_str(text)?;
    Ok(file
        .filters
        .into_iter()
        .enumerate()
        .map(|(index, table)| {
            table
                .into_iter()
                .filter_map(|(key, value)| match scalar_text(&value) {
                    Some(text) => Some((key.to_lowercase(), text)),
                    None => {
                        warn!("Ignoring non-scalar column '{}' in filter row {}", key, index + 1);
                        None
                    }
                })
                .collect()
        })
        .collect())
}

fn scalar_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.trim().to_string()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

/// Turn raw rows into validated filters, in row order.
///
/// Disabled rows are skipped. An invalid row is reported and skipped; the
/// remaining rows still load.
pub fn load_filters(rows: &[RawRow]) -> LoadReport {
    let mut report = LoadReport::default();
    let mut seen = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        let row_number = index + 1;
        let name = row.get("name").cloned().unwrap_or_default();

        if !is_enabled(row) {
            info!("Skipping disabled filter row {} ({})", row_number, name);
            report.disabled += 1;
            continue;
        }

        match parse_row(row) {
            Ok(spec) => {
                if !seen.insert(spec.name.clone()) {
                    warn!("Duplicate filter name '{}' in row {}", spec.name, row_number);
                }
                debug!("Accepted filter {}", spec);
                report.specs.push(spec);
            }
            Err(message) => {
                let err = AppError::ConfigRowInvalid {
                    row: row_number,
                    name,
                    message,
                };
                warn!("{}", err);
                report.rejected.push(err);
            }
        }
    }

    report
}

fn is_enabled(row: &RawRow) -> bool {
    row.get("enabled")
        .map(|value| value.is_empty() || value.eq_ignore_ascii_case("true"))
        .unwrap_or(true)
}

fn parse_row(row: &RawRow) -> std::result::Result<FilterSpec, String> {
    let name = required(row, "name")?.to_string();
    let kind = parse_trip_kind(required(row, "trip_type")?)?;
    let origin = required(row, "origin")?.to_string();
    let destination = optional(row, "destination").map(str::to_string);

    let departure = parse_range(row, "depart")?.ok_or("missing departure range (depart_from/depart_to)")?;
    let return_range = parse_range(row, "return")?;
    let max_days = optional_positive(row, "max_days")?;

    let trip = match (kind, return_range) {
        (TripKind::OneWay, None) => {
            if max_days.is_some() {
                debug!("Ignoring max_days on one-way filter '{}'", name);
            }
            TripType::OneWay
        }
        (TripKind::OneWay, Some(_)) => return Err("one-way filter must not have a return range".to_string()),
        (TripKind::Return, Some(return_range)) => TripType::Return {
            return_range,
            max_trip_days: max_days,
        },
        (TripKind::Return, None) => {
            return Err("return filter requires a return range (return_from/return_to)".to_string());
        }
    };

    let currency = required(row, "currency")?;
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(format!("invalid currency code '{}'", currency));
    }

    Ok(FilterSpec {
        name,
        trip,
        origin,
        destination,
        departure,
        currency: currency.to_ascii_uppercase(),
        max_results: required_positive(row, "max_results")?,
        max_budget: required_positive(row, "max_budget")?,
    })
}

fn optional<'a>(row: &'a RawRow, key: &str) -> Option<&'a str> {
    row.get(key).map(String::as_str).filter(|value| !value.is_empty())
}

fn required<'a>(row: &'a RawRow, key: &str) -> std::result::Result<&'a str, String> {
    optional(row, key).ok_or_else(|| format!("missing required column '{}'", key))
}

fn parse_positive(key: &str, value: &str) -> std::result::Result<u32, String> {
    match value.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{}' must be a positive integer, got '{}'", key, value)),
    }
}

fn required_positive(row: &RawRow, key: &str) -> std::result::Result<u32, String> {
    parse_positive(key, required(row, key)?)
}

fn optional_positive(row: &RawRow, key: &str) -> std::result::Result<Option<u32>, String> {
    optional(row, key).map(|value| parse_positive(key, value)).transpose()
}

fn parse_trip_kind(value: &str) -> std::result::Result<TripKind, String> {
    match value.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
        "one_way" | "oneway" => Ok(TripKind::OneWay),
        "return" | "round" | "round_trip" => Ok(TripKind::Return),
        _ => Err(format!("unknown trip_type '{}'", value)),
    }
}

/// Read `{prefix}_from`/`{prefix}_to`. Both absent means no range.
fn parse_range(row: &RawRow, prefix: &str) -> std::result::Result<Option<DateRange>, String> {
    let from = optional(row, &format!("{}_from", prefix));
    let to = optional(row, &format!("{}_to", prefix));

    let (from, to) = match (from, to) {
        (None, None) => return Ok(None),
        (Some(from), Some(to)) => (from, to),
        _ => return Err(format!("{} range needs both {}_from and {}_to", prefix, prefix, prefix)),
    };

    let from = parse_endpoint(row, prefix, from, false)?;
    let to = parse_endpoint(row, prefix, to, true)?;
    DateRange::new(from, to).map(Some)
}

/// A range endpoint is either a full date or a day number completed from the
/// month/year columns. The `to` endpoint prefers `{prefix}_to_month`/`{prefix}_to_year`.
fn parse_endpoint(row: &RawRow, prefix: &str, value: &str, is_to: bool) -> std::result::Result<NaiveDate, String> {
    if value.contains(['-', '/']) {
        return parse_full_date(value);
    }

    let day: u32 = value
        .parse()
        .map_err(|_| format!("invalid date '{}' (expected DD-MM-YYYY, DD/MM/YYYY or a day number)", value))?;

    let column = |suffix: &str| {
        let to_key = format!("{}_to_{}", prefix, suffix);
        let from_key = format!("{}_{}", prefix, suffix);
        let found = if is_to {
            optional(row, &to_key).or_else(|| optional(row, &from_key))
        } else {
            optional(row, &from_key)
        };
        found.ok_or_else(|| format!("day-only date '{}' needs a {} column", value, from_key))
    };

    let month = parse_month(column("month")?)?;
    let year_text = column("year")?;
    let year: i32 = year_text
        .parse()
        .map_err(|_| format!("invalid year '{}'", year_text))?;

    NaiveDate::from_ymd_opt(year, month.number_from_month(), day)
        .ok_or_else(|| format!("day {} does not exist in {} {}", day, month.name(), year))
}

fn parse_full_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%d-%m-%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date '{}' (expected DD-MM-YYYY or DD/MM/YYYY)", value))
}

fn parse_month(value: &str) -> std::result::Result<Month, String> {
    if let Ok(number) = value.parse::<u8>() {
        return Month::try_from(number).map_err(|_| format!("invalid month '{}'", value));
    }
    value.parse::<Month>().map_err(|_| format!("invalid month '{}'", value))
}
