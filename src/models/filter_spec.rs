use chrono::{Datelike, Month, NaiveDate};
use serde::Serialize;
use std::fmt;

use crate::utils::dates::{month_label, month_of};

/// A calendar month as shown in one pane of the date picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthYear {
    pub month: Month,
    pub year: i32,
}

impl MonthYear {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            month: month_of(date),
            year: date.year(),
        }
    }

    pub fn label(&self) -> String {
        month_label(self.month, self.year)
    }
}

impl fmt::Display for MonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Inclusive date range; `from` and `to` may fall in different months or years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self, String> {
        if to < from {
            return Err(format!("range end {} is before start {}", to, from));
        }
        Ok(Self { from, to })
    }

    pub fn from_month(&self) -> MonthYear {
        MonthYear::of(self.from)
    }

    pub fn to_month(&self) -> MonthYear {
        MonthYear::of(self.to)
    }

    pub fn spans_months(&self) -> bool {
        self.from_month() != self.to_month()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.from.format("%d %b %Y"), self.to.format("%d %b %Y"))
    }
}

/// A return trip always carries its return range, so a Return without one cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    Return {
        return_range: DateRange,
        max_trip_days: Option<u32>,
    },
}

impl TripType {
    pub fn is_return(&self) -> bool {
        matches!(self, TripType::Return { .. })
    }

    pub fn return_range(&self) -> Option<&DateRange> {
        match self {
            TripType::OneWay => None,
            TripType::Return { return_range, .. } => Some(return_range),
        }
    }

    pub fn max_trip_days(&self) -> Option<u32> {
        match self {
            TripType::OneWay => None,
            TripType::Return { max_trip_days, .. } => *max_trip_days,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TripType::OneWay => "one way",
            TripType::Return { .. } => "return",
        }
    }
}

/// One named search request, built once per run from the filters file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub name: String,
    pub trip: TripType,
    pub origin: String,
    pub destination: Option<String>,
    pub departure: DateRange,
    pub currency: String,
    pub max_results: u32,
    pub max_budget: u32,
}

impl FilterSpec {
    /// Year used to complete offer dates printed without one.
    pub fn reference_date(&self) -> NaiveDate {
        self.departure.from
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} -> {} departing {}",
            self.name,
            self.trip.label(),
            self.origin,
            self.destination.as_deref().unwrap_or("anywhere"),
            self.departure
        )?;
        if let TripType::Return { return_range, max_trip_days } = &self.trip {
            write!(f, ", returning {}", return_range)?;
            if let Some(days) = max_trip_days {
                write!(f, " (max {} days)", days)?;
            }
        }
        write!(f, ", up to {} {} x{}", self.max_budget, self.currency, self.max_results)
    }
}
