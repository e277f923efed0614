use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A month key. Displays without zero padding (`2024-3`), matching the
/// year-month tag format in the store; parsing accepts padded input too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: chrono::NaiveDate) -> Self {
        use chrono::Datelike;
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

#[derive(Debug, Clone)]
pub struct YearMonthParseError {
    input: String,
}

impl fmt::Display for YearMonthParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid year-month '{}': expected YYYY-M", self.input)
    }
}

impl std::error::Error for YearMonthParseError {}

impl FromStr for YearMonth {
    type Err = YearMonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || YearMonthParseError {
            input: s.to_string(),
        };
        let (year, month) = s.split_once('-').ok_or_else(error)?;
        let year: i32 = year.parse().map_err(|_| error())?;
        let month: u32 = month.parse().map_err(|_| error())?;
        YearMonth::new(year, month).ok_or_else(error)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Which flavor of monthly figures a value belongs to. Both variants are
/// written as sibling fields of one combined record per month, the field
/// names prefixed per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportVariant {
    Actual,
    Estimated,
}

impl ReportVariant {
    pub fn field_prefix(&self) -> &'static str {
        match self {
            ReportVariant::Actual => "act_",
            ReportVariant::Estimated => "est_",
        }
    }
}

/// Monthly financial figures, either entered by a controller (actual) or
/// derived from the stored daily records (estimated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthReportDataPoint {
    pub year_month: YearMonth,
    pub expenses: f64,
    pub costs: f64,
    pub revenue: f64,
    pub profit: f64,
    pub utilization: f64,
    pub return_on_sales: f64,
}

impl MonthReportDataPoint {
    /// All-zero point, used when a month has no underlying data.
    pub fn zeroed(year_month: YearMonth) -> Self {
        Self {
            year_month,
            expenses: 0.0,
            costs: 0.0,
            revenue: 0.0,
            profit: 0.0,
            utilization: 0.0,
            return_on_sales: 0.0,
        }
    }
}
