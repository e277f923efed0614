//! The seam to the external time-series store.
//!
//! The engine never talks to a storage backend directly; it issues structured
//! [`SeriesQuery`] statements and [`Point`] batches through the
//! [`SeriesStore`] trait. Absence of data (no matching rows, or a series
//! count other than the expected one) is "no data", never an error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::clock;

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemorySeriesStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSeriesStore;

/// A single typed value in a row or a point field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Text(String),
    Float(f64),
    Integer(i64),
    Bool(bool),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// One record written to the store: a measurement, a tag set identifying the
/// series, a field set, and a nanosecond timestamp. Writing a point whose
/// (measurement, tags, timestamp) key already exists merges the new fields
/// over the old ones, so re-assigning a day overwrites it in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, Value>,
    pub timestamp_ns: i64,
}

impl Point {
    pub fn new(measurement: impl Into<String>, timestamp_ns: i64) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp_ns,
        }
    }

    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(name.into(), value.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Local calendar date this point falls on.
    pub fn date(&self) -> NaiveDate {
        clock::date_from_nanos(self.timestamp_ns)
    }

    pub(crate) fn series_key(&self) -> (String, BTreeMap<String, String>, i64) {
        (self.measurement.clone(), self.tags.clone(), self.timestamp_ns)
    }
}

/// Projection of one column in a query result. `Last`, `Count`, `Sum` and
/// `Mean` are aggregates: a query selecting any of them yields a single row.
/// `Distinct` must be the sole selection of its query.
#[derive(Debug, Clone, PartialEq)]
pub enum Select {
    /// Timestamp of the point, in nanoseconds.
    Time,
    Tag(String),
    Field(String),
    Distinct(String),
    /// Timestamp and value of the newest point carrying the field; the
    /// result row is `[time, value]`.
    Last(String),
    /// Number of matching points carrying the field.
    Count(String),
    Sum(String),
    Mean(String),
}

/// One predicate of a query; the query's filters are conjoined. `Any` is the
/// disjunction escape hatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    TimeAtLeast(i64),
    TimeAtMost(i64),
    TagEq(String, String),
    FieldEq(String, Value),
    /// Field has a text value contained in the given set.
    FieldIn(String, Vec<String>),
    FieldGt(String, f64),
    Any(Vec<Filter>),
}

/// A structured read statement against one measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    pub measurement: String,
    pub select: Vec<Select>,
    pub filters: Vec<Filter>,
    /// Group results into one series per distinct value of this tag.
    pub group_by: Option<String>,
}

impl SeriesQuery {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            select: Vec::new(),
            filters: Vec::new(),
            group_by: None,
        }
    }

    pub fn select(mut self, select: Select) -> Self {
        self.select.push(select);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn between(self, from_ns: i64, to_ns: i64) -> Self {
        self.filter(Filter::TimeAtLeast(from_ns))
            .filter(Filter::TimeAtMost(to_ns))
    }

    pub fn group_by_tag(mut self, tag: impl Into<String>) -> Self {
        self.group_by = Some(tag.into());
        self
    }
}

/// One named group of result rows. Ungrouped queries return at most one
/// series with an empty tag set.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub tags: BTreeMap<String, String>,
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug)]
pub enum StoreError {
    /// Transport or backend failure; fatal for the current operation.
    Backend(String),
    Serialization(serde_json::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(message) => write!(f, "store backend error: {message}"),
            StoreError::Serialization(err) => write!(f, "store serialization error: {err}"),
            #[cfg(feature = "sqlite")]
            StoreError::Sqlite(err) => write!(f, "sqlite error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Backend(_) => None,
            StoreError::Serialization(err) => Some(err),
            #[cfg(feature = "sqlite")]
            StoreError::Sqlite(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read/write interface of the time-series store.
pub trait SeriesStore {
    fn query(&self, query: &SeriesQuery) -> StoreResult<Vec<Series>>;

    /// Write a batch of points. The batch either lands as a whole or the
    /// call fails; partial visibility to concurrent readers is acceptable.
    fn write(&self, batch: Vec<Point>) -> StoreResult<()>;

    /// Delete every point of the measurement matching all filters.
    fn delete(&self, measurement: &str, filters: &[Filter]) -> StoreResult<()>;

    /// Distinct values of a tag across the measurement, sorted.
    fn tag_values(&self, measurement: &str, tag: &str) -> StoreResult<Vec<String>>;
}

impl<S: SeriesStore + ?Sized> SeriesStore for Box<S> {
    fn query(&self, query: &SeriesQuery) -> StoreResult<Vec<Series>> {
        (**self).query(query)
    }

    fn write(&self, batch: Vec<Point>) -> StoreResult<()> {
        (**self).write(batch)
    }

    fn delete(&self, measurement: &str, filters: &[Filter]) -> StoreResult<()> {
        (**self).delete(measurement, filters)
    }

    fn tag_values(&self, measurement: &str, tag: &str) -> StoreResult<Vec<String>> {
        (**self).tag_values(measurement, tag)
    }
}

/// The single-series result convention: exactly one series is data, anything
/// else is "no data".
pub fn single_series(mut result: Vec<Series>) -> Option<Series> {
    if result.len() == 1 {
        result.pop()
    } else {
        None
    }
}

/// Rows of a single-series result, or `None` when there is no data.
pub fn single_series_rows(result: Vec<Series>) -> Option<Vec<Vec<Value>>> {
    single_series(result).map(|series| series.rows)
}

pub(crate) fn matches(point: &Point, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| matches_one(point, filter))
}

fn matches_one(point: &Point, filter: &Filter) -> bool {
    match filter {
        Filter::TimeAtLeast(ns) => point.timestamp_ns >= *ns,
        Filter::TimeAtMost(ns) => point.timestamp_ns <= *ns,
        Filter::TagEq(tag, value) => point.tags.get(tag).is_some_and(|v| v == value),
        Filter::FieldEq(field, value) => point.fields.get(field).is_some_and(|v| v == value),
        Filter::FieldIn(field, values) => point
            .fields
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
        Filter::FieldGt(field, threshold) => point
            .fields
            .get(field)
            .and_then(Value::as_f64)
            .is_some_and(|v| v > *threshold),
        Filter::Any(alternatives) => alternatives.iter().any(|f| matches_one(point, f)),
    }
}

fn is_aggregate(select: &Select) -> bool {
    matches!(
        select,
        Select::Last(_) | Select::Count(_) | Select::Sum(_) | Select::Mean(_)
    )
}

/// Evaluate a query against an in-process point set. Both bundled backends
/// share this so their result semantics cannot drift apart.
pub(crate) fn evaluate(points: &[Point], query: &SeriesQuery) -> Vec<Series> {
    let mut matching: Vec<&Point> = points
        .iter()
        .filter(|p| p.measurement == query.measurement && matches(p, &query.filters))
        .collect();
    if matching.is_empty() {
        return Vec::new();
    }
    matching.sort_by_key(|p| p.timestamp_ns);

    match &query.group_by {
        Some(tag) => {
            let mut groups: BTreeMap<String, Vec<&Point>> = BTreeMap::new();
            for point in matching {
                let Some(value) = point.tags.get(tag) else {
                    continue;
                };
                groups.entry(value.clone()).or_default().push(point);
            }
            groups
                .into_iter()
                .map(|(value, group)| Series {
                    tags: BTreeMap::from([(tag.clone(), value)]),
                    rows: evaluate_rows(&group, &query.select),
                })
                .collect()
        }
        None => {
            let rows = evaluate_rows(&matching, &query.select);
            if rows.is_empty() {
                return Vec::new();
            }
            vec![Series {
                tags: BTreeMap::new(),
                rows,
            }]
        }
    }
}

fn evaluate_rows(points: &[&Point], select: &[Select]) -> Vec<Vec<Value>> {
    if let [Select::Distinct(field)] = select {
        let values: BTreeSet<String> = points
            .iter()
            .filter_map(|p| p.fields.get(field).and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        return values.into_iter().map(|v| vec![Value::Text(v)]).collect();
    }

    if select.iter().any(is_aggregate) {
        let mut row = Vec::with_capacity(select.len());
        for projection in select {
            match projection {
                Select::Last(field) => {
                    let last = points
                        .iter()
                        .rev()
                        .find_map(|p| p.fields.get(field).map(|v| (p.timestamp_ns, v.clone())));
                    match last {
                        Some((ts, value)) => {
                            row.push(Value::Integer(ts));
                            row.push(value);
                        }
                        None => {
                            row.push(Value::Null);
                            row.push(Value::Null);
                        }
                    }
                }
                Select::Count(field) => {
                    let count = points.iter().filter(|p| p.fields.contains_key(field)).count();
                    row.push(Value::Integer(count as i64));
                }
                Select::Sum(field) => row.push(fold_numeric(points, field, |values| {
                    values.iter().sum::<f64>()
                })),
                Select::Mean(field) => row.push(fold_numeric(points, field, |values| {
                    values.iter().sum::<f64>() / values.len() as f64
                })),
                other => row.push(scalar(points.last().copied(), other)),
            }
        }
        return vec![row];
    }

    points
        .iter()
        .map(|point| {
            select
                .iter()
                .map(|projection| scalar(Some(point), projection))
                .collect()
        })
        .collect()
}

fn fold_numeric(points: &[&Point], field: &str, fold: impl Fn(&[f64]) -> f64) -> Value {
    let values: Vec<f64> = points
        .iter()
        .filter_map(|p| p.fields.get(field).and_then(Value::as_f64))
        .collect();
    if values.is_empty() {
        Value::Null
    } else {
        Value::Float(fold(&values))
    }
}

fn scalar(point: Option<&Point>, projection: &Select) -> Value {
    let Some(point) = point else {
        return Value::Null;
    };
    match projection {
        Select::Time => Value::Integer(point.timestamp_ns),
        Select::Tag(tag) => point
            .tags
            .get(tag)
            .map(|v| Value::Text(v.clone()))
            .unwrap_or(Value::Null),
        Select::Field(field) => point.fields.get(field).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
