//! Incremental generation of the weekend/holiday/calendar overlay.
//!
//! Every employee has a watermark date up to which the overlay exists; a
//! single shared watermark covers the plain calendar-label records. Both are
//! bootstrapped from the newest stored records at service start and only
//! ever advance afterwards, which makes repeated generation for overlapping
//! ranges idempotent. Watermark access is not serialized per employee:
//! concurrent calls for the same employee may both compute the same
//! unprocessed window and double-write content-identical points.

use chrono::{Datelike, Days, Local, Months, NaiveDate};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

use crate::assignment::Assignment;
use crate::clock::{self, OVERLAY_HOUR};
use crate::config::PlannerConfig;
use crate::error::PlannerResult;
use crate::expand::{daily_point, is_weekend};
use crate::holiday::{HolidayCalendar, HolidayProvider};
use crate::store::{Filter, Point, Select, SeriesQuery, SeriesStore, Value, single_series_rows};

pub(crate) struct OverlayState {
    employees: Mutex<HashMap<String, NaiveDate>>,
    calendar: Mutex<NaiveDate>,
}

impl OverlayState {
    /// Bootstrap the watermarks from the newest stored overlay records.
    /// Employees without any overlay record start at today; the shared
    /// calendar watermark starts one margin behind today so labels cover
    /// the currently displayed window after a fresh install.
    pub(crate) fn load<S: SeriesStore>(
        store: &S,
        config: &PlannerConfig,
    ) -> PlannerResult<Self> {
        let today = Local::now().date_naive();

        let calendar_query = SeriesQuery::new(&config.measurements.calendar)
            .select(Select::Last(config.fields.calendar_value.clone()));
        let calendar_mark = last_record_date(store.query(&calendar_query)?)
            .unwrap_or_else(|| today - Months::new(config.overlay_margin_months));

        let mut employees = HashMap::new();
        for employee in store.tag_values(&config.measurements.projects, &config.tags.employee)? {
            let query = SeriesQuery::new(&config.measurements.projects)
                .select(Select::Last(config.fields.project.clone()))
                .filter(Filter::TagEq(config.tags.employee.clone(), employee.clone()))
                .filter(Filter::FieldIn(
                    config.fields.project.clone(),
                    vec![
                        config.markers.not_available.clone(),
                        config.markers.weekend.clone(),
                    ],
                ));
            let mark = last_record_date(store.query(&query)?).unwrap_or(today);
            employees.insert(employee, mark);
        }

        Ok(Self {
            employees: Mutex::new(employees),
            calendar: Mutex::new(calendar_mark),
        })
    }

    fn employee_mark(&self, employee: &str) -> NaiveDate {
        self.employees
            .lock()
            .get(employee)
            .copied()
            .unwrap_or_else(|| Local::now().date_naive())
    }

    fn advance(&self, employee: &str, employee_mark: NaiveDate, calendar_mark: NaiveDate) {
        let mut employees = self.employees.lock();
        let entry = employees
            .entry(employee.to_string())
            .or_insert(employee_mark);
        *entry = (*entry).max(employee_mark);
        drop(employees);

        let mut calendar = self.calendar.lock();
        *calendar = (*calendar).max(calendar_mark);
    }
}

fn last_record_date(result: Vec<crate::store::Series>) -> Option<NaiveDate> {
    let rows = single_series_rows(result)?;
    rows.first()
        .and_then(|row| row.first())
        .and_then(Value::as_i64)
        .map(clock::date_from_nanos)
}

/// Ensure the overlay exists for `[from, to]`, widened by the configured
/// margin on both sides. Only dates past the watermarks are generated;
/// returns the number of points written (zero when the range is already
/// covered). A failed holiday lookup aborts the call: misclassifying a
/// holiday as a working day is worse than failing the window.
pub(crate) fn ensure_overlay<S: SeriesStore, H: HolidayProvider>(
    store: &S,
    config: &PlannerConfig,
    calendar: &HolidayCalendar<H>,
    state: &OverlayState,
    employee: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> PlannerResult<usize> {
    let window_from = from - Months::new(config.overlay_margin_months);
    let window_to = to + Months::new(config.overlay_margin_months);

    let mut employee_mark = state.employee_mark(employee);
    let mut calendar_mark = *state.calendar.lock();

    let mut batch = Vec::new();
    let mut current = window_from;
    while current <= window_to {
        if current > employee_mark {
            batch.push(overlay_point(config, calendar, employee, current)?);
            employee_mark = current;
        }
        if current > calendar_mark {
            batch.extend(calendar_labels(config, current));
            calendar_mark = current;
        }
        current = current + Days::new(1);
    }

    let written = batch.len();
    if written > 0 {
        debug!(employee, points = written, "writing overlay batch");
        store.write(batch)?;
    }
    state.advance(employee, employee_mark, calendar_mark);
    Ok(written)
}

/// Classify one day for the overlay: holiday beats weekend beats working
/// day. Only plain working days carry `working_day = true`, letting readers
/// tell "free working day" apart from "weekend/holiday".
fn overlay_point<H: HolidayProvider>(
    config: &PlannerConfig,
    calendar: &HolidayCalendar<H>,
    employee: &str,
    date: NaiveDate,
) -> PlannerResult<Point> {
    let (event, working_day) = if let Some(holiday) = calendar.holiday_on(date)? {
        let event = Assignment::from_event_request(
            employee,
            &config.markers.not_available,
            date,
            date,
            &config.colors.not_available,
            holiday.name,
        )?;
        (event, false)
    } else if is_weekend(date) {
        let event = Assignment::from_event_request(
            employee,
            &config.markers.weekend,
            date,
            date,
            &config.colors.weekend,
            "",
        )?;
        (event, false)
    } else {
        let event = Assignment::from_event_request(employee, "", date, date, "", "")?;
        (event, true)
    };
    Ok(daily_point(config, &event, date, true, Some(working_day)))
}

/// Display metadata for one calendar day: month name, day of month and ISO
/// week number, tagged by label type.
fn calendar_labels(config: &PlannerConfig, date: NaiveDate) -> Vec<Point> {
    let nanos = clock::day_nanos(date, OVERLAY_HOUR);
    let measurement = &config.measurements.calendar;
    let type_tag = &config.tags.calendar_type;
    let value_field = &config.fields.calendar_value;
    vec![
        Point::new(measurement, nanos)
            .tag(type_tag, "m")
            .field(value_field, date.format("%B").to_string()),
        Point::new(measurement, nanos)
            .tag(type_tag, "d")
            .field(value_field, date.day().to_string()),
        Point::new(measurement, nanos)
            .tag(type_tag, "w")
            .field(value_field, date.iso_week().week().to_string()),
    ]
}
