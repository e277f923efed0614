//! Expansion of a date-range assignment into daily records.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::HashSet;

use crate::assignment::Assignment;
use crate::clock::{self, OVERLAY_HOUR, PROJECT_HOUR};
use crate::config::PlannerConfig;
use crate::error::PlannerResult;
use crate::holiday::{HolidayCalendar, HolidayProvider};
use crate::report::YearMonth;
use crate::store::{Filter, Point, Select, SeriesQuery, SeriesStore, single_series_rows};

/// Expand one assignment into the sequence of daily records to write.
///
/// A day is assignable iff its weekday is selected, holidays are not skipped
/// or the day is no holiday, and events are not skipped or the day is not in
/// `exclusions`. A "removed" assignment re-derives its effective marker per
/// day, so a freed day shows the holiday or weekend it falls on instead of a
/// blank removal record. An empty result is valid.
pub fn expand<H: HolidayProvider>(
    config: &PlannerConfig,
    calendar: &HolidayCalendar<H>,
    assignment: &Assignment,
    exclusions: Option<&HashSet<NaiveDate>>,
) -> PlannerResult<Vec<Point>> {
    let mut points = Vec::new();
    let mut current = assignment.from;
    while current <= assignment.to {
        let holiday = calendar.holiday_on(current)?;

        let selected = assignment.days_of_week.contains(&current.weekday());
        let holiday_ok = !assignment.skip_holidays || holiday.is_none();
        let events_ok = !assignment.skip_events
            || exclusions.is_none_or(|dates| !dates.contains(&current));

        if selected && holiday_ok && events_ok {
            let point = if assignment.project == config.markers.removed {
                let mut resolved = assignment.clone();
                if let Some(holiday) = holiday {
                    resolved.project = config.markers.not_available.clone();
                    resolved.notes = holiday.name;
                    resolved.color = config.colors.not_available.clone();
                } else if is_weekend(current) {
                    resolved.project = config.markers.weekend.clone();
                    resolved.notes = String::new();
                    resolved.color = config.colors.weekend.clone();
                }
                daily_point(config, &resolved, current, false, None)
            } else {
                daily_point(config, assignment, current, false, None)
            };
            points.push(point);
        }

        current = current + Days::new(1);
    }
    Ok(points)
}

pub(crate) fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Build the stored record for one day of an assignment or overlay event.
/// Empty strings are treated as absent fields; `working_day` is only carried
/// by overlay records.
pub(crate) fn daily_point(
    config: &PlannerConfig,
    assignment: &Assignment,
    date: NaiveDate,
    overlay: bool,
    working_day: Option<bool>,
) -> Point {
    let hour = if overlay { OVERLAY_HOUR } else { PROJECT_HOUR };
    let mut point = Point::new(&config.measurements.projects, clock::day_nanos(date, hour))
        .tag(&config.tags.employee, &assignment.employee)
        .tag(
            &config.tags.year_month,
            YearMonth::from_date(date).to_string(),
        );
    if !assignment.project.is_empty() {
        point = point.field(&config.fields.project, assignment.project.as_str());
    }
    if !assignment.status.is_empty() {
        point = point.field(&config.fields.booking_status, assignment.status.as_str());
    }
    if !assignment.color.is_empty() {
        point = point.field(&config.fields.color, assignment.color.as_str());
    }
    if let Some(rate) = assignment.rate {
        point = point.field(&config.fields.daily_rate, rate);
    }
    if let Some(expenses) = assignment.expenses {
        point = point.field(&config.fields.daily_expenses, expenses);
    }
    if !assignment.notes.is_empty() {
        point = point.field(&config.fields.notes, assignment.notes.as_str());
    }
    if let Some(working_day) = working_day {
        point = point.field(&config.fields.working_day, working_day);
    }
    point
}

/// Dates in `[from, to]` already occupied by a non-project marker for the
/// employee. "Removed" days stay assignable and are not reported. Empty set
/// when the store holds nothing for the range.
pub fn non_project_dates<S: SeriesStore>(
    store: &S,
    config: &PlannerConfig,
    employee: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> PlannerResult<HashSet<NaiveDate>> {
    let query = SeriesQuery::new(&config.measurements.projects)
        .select(Select::Time)
        .between(
            clock::day_nanos(from, OVERLAY_HOUR),
            clock::day_nanos(to, PROJECT_HOUR),
        )
        .filter(Filter::TagEq(
            config.tags.employee.clone(),
            employee.to_string(),
        ))
        .filter(Filter::FieldIn(
            config.fields.project.clone(),
            config.markers.exclusion_set(),
        ));

    let Some(rows) = single_series_rows(store.query(&query)?) else {
        return Ok(HashSet::new());
    };
    Ok(rows
        .iter()
        .filter_map(|row| row.first().and_then(crate::store::Value::as_i64))
        .map(clock::date_from_nanos)
        .collect())
}
