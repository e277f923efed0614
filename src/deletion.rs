//! Reconciliation of deletion requests against the stored records.

use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::assignment::{ALL_WEEKDAYS, Assignment, AssignmentRequest};
use crate::clock::{self, PROJECT_HOUR};
use crate::config::PlannerConfig;
use crate::error::PlannerResult;
use crate::expand;
use crate::holiday::{HolidayCalendar, HolidayProvider};
use crate::store::{Filter, Select, SeriesQuery, SeriesStore, Value, single_series_rows};

/// Delete an employee's project assignment over a date range by overwriting
/// it with the "removed" marker (which self-resolves per day to holiday or
/// weekend records, see [`expand::expand`]).
///
/// The deletion is only honored when the stored markers for the range reduce
/// to exactly one non-administrative project and that project matches the
/// request; anything else (multiple projects in range, name mismatch, no
/// rows) is a logged no-op returning `Ok(false)`. This heuristic guards
/// against deleting a range that has been reassigned since the caller last
/// looked at it.
pub(crate) fn delete_employee_project<S: SeriesStore, H: HolidayProvider>(
    store: &S,
    config: &PlannerConfig,
    calendar: &HolidayCalendar<H>,
    employee: &str,
    project: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> PlannerResult<bool> {
    let query = SeriesQuery::new(&config.measurements.projects)
        .select(Select::Distinct(config.fields.project.clone()))
        .between(
            clock::day_nanos(from, PROJECT_HOUR),
            clock::day_nanos(to, PROJECT_HOUR),
        )
        .filter(Filter::TagEq(
            config.tags.employee.clone(),
            employee.to_string(),
        ));

    let Some(rows) = single_series_rows(store.query(&query)?) else {
        warn!(employee, project, "deletion found no stored rows, skipping");
        return Ok(false);
    };

    let mut projects: HashSet<String> = rows
        .iter()
        .filter_map(|row| row.first().and_then(Value::as_str))
        .map(str::to_string)
        .collect();
    for administrative in config.markers.administrative() {
        projects.remove(&administrative);
    }

    if projects.len() != 1 {
        warn!(
            employee,
            project,
            candidates = projects.len(),
            "deletion range is ambiguous, skipping"
        );
        return Ok(false);
    }
    let stored = projects.into_iter().next().expect("one element checked");
    if stored != project {
        warn!(
            employee,
            requested = project,
            stored,
            "deletion project does not match stored project, skipping"
        );
        return Ok(false);
    }

    info!(employee, project, %from, %to, "removing project assignment");
    let removal = Assignment::from_assignment_request(AssignmentRequest {
        employee: employee.to_string(),
        project: config.markers.removed.clone(),
        status: config.markers.removed.clone(),
        rate: Some(0.0),
        expenses: Some(0.0),
        from,
        to,
        days_of_week: ALL_WEEKDAYS.into_iter().collect(),
        skip_holidays: false,
        skip_events: false,
        color: config.colors.default.clone(),
        notes: String::new(),
    })?;
    let points = expand::expand(config, calendar, &removal, None)?;
    store.write(points)?;
    Ok(true)
}

/// Delete an unassigned block. Rows for the project (optionally narrowed to
/// one slot index) are grouped by index; for each group only the span of
/// dates actually present is deleted. The narrowing matters when an index
/// has been reused: a neighbouring block sharing the index but dated outside
/// the occupied span must survive. Returns the number of groups deleted.
pub(crate) fn delete_unassigned_project<S: SeriesStore>(
    store: &S,
    config: &PlannerConfig,
    project: &str,
    from: NaiveDate,
    to: NaiveDate,
    index: Option<&str>,
) -> PlannerResult<usize> {
    let mut query = SeriesQuery::new(&config.measurements.unassigned_projects)
        .select(Select::Time)
        .select(Select::Field(config.fields.project.clone()))
        .between(
            clock::day_nanos(from, PROJECT_HOUR),
            clock::day_nanos(to, PROJECT_HOUR),
        )
        .filter(Filter::FieldEq(
            config.fields.project.clone(),
            Value::Text(project.to_string()),
        ))
        .group_by_tag(config.tags.index.clone());
    if let Some(index) = index {
        query = query.filter(Filter::TagEq(config.tags.index.clone(), index.to_string()));
    }

    let groups = store.query(&query)?;
    if groups.is_empty() {
        warn!(project, "unassigned deletion matched nothing, skipping");
        return Ok(0);
    }

    let mut deleted = 0;
    for series in &groups {
        let Some(index) = series.tags.get(&config.tags.index) else {
            continue;
        };
        let timestamps: Vec<i64> = series
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_i64))
            .collect();
        let (Some(&min), Some(&max)) = (timestamps.iter().min(), timestamps.iter().max()) else {
            continue;
        };

        let min_date = clock::date_from_nanos(min);
        let max_date = clock::date_from_nanos(max);
        info!(project, index, %min_date, %max_date, "deleting unassigned block span");
        store.delete(
            &config.measurements.unassigned_projects,
            &[
                Filter::TagEq(config.tags.index.clone(), index.clone()),
                Filter::TimeAtLeast(clock::day_nanos(min_date, PROJECT_HOUR)),
                Filter::TimeAtMost(clock::day_nanos(max_date, PROJECT_HOUR)),
            ],
        )?;
        deleted += 1;
    }
    Ok(deleted)
}
