//! The planning facade: one explicit struct owning the store handle, the
//! holiday cache and the overlay watermarks, passed to callers instead of
//! process-wide singletons.

use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::aggregate;
use crate::allocator;
use crate::assignment::{Assignment, AssignmentError, DeleteRequest};
use crate::clock::{self, PROJECT_HOUR};
use crate::config::PlannerConfig;
use crate::deletion;
use crate::error::PlannerResult;
use crate::expand;
use crate::holiday::{HolidayCalendar, HolidayProvider};
use crate::overlay::{self, OverlayState};
use crate::report::{MonthReportDataPoint, YearMonth};
use crate::store::{Point, Select, SeriesQuery, SeriesStore, single_series_rows};

pub struct Planner<S, H> {
    store: S,
    calendar: HolidayCalendar<H>,
    config: PlannerConfig,
    overlay: OverlayState,
}

impl<S: SeriesStore, H: HolidayProvider> Planner<S, H> {
    /// Construct the planner and bootstrap the overlay watermarks from the
    /// newest stored overlay records (the store is the system of record; the
    /// watermarks are just a cache of its tail).
    pub fn new(store: S, provider: H, config: PlannerConfig) -> PlannerResult<Self> {
        let overlay = OverlayState::load(&store, &config)?;
        Ok(Self {
            store,
            calendar: HolidayCalendar::new(provider),
            config,
            overlay,
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sorted list of employees known to the store.
    pub fn known_employees(&self) -> PlannerResult<Vec<String>> {
        Ok(self
            .store
            .tag_values(&self.config.measurements.projects, &self.config.tags.employee)?)
    }

    /// Sorted list of customer projects, reserved markers filtered out.
    pub fn known_projects(&self) -> PlannerResult<Vec<String>> {
        let query = SeriesQuery::new(&self.config.measurements.projects)
            .select(Select::Distinct(self.config.fields.project.clone()));
        let rows = single_series_rows(self.store.query(&query)?).unwrap_or_default();
        Ok(rows
            .iter()
            .filter_map(|row| row.first().and_then(crate::store::Value::as_str))
            .filter(|project| !self.config.markers.is_marker(project))
            .map(str::to_string)
            .collect())
    }

    /// Sorted list of unassigned projects present in the store.
    pub fn known_unassigned_projects(&self) -> PlannerResult<Vec<String>> {
        let query = SeriesQuery::new(&self.config.measurements.unassigned_projects)
            .select(Select::Distinct(self.config.fields.project.clone()));
        let rows = single_series_rows(self.store.query(&query)?).unwrap_or_default();
        Ok(rows
            .iter()
            .filter_map(|row| row.first().and_then(crate::store::Value::as_str))
            .filter(|project| *project != self.config.markers.removed)
            .map(str::to_string)
            .collect())
    }

    /// Expand the assignments into daily records, write them as one batch,
    /// then make sure the overlay covers every touched employee's range.
    /// Returns the number of daily records written.
    pub fn assign_projects(&self, assignments: &[Assignment]) -> PlannerResult<usize> {
        let mut batch = Vec::new();
        let mut touched: HashMap<String, (NaiveDate, NaiveDate)> = HashMap::new();

        for assignment in assignments {
            batch.extend(self.expand_assignment(assignment)?);
            touched
                .entry(assignment.employee.clone())
                .and_modify(|(from, to)| {
                    *from = (*from).min(assignment.from);
                    *to = (*to).max(assignment.to);
                })
                .or_insert((assignment.from, assignment.to));
        }

        let written = batch.len();
        if written > 0 {
            debug!(points = written, "writing assignment batch");
            self.store.write(batch)?;
        }

        for (employee, (from, to)) in touched {
            self.ensure_overlay(&employee, from, to)?;
        }
        Ok(written)
    }

    fn expand_assignment(&self, assignment: &Assignment) -> PlannerResult<Vec<Point>> {
        // The exclusion set costs a store round trip, so it is only fetched
        // when the assignment actually wants events skipped.
        let exclusions = if assignment.skip_events {
            Some(expand::non_project_dates(
                &self.store,
                &self.config,
                &assignment.employee,
                assignment.from,
                assignment.to,
            )?)
        } else {
            None
        };
        expand::expand(&self.config, &self.calendar, assignment, exclusions.as_ref())
    }

    /// Reserve calendar space for a project not yet tied to an employee.
    /// Overlapping blocks get distinct slot indices; returns the allocated
    /// index.
    pub fn create_unassigned_project(
        &self,
        project: &str,
        from: NaiveDate,
        to: NaiveDate,
        notes: &str,
        color: &str,
    ) -> PlannerResult<u32> {
        if from > to {
            return Err(AssignmentError::FromAfterTo { from, to }.into());
        }
        let index = allocator::free_index(&self.store, &self.config, from, to)?;

        let mut batch = Vec::new();
        let mut current = from;
        while current <= to {
            let mut point = Point::new(
                &self.config.measurements.unassigned_projects,
                clock::day_nanos(current, PROJECT_HOUR),
            )
            .tag(&self.config.tags.index, index.to_string())
            .tag(
                &self.config.tags.year_month,
                YearMonth::from_date(current).to_string(),
            )
            .field(&self.config.fields.color, color)
            .field(&self.config.fields.project, project);
            if !notes.is_empty() {
                point = point.field(&self.config.fields.notes, notes);
            }
            batch.push(point);
            current = current + Days::new(1);
        }

        info!(project, index, points = batch.len(), "creating unassigned block");
        self.store.write(batch)?;
        Ok(index)
    }

    /// Extend the weekend/holiday/calendar overlay so it covers `[from, to]`
    /// (plus the configured margin) for the employee. Idempotent: a second
    /// call for a covered range writes nothing. Returns the number of points
    /// written.
    pub fn ensure_overlay(&self, employee: &str, from: NaiveDate, to: NaiveDate) -> PlannerResult<usize> {
        overlay::ensure_overlay(
            &self.store,
            &self.config,
            &self.calendar,
            &self.overlay,
            employee,
            from,
            to,
        )
    }

    /// Apply a deletion request from the surrounding application, branching
    /// on whether the employee field names a real employee or an unassigned
    /// block's slot index. Returns whether anything was deleted; ambiguous,
    /// unmatched or unrepresentable requests are no-ops, not errors.
    pub fn delete(&self, request: &DeleteRequest) -> PlannerResult<bool> {
        let (Some(from), Some(to)) = (request.from_date(), request.to_date()) else {
            warn!(
                employee = request.employee,
                project = request.project,
                start = request.start,
                duration = request.duration,
                "deletion range outside representable dates, skipping"
            );
            return Ok(false);
        };
        if request.is_unassigned_block() {
            let deleted = self.delete_unassigned_project(
                &request.project,
                from,
                to,
                Some(&request.employee),
            )?;
            Ok(deleted > 0)
        } else {
            self.delete_employee_project(&request.employee, &request.project, from, to)
        }
    }

    pub fn delete_employee_project(
        &self,
        employee: &str,
        project: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PlannerResult<bool> {
        deletion::delete_employee_project(
            &self.store,
            &self.config,
            &self.calendar,
            employee,
            project,
            from,
            to,
        )
    }

    pub fn delete_unassigned_project(
        &self,
        project: &str,
        from: NaiveDate,
        to: NaiveDate,
        index: Option<&str>,
    ) -> PlannerResult<usize> {
        deletion::delete_unassigned_project(&self.store, &self.config, project, from, to, index)
    }

    /// Record a month's actual figures together with the freshly derived
    /// estimated figures as one combined report record.
    pub fn enter_month_report(&self, actual: &MonthReportDataPoint) -> PlannerResult<()> {
        aggregate::enter_month_report(&self.store, &self.config, actual)
    }
}
