use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::clock;

pub const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone)]
pub enum AssignmentError {
    FromAfterTo { from: NaiveDate, to: NaiveDate },
    EmptyDaysOfWeek,
}

impl fmt::Display for AssignmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssignmentError::FromAfterTo { from, to } => {
                write!(f, "assignment start {from} is after its end {to}")
            }
            AssignmentError::EmptyDaysOfWeek => {
                write!(f, "assignment requires at least one selected weekday")
            }
        }
    }
}

impl std::error::Error for AssignmentError {}

/// Unvalidated assignment fields as they arrive from a form or API payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRequest {
    pub employee: String,
    pub project: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub rate: Option<f64>,
    #[serde(default)]
    pub expenses: Option<f64>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days_of_week: HashSet<Weekday>,
    #[serde(default)]
    pub skip_holidays: bool,
    #[serde(default)]
    pub skip_events: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub notes: String,
}

/// A date-range assignment of one employee to a customer project or a
/// reserved marker. Immutable once constructed; the named constructors
/// enforce the invariants (`from <= to`, non-empty weekday set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub employee: String,
    pub project: String,
    pub status: String,
    pub rate: Option<f64>,
    pub expenses: Option<f64>,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days_of_week: HashSet<Weekday>,
    pub skip_holidays: bool,
    pub skip_events: bool,
    pub color: String,
    pub notes: String,
}

impl Assignment {
    /// Validate a request into an assignment.
    pub fn from_assignment_request(request: AssignmentRequest) -> Result<Self, AssignmentError> {
        if request.from > request.to {
            return Err(AssignmentError::FromAfterTo {
                from: request.from,
                to: request.to,
            });
        }
        if request.days_of_week.is_empty() {
            return Err(AssignmentError::EmptyDaysOfWeek);
        }
        Ok(Self {
            employee: request.employee,
            project: request.project,
            status: request.status,
            rate: request.rate,
            expenses: request.expenses,
            from: request.from,
            to: request.to,
            days_of_week: request.days_of_week,
            skip_holidays: request.skip_holidays,
            skip_events: request.skip_events,
            color: request.color,
            notes: request.notes,
        })
    }

    /// A non-project event covering every day of the range: all weekdays
    /// selected, nothing skipped, zeroed financials. Used for markers such
    /// as weekend/holiday overlay entries, vacation, training.
    pub fn from_event_request(
        employee: impl Into<String>,
        event: impl Into<String>,
        from: NaiveDate,
        to: NaiveDate,
        color: impl Into<String>,
        notes: impl Into<String>,
    ) -> Result<Self, AssignmentError> {
        if from > to {
            return Err(AssignmentError::FromAfterTo { from, to });
        }
        Ok(Self {
            employee: employee.into(),
            project: event.into(),
            status: String::new(),
            rate: Some(0.0),
            expenses: Some(0.0),
            from,
            to,
            days_of_week: ALL_WEEKDAYS.into_iter().collect(),
            skip_holidays: false,
            skip_events: false,
            color: color.into(),
            notes: notes.into(),
        })
    }
}

/// A deletion request as consumed from the surrounding application. The time
/// range arrives as epoch-millis start plus duration with an exclusive end.
/// A purely numeric employee value denotes an unassigned block, with the
/// number being the block's slot index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub employee: String,
    pub project: String,
    pub start: i64,
    pub duration: i64,
}

impl DeleteRequest {
    /// Start date, or `None` when the millis fall outside the representable
    /// range. The request arrives from an external caller, so the values are
    /// validated rather than trusted.
    pub fn from_date(&self) -> Option<NaiveDate> {
        clock::date_from_millis(self.start)
    }

    /// Inclusive end date: the exclusive millisecond end, minus one day.
    /// `None` when start plus duration overflows or leaves the representable
    /// range.
    pub fn to_date(&self) -> Option<NaiveDate> {
        let end = self.start.checked_add(self.duration)?;
        clock::date_from_millis(end)?.pred_opt()
    }

    /// Whether the employee field actually names an unassigned-block index.
    pub fn is_unassigned_block(&self) -> bool {
        !self.employee.is_empty() && self.employee.chars().all(|c| c.is_ascii_digit())
    }
}
