use std::fmt;

use crate::assignment::AssignmentError;
use crate::holiday::HolidayError;
use crate::store::StoreError;

/// Failures surfaced by the planning engine. Infrastructure problems (store,
/// holiday service) fail the whole operation; business-rule ambiguities are
/// not errors and degrade to no-ops at the call sites instead.
#[derive(Debug)]
pub enum PlannerError {
    Store(StoreError),
    Holiday(HolidayError),
    Assignment(AssignmentError),
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::Store(err) => write!(f, "{err}"),
            PlannerError::Holiday(err) => write!(f, "{err}"),
            PlannerError::Assignment(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for PlannerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlannerError::Store(err) => Some(err),
            PlannerError::Holiday(err) => Some(err),
            PlannerError::Assignment(err) => Some(err),
        }
    }
}

impl From<StoreError> for PlannerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<HolidayError> for PlannerError {
    fn from(value: HolidayError) -> Self {
        Self::Holiday(value)
    }
}

impl From<AssignmentError> for PlannerError {
    fn from(value: AssignmentError) -> Self {
        Self::Assignment(value)
    }
}

pub type PlannerResult<T> = Result<T, PlannerError>;
