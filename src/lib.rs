mod aggregate;
mod allocator;
pub mod assignment;
pub mod clock;
pub mod config;
mod deletion;
pub mod error;
pub mod expand;
pub mod holiday;
#[cfg(feature = "http_api")]
pub mod http_api;
mod overlay;
pub mod planner;
pub mod report;
pub mod store;

pub use assignment::{ALL_WEEKDAYS, Assignment, AssignmentError, AssignmentRequest, DeleteRequest};
pub use config::PlannerConfig;
pub use error::{PlannerError, PlannerResult};
pub use expand::{expand, non_project_dates};
pub use holiday::{FixedHolidays, Holiday, HolidayCalendar, HolidayError, HolidayProvider};
pub use planner::Planner;
pub use report::{MonthReportDataPoint, ReportVariant, YearMonth};
#[cfg(feature = "sqlite")]
pub use store::SqliteSeriesStore;
pub use store::{
    Filter, MemorySeriesStore, Point, Select, Series, SeriesQuery, SeriesStore, StoreError,
    StoreResult, Value, single_series, single_series_rows,
};
