//! Monthly estimated-vs-actual financial aggregation.

use tracing::debug;

use crate::clock::{self, PROJECT_HOUR};
use crate::config::PlannerConfig;
use crate::error::PlannerResult;
use crate::report::{MonthReportDataPoint, ReportVariant, YearMonth};
use crate::store::{
    Filter, Point, Select, SeriesQuery, SeriesStore, Value, single_series_rows,
};

/// Mean of the recorded actual costs across all prior months, used as the
/// baseline for estimated profit and return-on-sales. No history, or a
/// failed query, degrades to a 0.0 baseline rather than failing the report.
pub(crate) fn historical_costs<S: SeriesStore>(store: &S, config: &PlannerConfig) -> f64 {
    let field = format!(
        "{}{}",
        ReportVariant::Actual.field_prefix(),
        config.fields.costs
    );
    let query = SeriesQuery::new(&config.measurements.report).select(Select::Mean(field));
    match store.query(&query) {
        Ok(result) => single_series_rows(result)
            .and_then(|rows| rows.first().and_then(|row| row.first().and_then(Value::as_f64)))
            .unwrap_or(0.0),
        Err(err) => {
            debug!(%err, "historical costs query failed, using 0.0 baseline");
            0.0
        }
    }
}

/// Derive the estimated data point for a month from the stored daily
/// records. Booked days are rows carrying a daily rate; working days are
/// overlay rows flagged as working. A month without matching rows yields an
/// all-zero point. Division-by-zero cases (no working days, zero revenue)
/// produce 0.0, never an error.
pub(crate) fn estimated_point<S: SeriesStore>(
    store: &S,
    config: &PlannerConfig,
    year_month: YearMonth,
    costs: f64,
) -> PlannerResult<MonthReportDataPoint> {
    let query = SeriesQuery::new(&config.measurements.projects)
        .select(Select::Count(config.fields.daily_rate.clone()))
        .select(Select::Count(config.fields.working_day.clone()))
        .select(Select::Sum(config.fields.daily_expenses.clone()))
        .select(Select::Sum(config.fields.daily_rate.clone()))
        .filter(Filter::TagEq(
            config.tags.year_month.clone(),
            year_month.to_string(),
        ))
        .filter(Filter::Any(vec![
            Filter::FieldGt(config.fields.daily_rate.clone(), 0.0),
            Filter::FieldEq(config.fields.working_day.clone(), Value::Bool(true)),
        ]));

    let Some(rows) = single_series_rows(store.query(&query)?) else {
        return Ok(MonthReportDataPoint::zeroed(year_month));
    };
    let Some(row) = rows.first() else {
        return Ok(MonthReportDataPoint::zeroed(year_month));
    };

    let booked = row.first().and_then(Value::as_i64).unwrap_or(0);
    let working = row.get(1).and_then(Value::as_i64).unwrap_or(0);
    let expenses = row.get(2).and_then(Value::as_f64).unwrap_or(0.0);
    let revenue = row.get(3).and_then(Value::as_f64).unwrap_or(0.0);

    let utilization = if working == 0 {
        0.0
    } else {
        100.0 * (booked - working) as f64 / working as f64
    };
    let return_on_sales = if revenue == 0.0 {
        0.0
    } else {
        100.0 - 100.0 * costs / revenue
    };

    Ok(MonthReportDataPoint {
        year_month,
        expenses,
        costs,
        revenue,
        profit: revenue - costs,
        utilization,
        return_on_sales,
    })
}

/// Write the combined monthly report record: the caller-supplied actual
/// figures and the derived estimated figures as sibling field sets of one
/// point, keyed by the month.
pub(crate) fn enter_month_report<S: SeriesStore>(
    store: &S,
    config: &PlannerConfig,
    actual: &MonthReportDataPoint,
) -> PlannerResult<()> {
    let year_month = actual.year_month;
    let costs = historical_costs(store, config);
    let estimated = estimated_point(store, config, year_month, costs)?;

    let mut point = Point::new(
        &config.measurements.report,
        clock::day_nanos(year_month.first_day(), PROJECT_HOUR),
    )
    .tag(&config.tags.year_month, year_month.to_string());
    point = report_fields(point, config, ReportVariant::Actual, actual);
    point = report_fields(point, config, ReportVariant::Estimated, &estimated);

    store.write(vec![point])?;
    Ok(())
}

fn report_fields(
    point: Point,
    config: &PlannerConfig,
    variant: ReportVariant,
    data: &MonthReportDataPoint,
) -> Point {
    let prefix = variant.field_prefix();
    point
        .field(format!("{prefix}{}", config.fields.expenses), data.expenses)
        .field(format!("{prefix}{}", config.fields.costs), data.costs)
        .field(format!("{prefix}{}", config.fields.revenue), data.revenue)
        .field(format!("{prefix}{}", config.fields.profit), data.profit)
        .field(
            format!("{prefix}{}", config.fields.utilization),
            data.utilization,
        )
        .field(
            format!("{prefix}{}", config.fields.return_on_sales),
            data.return_on_sales,
        )
}
