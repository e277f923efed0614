use chrono::{NaiveDate, Weekday};
use staffplan::clock::{self, PROJECT_HOUR};
use staffplan::holiday::FixedHolidays;
use staffplan::store::{
    Filter, MemorySeriesStore, Point, Select, SeriesQuery, SeriesStore, Value, single_series_rows,
};
use staffplan::{Assignment, AssignmentRequest, DeleteRequest, Planner, PlannerConfig};
use std::collections::HashSet;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn planner() -> Planner<MemorySeriesStore, FixedHolidays> {
    Planner::new(
        MemorySeriesStore::new(),
        FixedHolidays::empty(),
        PlannerConfig::default(),
    )
    .unwrap()
}

fn workweek() -> HashSet<Weekday> {
    [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
    .into()
}

fn assign(
    planner: &Planner<MemorySeriesStore, FixedHolidays>,
    project: &str,
    from: NaiveDate,
    to: NaiveDate,
) {
    let assignment = Assignment::from_assignment_request(AssignmentRequest {
        employee: "erika".to_string(),
        project: project.to_string(),
        status: "hard".to_string(),
        rate: Some(100.0),
        expenses: Some(10.0),
        from,
        to,
        days_of_week: workweek(),
        skip_holidays: false,
        skip_events: false,
        color: "#00ff00".to_string(),
        notes: String::new(),
    })
    .unwrap();
    planner.assign_projects(&[assignment]).unwrap();
}

fn stored_field(
    planner: &Planner<MemorySeriesStore, FixedHolidays>,
    on: NaiveDate,
    field: &str,
) -> Option<Value> {
    let config = planner.config();
    let nanos = clock::day_nanos(on, PROJECT_HOUR);
    let query = SeriesQuery::new(&config.measurements.projects)
        .select(Select::Field(field.to_string()))
        .between(nanos, nanos)
        .filter(Filter::TagEq(
            config.tags.employee.clone(),
            "erika".to_string(),
        ));
    let rows = single_series_rows(planner.store().query(&query).unwrap())?;
    rows.first().and_then(|row| row.first().cloned())
}

#[test]
fn deletion_overwrites_range_with_removed_and_weekend_markers() {
    let planner = planner();
    // 2024-01-01 is a Monday.
    assign(&planner, "Acme", date(2024, 1, 1), date(2024, 1, 5));

    let deleted = planner
        .delete_employee_project("erika", "Acme", date(2024, 1, 1), date(2024, 1, 7))
        .unwrap();
    assert!(deleted);

    assert_eq!(
        stored_field(&planner, date(2024, 1, 1), "project"),
        Some(Value::Text("REMOVED".to_string()))
    );
    assert_eq!(
        stored_field(&planner, date(2024, 1, 1), "daily_rate"),
        Some(Value::Float(0.0))
    );
    assert_eq!(
        stored_field(&planner, date(2024, 1, 1), "color"),
        Some(Value::Text("#ffffff".to_string()))
    );
    // The weekend days of the range become weekend records, not blanks.
    assert_eq!(
        stored_field(&planner, date(2024, 1, 6), "project"),
        Some(Value::Text("WEEKEND".to_string()))
    );
    assert_eq!(
        stored_field(&planner, date(2024, 1, 6), "color"),
        Some(Value::Text("#d6d6d6".to_string()))
    );
}

#[test]
fn ambiguous_range_is_a_no_op() {
    let planner = planner();
    assign(&planner, "Acme", date(2024, 1, 1), date(2024, 1, 2));
    assign(&planner, "Beta", date(2024, 1, 3), date(2024, 1, 4));

    let deleted = planner
        .delete_employee_project("erika", "Acme", date(2024, 1, 1), date(2024, 1, 5))
        .unwrap();
    assert!(!deleted);
    assert_eq!(
        stored_field(&planner, date(2024, 1, 3), "project"),
        Some(Value::Text("Beta".to_string()))
    );
}

#[test]
fn administrative_markers_do_not_make_a_range_ambiguous() {
    let planner = planner();
    assign(&planner, "Acme", date(2024, 1, 1), date(2024, 1, 4));
    // A not-available day inside the range must not block the deletion.
    let config = planner.config();
    planner
        .store()
        .write(vec![Point::new(
            &config.measurements.projects,
            clock::day_nanos(date(2024, 1, 5), PROJECT_HOUR),
        )
        .tag(&config.tags.employee, "erika")
        .field(&config.fields.project, "NOT AVAILABLE")])
        .unwrap();

    let deleted = planner
        .delete_employee_project("erika", "Acme", date(2024, 1, 1), date(2024, 1, 5))
        .unwrap();
    assert!(deleted);
}

#[test]
fn mismatched_project_is_a_no_op() {
    let planner = planner();
    assign(&planner, "Acme", date(2024, 1, 1), date(2024, 1, 5));

    let deleted = planner
        .delete_employee_project("erika", "Beta", date(2024, 1, 1), date(2024, 1, 5))
        .unwrap();
    assert!(!deleted);
    assert_eq!(
        stored_field(&planner, date(2024, 1, 2), "project"),
        Some(Value::Text("Acme".to_string()))
    );
}

#[test]
fn empty_range_is_a_no_op() {
    let planner = planner();
    let deleted = planner
        .delete_employee_project("erika", "Acme", date(2024, 1, 1), date(2024, 1, 5))
        .unwrap();
    assert!(!deleted);
}

fn unassigned_row_count(
    planner: &Planner<MemorySeriesStore, FixedHolidays>,
    project: &str,
) -> usize {
    let config = planner.config();
    let query = SeriesQuery::new(&config.measurements.unassigned_projects)
        .select(Select::Time)
        .filter(Filter::FieldEq(
            config.fields.project.clone(),
            Value::Text(project.to_string()),
        ));
    single_series_rows(planner.store().query(&query).unwrap())
        .map(|rows| rows.len())
        .unwrap_or(0)
}

#[test]
fn unassigned_deletion_only_removes_the_occupied_span() {
    let planner = planner();
    // "Bid A" twice on index 1 (the second block does not intersect the
    // first), "Bid B" on index 2.
    assert_eq!(
        planner
            .create_unassigned_project("Bid A", date(2024, 1, 1), date(2024, 1, 5), "", "")
            .unwrap(),
        1
    );
    assert_eq!(
        planner
            .create_unassigned_project("Bid B", date(2024, 1, 1), date(2024, 1, 3), "", "")
            .unwrap(),
        2
    );
    assert_eq!(
        planner
            .create_unassigned_project("Bid A", date(2024, 1, 10), date(2024, 1, 15), "", "")
            .unwrap(),
        1
    );

    // Deleting over a wider window only touches the dates a group actually
    // occupies inside it.
    let deleted = planner
        .delete_unassigned_project("Bid A", date(2024, 1, 8), date(2024, 1, 20), None)
        .unwrap();
    assert_eq!(deleted, 1);

    assert_eq!(unassigned_row_count(&planner, "Bid A"), 5);
    assert_eq!(unassigned_row_count(&planner, "Bid B"), 3);
}

#[test]
fn delete_request_with_numeric_employee_targets_an_unassigned_block() {
    let planner = planner();
    planner
        .create_unassigned_project("Bid A", date(2024, 1, 10), date(2024, 1, 15), "", "")
        .unwrap();

    let request = DeleteRequest {
        employee: "1".to_string(),
        project: "Bid A".to_string(),
        start: clock::day_nanos(date(2024, 1, 10), PROJECT_HOUR) / 1_000_000,
        duration: 6 * 24 * 60 * 60 * 1000,
    };
    assert!(planner.delete(&request).unwrap());
    assert_eq!(unassigned_row_count(&planner, "Bid A"), 0);
}

#[test]
fn delete_request_with_unrepresentable_range_is_a_no_op() {
    let planner = planner();
    assign(&planner, "Acme", date(2024, 1, 1), date(2024, 1, 5));

    // Start far beyond the nanosecond-representable range (~year 2262).
    let request = DeleteRequest {
        employee: "erika".to_string(),
        project: "Acme".to_string(),
        start: 10_000_000_000_000_000,
        duration: 7 * 24 * 60 * 60 * 1000,
    };
    assert!(!planner.delete(&request).unwrap());

    // A duration overflowing the exclusive end is skipped the same way.
    let request = DeleteRequest {
        employee: "erika".to_string(),
        project: "Acme".to_string(),
        start: clock::day_nanos(date(2024, 1, 1), PROJECT_HOUR) / 1_000_000,
        duration: i64::MAX,
    };
    assert!(!planner.delete(&request).unwrap());
    assert_eq!(
        stored_field(&planner, date(2024, 1, 2), "project"),
        Some(Value::Text("Acme".to_string()))
    );
}

#[test]
fn delete_request_with_wrong_index_is_a_no_op() {
    let planner = planner();
    planner
        .create_unassigned_project("Bid A", date(2024, 1, 10), date(2024, 1, 15), "", "")
        .unwrap();

    let request = DeleteRequest {
        employee: "7".to_string(),
        project: "Bid A".to_string(),
        start: clock::day_nanos(date(2024, 1, 10), PROJECT_HOUR) / 1_000_000,
        duration: 6 * 24 * 60 * 60 * 1000,
    };
    assert!(!planner.delete(&request).unwrap());
    assert_eq!(unassigned_row_count(&planner, "Bid A"), 6);
}
