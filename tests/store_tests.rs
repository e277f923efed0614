//! Backend conformance: both bundled stores must agree on query semantics.

use staffplan::{
    Filter, MemorySeriesStore, Point, Select, SeriesQuery, SeriesStore, Value, single_series,
    single_series_rows,
};

fn point(ts: i64, employee: &str, project: &str, rate: f64) -> Point {
    Point::new("projects", ts)
        .tag("employee", employee)
        .field("project", project)
        .field("daily_rate", rate)
}

fn conformance(store: &impl SeriesStore) {
    store
        .write(vec![
            point(100, "erika", "Acme", 80.0),
            point(200, "erika", "Beta", 120.0),
            point(300, "max", "Acme", 95.0),
        ])
        .unwrap();

    // Plain selection, one row per point sorted by timestamp.
    let query = SeriesQuery::new("projects")
        .select(Select::Time)
        .select(Select::Field("project".to_string()))
        .filter(Filter::TagEq("employee".to_string(), "erika".to_string()));
    let rows = single_series_rows(store.query(&query).unwrap()).unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::Integer(100), Value::Text("Acme".to_string())],
            vec![Value::Integer(200), Value::Text("Beta".to_string())],
        ]
    );

    // No matching point is "no data", not an error.
    let query = SeriesQuery::new("projects")
        .select(Select::Time)
        .filter(Filter::TagEq("employee".to_string(), "nobody".to_string()));
    assert!(store.query(&query).unwrap().is_empty());
    assert!(single_series_rows(store.query(&query).unwrap()).is_none());

    // Re-writing the same (measurement, tags, timestamp) merges fields.
    store
        .write(vec![Point::new("projects", 100)
            .tag("employee", "erika")
            .field("project", "Gamma")
            .field("notes", "rebooked")])
        .unwrap();
    let query = SeriesQuery::new("projects")
        .select(Select::Field("project".to_string()))
        .select(Select::Field("daily_rate".to_string()))
        .select(Select::Field("notes".to_string()))
        .between(100, 100);
    let rows = single_series_rows(store.query(&query).unwrap()).unwrap();
    assert_eq!(
        rows,
        vec![vec![
            Value::Text("Gamma".to_string()),
            Value::Float(80.0),
            Value::Text("rebooked".to_string()),
        ]]
    );

    // Distinct is sorted and deduplicated across series.
    let query =
        SeriesQuery::new("projects").select(Select::Distinct("project".to_string()));
    let rows = single_series_rows(store.query(&query).unwrap()).unwrap();
    assert_eq!(
        rows,
        vec![
            vec![Value::Text("Acme".to_string())],
            vec![Value::Text("Beta".to_string())],
            vec![Value::Text("Gamma".to_string())],
        ]
    );

    // Aggregates collapse to one row; Last yields a [time, value] pair.
    let query = SeriesQuery::new("projects")
        .select(Select::Count("daily_rate".to_string()))
        .select(Select::Sum("daily_rate".to_string()))
        .select(Select::Mean("daily_rate".to_string()));
    let rows = single_series_rows(store.query(&query).unwrap()).unwrap();
    assert_eq!(
        rows,
        vec![vec![
            Value::Integer(3),
            Value::Float(80.0 + 120.0 + 95.0),
            Value::Float((80.0 + 120.0 + 95.0) / 3.0),
        ]]
    );

    let query = SeriesQuery::new("projects").select(Select::Last("project".to_string()));
    let rows = single_series_rows(store.query(&query).unwrap()).unwrap();
    assert_eq!(
        rows,
        vec![vec![Value::Integer(300), Value::Text("Acme".to_string())]]
    );

    // Grouping yields one series per tag value, ordered by value, and is
    // never collapsed by single_series.
    let query = SeriesQuery::new("projects")
        .select(Select::Time)
        .group_by_tag("employee");
    let result = store.query(&query).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].tags.get("employee").map(String::as_str), Some("erika"));
    assert_eq!(result[0].rows.len(), 2);
    assert_eq!(result[1].tags.get("employee").map(String::as_str), Some("max"));
    assert_eq!(result[1].rows.len(), 1);
    assert!(single_series(store.query(&query).unwrap()).is_none());

    assert_eq!(
        store.tag_values("projects", "employee").unwrap(),
        vec!["erika".to_string(), "max".to_string()]
    );

    // Deletion honors tag and time filters together.
    store
        .delete(
            "projects",
            &[
                Filter::TagEq("employee".to_string(), "erika".to_string()),
                Filter::TimeAtLeast(150),
                Filter::TimeAtMost(250),
            ],
        )
        .unwrap();
    let query = SeriesQuery::new("projects").select(Select::Time);
    let rows = single_series_rows(store.query(&query).unwrap()).unwrap();
    assert_eq!(
        rows,
        vec![vec![Value::Integer(100)], vec![Value::Integer(300)]]
    );
}

#[test]
fn memory_store_conforms() {
    conformance(&MemorySeriesStore::new());
}

#[test]
fn store_error_preserves_its_cause() {
    use staffplan::StoreError;
    use std::error::Error;

    let cause = serde_json::from_str::<Point>("{").unwrap_err();
    let err = StoreError::from(cause);
    assert!(err.source().is_some());

    let err = StoreError::Backend("connection reset".to_string());
    assert!(err.source().is_none());
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_store_conforms() {
    conformance(&staffplan::SqliteSeriesStore::in_memory().unwrap());
}

#[cfg(feature = "sqlite")]
#[test]
fn sqlite_store_persists_across_reopen() {
    use staffplan::SqliteSeriesStore;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("staffplan.db");

    {
        let store = SqliteSeriesStore::new(&path).unwrap();
        store.write(vec![point(100, "erika", "Acme", 80.0)]).unwrap();
    }

    let store = SqliteSeriesStore::new(&path).unwrap();
    let query = SeriesQuery::new("projects").select(Select::Field("project".to_string()));
    let rows = single_series_rows(store.query(&query).unwrap()).unwrap();
    assert_eq!(rows, vec![vec![Value::Text("Acme".to_string())]]);
}
