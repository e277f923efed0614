use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::{BTreeMap, BTreeSet};

use super::{
    Filter, Point, Series, SeriesQuery, SeriesStore, StoreResult, Value, evaluate, matches,
};

/// Durable [`SeriesStore`] over a single sqlite file. One row per point; the
/// tag set is stored as canonical JSON (`BTreeMap` keeps key order stable) so
/// it can double as part of the uniqueness key for overwrite semantics.
pub struct SqliteSeriesStore {
    connection: Mutex<Connection>,
}

impl SqliteSeriesStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> StoreResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> StoreResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS points (
                id INTEGER PRIMARY KEY,
                measurement TEXT NOT NULL,
                timestamp_ns INTEGER NOT NULL,
                tags_json TEXT NOT NULL,
                fields_json TEXT NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_points_key
                ON points (measurement, timestamp_ns, tags_json);
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    /// Load every point of a measurement, optionally narrowed by a coarse
    /// time window; fine-grained filtering happens in [`evaluate`].
    fn load_points(
        connection: &Connection,
        measurement: &str,
        window: (Option<i64>, Option<i64>),
    ) -> StoreResult<Vec<Point>> {
        let mut stmt = connection.prepare(
            "SELECT timestamp_ns, tags_json, fields_json FROM points
             WHERE measurement = ?1
               AND timestamp_ns >= ?2 AND timestamp_ns <= ?3
             ORDER BY timestamp_ns ASC",
        )?;
        let (from, to) = window;
        let rows = stmt.query_map(
            params![measurement, from.unwrap_or(i64::MIN), to.unwrap_or(i64::MAX)],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )?;

        let mut points = Vec::new();
        for row in rows {
            let (timestamp_ns, tags_json, fields_json) = row?;
            let tags: BTreeMap<String, String> = serde_json::from_str(&tags_json)?;
            let fields: BTreeMap<String, Value> = serde_json::from_str(&fields_json)?;
            points.push(Point {
                measurement: measurement.to_string(),
                tags,
                fields,
                timestamp_ns,
            });
        }
        Ok(points)
    }

    fn time_window(filters: &[Filter]) -> (Option<i64>, Option<i64>) {
        let mut window = (None, None);
        for filter in filters {
            match filter {
                Filter::TimeAtLeast(ns) => window.0 = Some(*ns),
                Filter::TimeAtMost(ns) => window.1 = Some(*ns),
                _ => {}
            }
        }
        window
    }
}

impl SeriesStore for SqliteSeriesStore {
    fn query(&self, query: &SeriesQuery) -> StoreResult<Vec<Series>> {
        let connection = self.connection.lock();
        let points = Self::load_points(
            &connection,
            &query.measurement,
            Self::time_window(&query.filters),
        )?;
        Ok(evaluate(&points, query))
    }

    fn write(&self, batch: Vec<Point>) -> StoreResult<()> {
        let mut connection = self.connection.lock();
        let tx = connection.transaction()?;
        for point in batch {
            let tags_json = serde_json::to_string(&point.tags)?;
            let existing: Option<(i64, String)> = tx
                .query_row(
                    "SELECT id, fields_json FROM points
                     WHERE measurement = ?1 AND timestamp_ns = ?2 AND tags_json = ?3",
                    params![point.measurement, point.timestamp_ns, tags_json],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            match existing {
                Some((id, fields_json)) => {
                    let mut fields: BTreeMap<String, Value> = serde_json::from_str(&fields_json)?;
                    fields.extend(point.fields);
                    tx.execute(
                        "UPDATE points SET fields_json = ?1 WHERE id = ?2",
                        params![serde_json::to_string(&fields)?, id],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO points (measurement, timestamp_ns, tags_json, fields_json)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            point.measurement,
                            point.timestamp_ns,
                            tags_json,
                            serde_json::to_string(&point.fields)?
                        ],
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, measurement: &str, filters: &[Filter]) -> StoreResult<()> {
        let mut connection = self.connection.lock();
        let tx = connection.transaction()?;
        {
            let mut stmt = tx.prepare(
                "SELECT id, timestamp_ns, tags_json, fields_json FROM points
                 WHERE measurement = ?1",
            )?;
            let rows = stmt.query_map(params![measurement], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;

            let mut doomed = Vec::new();
            for row in rows {
                let (id, timestamp_ns, tags_json, fields_json) = row?;
                let point = Point {
                    measurement: measurement.to_string(),
                    tags: serde_json::from_str(&tags_json)?,
                    fields: serde_json::from_str(&fields_json)?,
                    timestamp_ns,
                };
                if matches(&point, filters) {
                    doomed.push(id);
                }
            }

            let mut delete = tx.prepare("DELETE FROM points WHERE id = ?1")?;
            for id in doomed {
                delete.execute(params![id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn tag_values(&self, measurement: &str, tag: &str) -> StoreResult<Vec<String>> {
        let connection = self.connection.lock();
        let mut stmt =
            connection.prepare("SELECT tags_json FROM points WHERE measurement = ?1")?;
        let rows = stmt.query_map(params![measurement], |row| row.get::<_, String>(0))?;

        let mut values = BTreeSet::new();
        for row in rows {
            let tags: BTreeMap<String, String> = serde_json::from_str(&row?)?;
            if let Some(value) = tags.get(tag) {
                values.insert(value.clone());
            }
        }
        Ok(values.into_iter().collect())
    }
}
