use parking_lot::Mutex;
use std::collections::BTreeSet;

use super::{
    Filter, Point, Series, SeriesQuery, SeriesStore, StoreResult, evaluate, matches,
};

/// In-process [`SeriesStore`] holding all points in memory. Backs the test
/// suite and small demo setups; the durable backend is the sqlite store.
#[derive(Default)]
pub struct MemorySeriesStore {
    points: Mutex<Vec<Point>>,
}

impl MemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points currently held; used by idempotence tests.
    pub fn len(&self) -> usize {
        self.points.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SeriesStore for MemorySeriesStore {
    fn query(&self, query: &SeriesQuery) -> StoreResult<Vec<Series>> {
        let points = self.points.lock();
        Ok(evaluate(&points, query))
    }

    fn write(&self, batch: Vec<Point>) -> StoreResult<()> {
        let mut points = self.points.lock();
        for incoming in batch {
            let key = incoming.series_key();
            match points.iter_mut().find(|p| p.series_key() == key) {
                Some(existing) => existing.fields.extend(incoming.fields),
                None => points.push(incoming),
            }
        }
        Ok(())
    }

    fn delete(&self, measurement: &str, filters: &[Filter]) -> StoreResult<()> {
        let mut points = self.points.lock();
        points.retain(|p| p.measurement != measurement || !matches(p, filters));
        Ok(())
    }

    fn tag_values(&self, measurement: &str, tag: &str) -> StoreResult<Vec<String>> {
        let points = self.points.lock();
        let values: BTreeSet<String> = points
            .iter()
            .filter(|p| p.measurement == measurement)
            .filter_map(|p| p.tags.get(tag).cloned())
            .collect();
        Ok(values.into_iter().collect())
    }
}
