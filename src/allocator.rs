//! Slot-index allocation for unassigned blocks.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::clock::{self, PROJECT_HOUR};
use crate::config::PlannerConfig;
use crate::error::PlannerResult;
use crate::store::{Select, SeriesQuery, SeriesStore, Value, single_series_rows};

/// Smallest positive index not used by any unassigned block intersecting
/// `[from, to]`. Indices are not contiguous: deleting a block releases its
/// index for immediate reuse, so gaps are expected.
///
/// Known limitation: the query and the later write are not one transaction,
/// so two concurrent allocations over overlapping ranges can return the same
/// index. Callers accept this; a lock here would not close the window since
/// the store write happens outside it.
pub(crate) fn free_index<S: SeriesStore>(
    store: &S,
    config: &PlannerConfig,
    from: NaiveDate,
    to: NaiveDate,
) -> PlannerResult<u32> {
    let query = SeriesQuery::new(&config.measurements.unassigned_projects)
        .select(Select::Tag(config.tags.index.clone()))
        .select(Select::Field(config.fields.project.clone()))
        .between(
            clock::day_nanos(from, PROJECT_HOUR),
            clock::day_nanos(to, PROJECT_HOUR),
        );

    let in_use: HashSet<u32> = match single_series_rows(store.query(&query)?) {
        Some(rows) => rows
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_str))
            .filter_map(|raw| raw.parse().ok())
            .collect(),
        None => HashSet::new(),
    };

    let mut index = 1;
    while in_use.contains(&index) {
        index += 1;
    }
    Ok(index)
}
