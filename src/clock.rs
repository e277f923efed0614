use chrono::{Local, NaiveDate, TimeZone};

/// Time of day for overlay records (weekends, holidays, calendar labels).
pub const OVERLAY_HOUR: u32 = 10;

/// Time of day for project and event records. Distinct from [`OVERLAY_HOUR`]
/// so a project record and an overlay record for the same day never share a
/// timestamp in the store.
pub const PROJECT_HOUR: u32 = 12;

/// Nanosecond timestamp for `date` at the given local hour.
pub fn day_nanos(date: NaiveDate, hour: u32) -> i64 {
    let wall = date.and_hms_opt(hour, 0, 0).unwrap();
    let local = Local
        .from_local_datetime(&wall)
        .earliest()
        .expect("10:00/12:00 never falls inside a DST gap");
    // Floor to whole seconds before scaling, matching the store's resolution.
    local.timestamp() * 1_000_000_000
}

/// Local calendar date a stored nanosecond timestamp falls on.
pub fn date_from_nanos(nanos: i64) -> NaiveDate {
    Local.timestamp_nanos(nanos).date_naive()
}

/// Local calendar date for an epoch-milliseconds instant, or `None` when the
/// value leaves the store's nanosecond-representable range. Millis arrive
/// from external payloads and cannot be trusted to stay in bounds.
pub fn date_from_millis(millis: i64) -> Option<NaiveDate> {
    let nanos = millis.checked_mul(1_000_000)?;
    Some(Local.timestamp_nanos(nanos).date_naive())
}
