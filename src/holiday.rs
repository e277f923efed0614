use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;

/// A public holiday on a specific calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub name: String,
    pub date: NaiveDate,
}

impl Holiday {
    pub fn new(name: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            date,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HolidayError {
    message: String,
}

impl HolidayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for HolidayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "holiday lookup failed: {}", self.message)
    }
}

impl std::error::Error for HolidayError {}

/// Source of public holidays for one fixed region. Implementations back this
/// with a remote service, a file, or a static table; callers cache per year
/// through [`HolidayCalendar`].
pub trait HolidayProvider {
    fn holidays_for_year(&self, year: i32) -> Result<HashMap<NaiveDate, Holiday>, HolidayError>;
}

impl<H: HolidayProvider + ?Sized> HolidayProvider for Box<H> {
    fn holidays_for_year(&self, year: i32) -> Result<HashMap<NaiveDate, Holiday>, HolidayError> {
        (**self).holidays_for_year(year)
    }
}

/// Caching wrapper around a [`HolidayProvider`]: each year is fetched at most
/// once. A failed fetch is not cached, so a transient provider error does not
/// poison later lookups.
pub struct HolidayCalendar<H> {
    provider: H,
    by_year: Mutex<HashMap<i32, HashMap<NaiveDate, Holiday>>>,
}

impl<H: HolidayProvider> HolidayCalendar<H> {
    pub fn new(provider: H) -> Self {
        Self {
            provider,
            by_year: Mutex::new(HashMap::new()),
        }
    }

    /// The holiday on `date`, if any.
    pub fn holiday_on(&self, date: NaiveDate) -> Result<Option<Holiday>, HolidayError> {
        let year = date.year();
        let mut cache = self.by_year.lock();
        if !cache.contains_key(&year) {
            let fetched = self.provider.holidays_for_year(year)?;
            cache.insert(year, fetched);
        }
        Ok(cache[&year].get(&date).cloned())
    }

    pub fn is_holiday(&self, date: NaiveDate) -> Result<bool, HolidayError> {
        Ok(self.holiday_on(date)?.is_some())
    }
}

/// Provider backed by a fixed list of holidays. Used for tests and for
/// deployments that ship their region's table statically.
#[derive(Debug, Clone, Default)]
pub struct FixedHolidays {
    holidays: Vec<Holiday>,
}

impl FixedHolidays {
    pub fn new(holidays: Vec<Holiday>) -> Self {
        Self { holidays }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl HolidayProvider for FixedHolidays {
    fn holidays_for_year(&self, year: i32) -> Result<HashMap<NaiveDate, Holiday>, HolidayError> {
        Ok(self
            .holidays
            .iter()
            .filter(|h| h.date.year() == year)
            .map(|h| (h.date, h.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl HolidayProvider for CountingProvider {
        fn holidays_for_year(
            &self,
            year: i32,
        ) -> Result<HashMap<NaiveDate, Holiday>, HolidayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let date = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
            Ok(HashMap::from([(date, Holiday::new("New Year", date))]))
        }
    }

    #[test]
    fn calendar_fetches_each_year_once() {
        let calendar = HolidayCalendar::new(CountingProvider {
            calls: AtomicUsize::new(0),
        });
        let new_year = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(calendar.is_holiday(new_year).unwrap());
        assert!(!calendar
            .is_holiday(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .unwrap());
        assert!(calendar.is_holiday(new_year).unwrap());
        assert_eq!(calendar.provider.calls.load(Ordering::SeqCst), 1);
    }

    struct FailingProvider;

    impl HolidayProvider for FailingProvider {
        fn holidays_for_year(
            &self,
            _year: i32,
        ) -> Result<HashMap<NaiveDate, Holiday>, HolidayError> {
            Err(HolidayError::new("service unreachable"))
        }
    }

    #[test]
    fn provider_failure_surfaces() {
        let calendar = HolidayCalendar::new(FailingProvider);
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(calendar.holiday_on(date).is_err());
    }
}
