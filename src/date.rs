use crate::model::PlannerError;
use crate::store::{self, KeyValueStore};
use chrono::{Duration, Local, NaiveDate};

pub const DATE_KEY: &str = "planner_date";
pub const ISO_FORMAT: &str = "%Y-%m-%d";

/// The day the per-date collections are scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateCursor {
    date: NaiveDate,
}

impl DateCursor {
    /// Restores the persisted cursor, defaulting to the local date.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        DateCursor {
            date: store::read(store, DATE_KEY, local_today()),
        }
    }

    pub fn at(date: NaiveDate) -> Self {
        DateCursor { date }
    }

    pub fn current(&self) -> NaiveDate {
        self.date
    }

    pub fn iso(&self) -> String {
        self.date.format(ISO_FORMAT).to_string()
    }

    /// Long form label such as `Thursday, February 29`.
    pub fn nice(&self) -> String {
        self.date.format("%A, %B %-d").to_string()
    }

    pub fn set_date<S: KeyValueStore + ?Sized>(&mut self, store: &S, date: NaiveDate) {
        self.date = date;
        store::write(store, DATE_KEY, &self.date);
    }

    /// The date `delta_days` whole calendar days away, if chrono can
    /// represent it.
    pub fn offset(&self, delta_days: i64) -> Option<NaiveDate> {
        self.date.checked_add_signed(Duration::days(delta_days))
    }

    pub fn move_by<S: KeyValueStore + ?Sized>(&mut self, store: &S, delta_days: i64) {
        if let Some(next) = self.offset(delta_days) {
            self.set_date(store, next);
        }
    }

    pub fn today<S: KeyValueStore + ?Sized>(&mut self, store: &S) {
        self.set_date(store, local_today());
    }
}

pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn parse_iso(raw: &str) -> Result<NaiveDate, PlannerError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, ISO_FORMAT)
        .map_err(|_| PlannerError::InvalidDate(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_to_today_when_unset() {
        let store = MemoryStore::new();
        let cursor = DateCursor::load(&store);
        assert_eq!(cursor.current(), local_today());
    }

    #[test]
    fn leap_day_rollover() {
        let store = MemoryStore::new();
        let mut cursor = DateCursor::at(ymd(2024, 2, 28));
        cursor.move_by(&store, 1);
        assert_eq!(cursor.iso(), "2024-02-29");

        let mut cursor = DateCursor::at(ymd(2023, 2, 28));
        cursor.move_by(&store, 1);
        assert_eq!(cursor.iso(), "2023-03-01");
    }

    #[test]
    fn year_rollover_backwards() {
        let store = MemoryStore::new();
        let mut cursor = DateCursor::at(ymd(2024, 1, 1));
        cursor.move_by(&store, -1);
        assert_eq!(cursor.current(), ymd(2023, 12, 31));
    }

    #[test]
    fn moves_are_persisted() {
        let store = MemoryStore::new();
        let mut cursor = DateCursor::at(ymd(2024, 3, 10));
        cursor.move_by(&store, 5);
        assert_eq!(DateCursor::load(&store).current(), ymd(2024, 3, 15));
    }

    #[test]
    fn rejects_malformed_iso() {
        for raw in ["2024-13-40", "2024-02-30", "03/10/2024", ""] {
            let err = parse_iso(raw).unwrap_err();
            assert!(matches!(err, PlannerError::InvalidDate(_)), "{:?}", raw);
        }
        assert_eq!(parse_iso(" 2024-03-10 ").unwrap(), ymd(2024, 3, 10));
    }

    #[test]
    fn corrupt_stored_date_falls_back_to_today() {
        let store = MemoryStore::new();
        store::write(&store, DATE_KEY, &"not-a-date");
        assert_eq!(DateCursor::load(&store).current(), local_today());
    }

    #[test]
    fn nice_label() {
        assert_eq!(DateCursor::at(ymd(2024, 2, 29)).nice(), "Thursday, February 29");
    }
}
