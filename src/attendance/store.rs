use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{NaiveDate, NaiveDateTime};

use crate::attendance::error::StorageError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

/// Persistence of attendance records, keyed by (employee, date).
///
/// The check-in and check-out writes are conditional: each returns `false`
/// instead of overwriting when the row is no longer in the expected state, so
/// at most one concurrent transition wins per key.
#[allow(async_fn_in_trait)]
pub trait AttendanceStore: Send + Sync + 'static {
    async fn find(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StorageError>;

    /// Inserts `record` unless a row for its key already exists.
    async fn insert_check_in(&self, record: &AttendanceRecord) -> Result<bool, StorageError>;

    /// Overwrites the row for `record`'s key, but only while that row has no check-in.
    async fn replace_partial(&self, record: &AttendanceRecord) -> Result<bool, StorageError>;

    /// Sets the check-out, but only on a row that is checked in and not yet checked out.
    async fn record_check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        at: NaiveDateTime,
        hours_worked: f64,
    ) -> Result<bool, StorageError>;

    /// Manual marking: sets status and notes, creating the row if needed.
    /// Check-in and check-out times are never touched.
    async fn upsert_mark(
        &self,
        employee_id: u64,
        date: NaiveDate,
        status: AttendanceStatus,
        notes: Option<&str>,
    ) -> Result<AttendanceRecord, StorageError>;

    /// Records in `[from, to]`, newest first.
    async fn list(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StorageError>;

    /// Every employee's record for `date`, by employee id.
    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StorageError>;
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryAttendanceStore {
    rows: Mutex<HashMap<(u64, NaiveDate), AttendanceRecord>>,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(u64, NaiveDate), AttendanceRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AttendanceStore for MemoryAttendanceStore {
    async fn find(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StorageError> {
        Ok(self.lock().get(&(employee_id, date)).cloned())
    }

    async fn insert_check_in(&self, record: &AttendanceRecord) -> Result<bool, StorageError> {
        let mut rows = self.lock();
        let key = (record.employee_id, record.date);
        if rows.contains_key(&key) {
            return Ok(false);
        }
        rows.insert(key, record.clone());
        Ok(true)
    }

    async fn replace_partial(&self, record: &AttendanceRecord) -> Result<bool, StorageError> {
        let mut rows = self.lock();
        match rows.get_mut(&(record.employee_id, record.date)) {
            Some(row) if row.check_in_time.is_none() => {
                *row = record.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        at: NaiveDateTime,
        hours_worked: f64,
    ) -> Result<bool, StorageError> {
        let mut rows = self.lock();
        match rows.get_mut(&(employee_id, date)) {
            Some(row) if row.check_in_time.is_some() && row.check_out_time.is_none() => {
                row.check_out_time = Some(at);
                row.hours_worked = Some(hours_worked);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_mark(
        &self,
        employee_id: u64,
        date: NaiveDate,
        status: AttendanceStatus,
        notes: Option<&str>,
    ) -> Result<AttendanceRecord, StorageError> {
        let mut rows = self.lock();
        let row = rows
            .entry((employee_id, date))
            .or_insert_with(|| AttendanceRecord {
                employee_id,
                date,
                status,
                check_in_time: None,
                check_out_time: None,
                hours_worked: None,
                notes: None,
            });
        row.status = status;
        row.notes = notes.map(str::to_owned);
        Ok(row.clone())
    }

    async fn list(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StorageError> {
        let mut records: Vec<_> = self
            .lock()
            .values()
            .filter(|r| r.employee_id == employee_id && r.date >= from && r.date <= to)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(records)
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StorageError> {
        let mut records: Vec<_> = self
            .lock()
            .values()
            .filter(|r| r.date == date)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.employee_id);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        day(d).and_hms_opt(h, m, 0).unwrap()
    }

    #[actix_web::test]
    async fn insert_is_rejected_once_the_key_exists() {
        let store = MemoryAttendanceStore::new();
        let first = AttendanceRecord::checked_in(1, day(10), AttendanceStatus::Present, at(10, 9, 0));
        let second = AttendanceRecord::checked_in(1, day(10), AttendanceStatus::Late, at(10, 9, 30));

        assert!(store.insert_check_in(&first).await.unwrap());
        assert!(!store.insert_check_in(&second).await.unwrap());
        assert_eq!(store.find(1, day(10)).await.unwrap(), Some(first));
    }

    #[actix_web::test]
    async fn replace_only_applies_to_rows_without_check_in() {
        let store = MemoryAttendanceStore::new();
        store
            .upsert_mark(1, day(10), AttendanceStatus::Absent, None)
            .await
            .unwrap();
        let record = AttendanceRecord::checked_in(1, day(10), AttendanceStatus::Late, at(10, 10, 0));

        assert!(store.replace_partial(&record).await.unwrap());
        assert!(!store.replace_partial(&record).await.unwrap());
    }

    #[actix_web::test]
    async fn check_out_only_applies_once() {
        let store = MemoryAttendanceStore::new();
        let record = AttendanceRecord::checked_in(1, day(10), AttendanceStatus::Present, at(10, 9, 0));
        store.insert_check_in(&record).await.unwrap();

        assert!(store.record_check_out(1, day(10), at(10, 17, 0), 8.0).await.unwrap());
        assert!(!store.record_check_out(1, day(10), at(10, 18, 0), 9.0).await.unwrap());
        assert!(!store.record_check_out(2, day(10), at(10, 18, 0), 9.0).await.unwrap());
    }

    #[actix_web::test]
    async fn mark_keeps_existing_times() {
        let store = MemoryAttendanceStore::new();
        let record = AttendanceRecord::checked_in(1, day(10), AttendanceStatus::Late, at(10, 9, 40));
        store.insert_check_in(&record).await.unwrap();

        let marked = store
            .upsert_mark(1, day(10), AttendanceStatus::Present, Some("traffic"))
            .await
            .unwrap();
        assert_eq!(marked.status, AttendanceStatus::Present);
        assert_eq!(marked.check_in_time, Some(at(10, 9, 40)));
        assert_eq!(marked.notes.as_deref(), Some("traffic"));
    }

    #[actix_web::test]
    async fn list_is_bounded_and_newest_first() {
        let store = MemoryAttendanceStore::new();
        for d in [3, 9, 5, 20] {
            store
                .upsert_mark(1, day(d), AttendanceStatus::Present, None)
                .await
                .unwrap();
        }
        store
            .upsert_mark(2, day(5), AttendanceStatus::Absent, None)
            .await
            .unwrap();

        let dates: Vec<_> = store
            .list(1, day(4), day(10))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.date)
            .collect();
        assert_eq!(dates, vec![day(9), day(5)]);
    }

    #[actix_web::test]
    async fn day_listing_covers_every_employee_on_that_date() {
        let store = MemoryAttendanceStore::new();
        for id in [30, 2, 17] {
            store
                .upsert_mark(id, day(10), AttendanceStatus::Present, None)
                .await
                .unwrap();
        }
        store
            .upsert_mark(5, day(11), AttendanceStatus::Absent, None)
            .await
            .unwrap();

        let ids: Vec<_> = store
            .list_by_date(day(10))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.employee_id)
            .collect();
        assert_eq!(ids, vec![2, 17, 30]);
    }
}
