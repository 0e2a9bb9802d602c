use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{FromRow, MySqlPool};

use crate::attendance::error::StorageError;
use crate::attendance::store::AttendanceStore;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};

const SELECT_ATTENDANCE: &str = r#"
    SELECT employee_id, date, status, check_in, check_out, hours_worked, notes
    FROM attendance
"#;

/// `attendance` table backed store. See `sql/attendance.sql` for the schema.
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    employee_id: u64,
    date: NaiveDate,
    status: String,
    check_in: Option<NaiveDateTime>,
    check_out: Option<NaiveDateTime>,
    hours_worked: Option<f64>,
    notes: Option<String>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = StorageError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<AttendanceStatus>().map_err(|_| {
            StorageError::Corrupt(format!(
                "employee {} on {} has unknown status {:?}",
                row.employee_id, row.date, row.status
            ))
        })?;

        Ok(AttendanceRecord {
            employee_id: row.employee_id,
            date: row.date,
            status,
            check_in_time: row.check_in,
            check_out_time: row.check_out,
            hours_worked: row.hours_worked,
            notes: row.notes,
        })
    }
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}

impl AttendanceStore for MySqlAttendanceStore {
    async fn find(
        &self,
        employee_id: u64,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StorageError> {
        let sql = format!("{SELECT_ATTENDANCE} WHERE employee_id = ? AND date = ?");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?
            .map(AttendanceRecord::try_from)
            .transpose()
    }

    async fn insert_check_in(&self, record: &AttendanceRecord) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, status, check_in, notes)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.employee_id)
        .bind(record.date)
        .bind(record.status.to_string())
        .bind(record.check_in_time)
        .bind(record.notes.as_deref())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(true),
            // unique (employee_id, date): someone else got there first
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace_partial(&self, record: &AttendanceRecord) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET status = ?, check_in = ?, check_out = NULL, hours_worked = NULL, notes = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in IS NULL
            "#,
        )
        .bind(record.status.to_string())
        .bind(record.check_in_time)
        .bind(record.notes.as_deref())
        .bind(record.employee_id)
        .bind(record.date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_check_out(
        &self,
        employee_id: u64,
        date: NaiveDate,
        at: NaiveDateTime,
        hours_worked: f64,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out = ?, hours_worked = ?
            WHERE employee_id = ?
            AND date = ?
            AND check_in IS NOT NULL
            AND check_out IS NULL
            "#,
        )
        .bind(at)
        .bind(hours_worked)
        .bind(employee_id)
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn upsert_mark(
        &self,
        employee_id: u64,
        date: NaiveDate,
        status: AttendanceStatus,
        notes: Option<&str>,
    ) -> Result<AttendanceRecord, StorageError> {
        sqlx::query(
            r#"
            INSERT INTO attendance (employee_id, date, status, notes)
            VALUES (?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE status = VALUES(status), notes = VALUES(notes)
            "#,
        )
        .bind(employee_id)
        .bind(date)
        .bind(status.to_string())
        .bind(notes)
        .execute(&self.pool)
        .await?;

        self.find(employee_id, date)
            .await?
            .ok_or(StorageError::Conflict)
    }

    async fn list(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StorageError> {
        let sql = format!(
            "{SELECT_ATTENDANCE} WHERE employee_id = ? AND date BETWEEN ? AND ? ORDER BY date DESC"
        );
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(employee_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StorageError> {
        let sql = format!("{SELECT_ATTENDANCE} WHERE date = ? ORDER BY employee_id");
        sqlx::query_as::<_, AttendanceRow>(&sql)
            .bind(date)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn row(status: &str) -> AttendanceRow {
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        AttendanceRow {
            employee_id: 42,
            date,
            status: status.to_string(),
            check_in: date.and_hms_opt(9, 15, 0),
            check_out: date.and_hms_opt(17, 15, 0),
            hours_worked: Some(8.0),
            notes: Some("remote".to_string()),
        }
    }

    #[test]
    fn row_maps_onto_record() {
        let record = AttendanceRecord::try_from(row("Late")).unwrap();
        assert_eq!(record.employee_id, 42);
        assert_eq!(record.status, AttendanceStatus::Late);
        assert_eq!(record.check_in_time, row("Late").check_in);
        assert_eq!(record.check_out_time, row("Late").check_out);
        assert_eq!(record.hours_worked, Some(8.0));
        assert_eq!(record.notes.as_deref(), Some("remote"));
    }

    #[test]
    fn unknown_status_is_reported_as_corrupt() {
        let err = AttendanceRecord::try_from(row("on_holiday")).unwrap_err();
        assert_matches!(err, StorageError::Corrupt(ref msg)
            if msg.contains("employee 42") && msg.contains("on_holiday"));
    }

    #[test]
    fn only_sqlstate_23000_counts_as_duplicate() {
        assert!(!is_duplicate_key(&sqlx::Error::RowNotFound));
        assert!(!is_duplicate_key(&sqlx::Error::PoolTimedOut));
    }
}
