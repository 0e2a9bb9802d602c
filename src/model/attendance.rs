use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

/// Day label stored with every attendance record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
pub enum AttendanceStatus {
    Present,
    Late,
    /// Only ever set through manual marking.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1000,
    "date": "2025-06-10",
    "status": "Present",
    "check_in_time": "2025-06-10T09:15:00",
    "check_out_time": "2025-06-10T17:15:00",
    "hours_worked": 8.0,
    "notes": null
}))]
pub struct AttendanceRecord {
    pub employee_id: u64,
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(example = "2025-06-10T09:15:00", format = "date-time", value_type = Option<String>)]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(example = "2025-06-10T17:15:00", format = "date-time", value_type = Option<String>)]
    pub check_out_time: Option<NaiveDateTime>,
    #[schema(example = 8.0)]
    pub hours_worked: Option<f64>,
    pub notes: Option<String>,
}

impl AttendanceRecord {
    /// A record as written by a successful check-in.
    pub fn checked_in(
        employee_id: u64,
        date: NaiveDate,
        status: AttendanceStatus,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            employee_id,
            date,
            status,
            check_in_time: Some(at),
            check_out_time: None,
            hours_worked: None,
            notes: None,
        }
    }
}

/// Day-scoped credential rendered into the check-in QR link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CheckinToken {
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub for_date: NaiveDate,
    #[schema(example = "9f1c2b7de4a54f0b8a3c61e2d7f04b5a")]
    pub value: String,
}

impl CheckinToken {
    pub fn generate(for_date: NaiveDate) -> Self {
        Self {
            for_date,
            value: Uuid::new_v4().to_simple().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2025-05-11", format = "date", value_type = String)]
    pub from: NaiveDate,
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub to: NaiveDate,
    #[schema(example = 20)]
    pub total_days: u32,
    #[schema(example = 17)]
    pub present_days: u32,
    #[schema(example = 2)]
    pub late_days: u32,
    #[schema(example = 1)]
    pub absent_days: u32,
    /// Share of recorded days marked Present, as a percentage.
    #[schema(example = 85.0)]
    pub attendance_rate: f64,
    #[schema(example = 152.5)]
    pub hours_worked: f64,
}

impl AttendanceSummary {
    pub fn from_records(
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
        records: &[AttendanceRecord],
    ) -> Self {
        let count = |status: AttendanceStatus| {
            records.iter().filter(|r| r.status == status).count() as u32
        };

        let total_days = records.len() as u32;
        let present_days = count(AttendanceStatus::Present);
        let attendance_rate = if total_days == 0 {
            0.0
        } else {
            round2(present_days as f64 / total_days as f64 * 100.0)
        };

        Self {
            employee_id,
            from,
            to,
            total_days,
            present_days,
            late_days: count(AttendanceStatus::Late),
            absent_days: count(AttendanceStatus::Absent),
            attendance_rate,
            hours_worked: round2(records.iter().filter_map(|r| r.hours_worked).sum()),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn record(d: u32, status: AttendanceStatus, hours: Option<f64>) -> AttendanceRecord {
        AttendanceRecord {
            employee_id: 7,
            date: day(d),
            status,
            check_in_time: None,
            check_out_time: None,
            hours_worked: hours,
            notes: None,
        }
    }

    #[test]
    fn status_round_trips_through_its_column_text() {
        assert_eq!(AttendanceStatus::Late.to_string(), "Late");
        assert_eq!(
            AttendanceStatus::from_str("Absent").unwrap(),
            AttendanceStatus::Absent
        );
        assert!(AttendanceStatus::from_str("late").is_err());
    }

    #[test]
    fn generated_tokens_are_opaque_hex_and_distinct() {
        let a = CheckinToken::generate(day(10));
        let b = CheckinToken::generate(day(10));
        assert_eq!(a.value.len(), 32);
        assert!(a.value.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.value, b.value);
    }

    #[test]
    fn summary_counts_only_present_days_towards_the_rate() {
        let records = vec![
            record(2, AttendanceStatus::Present, Some(8.0)),
            record(3, AttendanceStatus::Late, Some(7.5)),
            record(4, AttendanceStatus::Absent, None),
        ];
        let summary = AttendanceSummary::from_records(7, day(1), day(10), &records);

        assert_eq!(summary.total_days, 3);
        assert_eq!(summary.present_days, 1);
        assert_eq!(summary.late_days, 1);
        assert_eq!(summary.absent_days, 1);
        assert_eq!(summary.attendance_rate, 33.33);
        assert_eq!(summary.hours_worked, 15.5);
    }

    #[test]
    fn empty_summary_has_zero_rate() {
        let summary = AttendanceSummary::from_records(7, day(1), day(10), &[]);
        assert_eq!(summary.total_days, 0);
        assert_eq!(summary.attendance_rate, 0.0);
    }
}
