use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::attendance::error::{CheckinError, CheckoutError, StorageError};
use crate::attendance::store::AttendanceStore;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, round2};

/// Where an employee stands for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum AttendanceState {
    NotCheckedIn,
    CheckedIn,
    CheckedOut,
}

impl AttendanceState {
    /// A row without a check-in (manual marking only) still counts as not checked in.
    pub fn of(record: Option<&AttendanceRecord>) -> Self {
        match record {
            Some(r) if r.check_out_time.is_some() => AttendanceState::CheckedOut,
            Some(r) if r.check_in_time.is_some() => AttendanceState::CheckedIn,
            _ => AttendanceState::NotCheckedIn,
        }
    }
}

/// Applies check-in and check-out for one (employee, day) pair.
///
/// Token checks happen before this is reached; here `today` is taken to be
/// the current calendar day.
#[derive(Debug, Clone, Copy)]
pub struct AttendanceStateMachine {
    cutoff: NaiveTime,
}

impl AttendanceStateMachine {
    pub fn new(cutoff: NaiveTime) -> Self {
        Self { cutoff }
    }

    pub fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    /// Present strictly before the cutoff, Late from the cutoff on.
    pub fn status_at(&self, now: NaiveDateTime) -> AttendanceStatus {
        if now.time() < self.cutoff {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Late
        }
    }

    pub async fn check_in<S: AttendanceStore>(
        &self,
        store: &S,
        employee_id: u64,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<AttendanceRecord, CheckinError> {
        let existing = store.find(employee_id, today).await?;
        if let Some(checked_in_at) = existing.as_ref().and_then(|r| r.check_in_time) {
            return Err(CheckinError::AlreadyCheckedIn { checked_in_at });
        }

        let mut record =
            AttendanceRecord::checked_in(employee_id, today, self.status_at(now), now);

        let claimed = match existing {
            Some(partial) => {
                warn!(
                    employee_id,
                    %today,
                    previous_status = %partial.status,
                    "Replacing attendance row that has no check-in"
                );
                record.notes = partial.notes;
                store.replace_partial(&record).await?
            }
            None => store.insert_check_in(&record).await?,
        };

        if !claimed {
            // lost a race: report whoever won
            return match store
                .find(employee_id, today)
                .await?
                .and_then(|r| r.check_in_time)
            {
                Some(checked_in_at) => Err(CheckinError::AlreadyCheckedIn { checked_in_at }),
                None => Err(StorageError::Conflict.into()),
            };
        }

        info!(employee_id, %today, status = %record.status, "Checked in");
        Ok(record)
    }

    pub async fn check_out<S: AttendanceStore>(
        &self,
        store: &S,
        employee_id: u64,
        today: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<AttendanceRecord, CheckoutError> {
        let Some(mut record) = store.find(employee_id, today).await? else {
            return Err(CheckoutError::NoCheckInFound);
        };
        let Some(checked_in_at) = record.check_in_time else {
            return Err(CheckoutError::NoCheckInFound);
        };
        if let Some(checked_out_at) = record.check_out_time {
            return Err(CheckoutError::AlreadyCheckedOut { checked_out_at });
        }
        if now < checked_in_at {
            return Err(CheckoutError::CheckOutBeforeCheckIn);
        }

        let hours = hours_between(checked_in_at, now);
        if !store
            .record_check_out(employee_id, today, now, hours)
            .await?
        {
            return match store
                .find(employee_id, today)
                .await?
                .and_then(|r| r.check_out_time)
            {
                Some(checked_out_at) => Err(CheckoutError::AlreadyCheckedOut { checked_out_at }),
                None => Err(StorageError::Conflict.into()),
            };
        }

        record.check_out_time = Some(now);
        record.hours_worked = Some(hours);
        info!(employee_id, %today, hours_worked = hours, "Checked out");
        Ok(record)
    }
}

/// Worked hours rounded to two decimals.
pub fn hours_between(check_in: NaiveDateTime, check_out: NaiveDateTime) -> f64 {
    round2((check_out - check_in).num_seconds() as f64 / 3600.0)
}
