use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{info, instrument, warn};

use crate::attendance::clock::Clock;
use crate::attendance::error::{CheckinError, CheckoutError, StorageError};
use crate::attendance::state::{AttendanceState, AttendanceStateMachine};
use crate::attendance::store::AttendanceStore;
use crate::attendance::token::CheckinTokenRegistry;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, AttendanceSummary, CheckinToken,
};

/// Days covered by a summary when the caller gives no start date.
pub const DEFAULT_SUMMARY_DAYS: u64 = 30;

/// Entry point for the HTTP layer: owns the token registry and wires the
/// state machine to a store and a clock.
pub struct AttendanceService<S> {
    store: S,
    registry: CheckinTokenRegistry,
    machine: AttendanceStateMachine,
    clock: Arc<dyn Clock>,
}

impl<S: AttendanceStore> AttendanceService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, cutoff: NaiveTime) -> Self {
        Self {
            store,
            registry: CheckinTokenRegistry::new(),
            machine: AttendanceStateMachine::new(cutoff),
            clock,
        }
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn cutoff(&self) -> NaiveTime {
        self.machine.cutoff()
    }

    /// Today's check-in token.
    pub fn issue_token(&self) -> CheckinToken {
        self.registry.get_or_create_token(self.clock.today())
    }

    /// `date` is the day the presented link was issued for. The current day is
    /// taken from `now`, so the record and its check-in time share a date.
    #[instrument(name = "submit_checkin", skip(self, token))]
    pub async fn submit_checkin(
        &self,
        employee_id: u64,
        date: NaiveDate,
        token: &str,
        now: NaiveDateTime,
    ) -> Result<AttendanceRecord, CheckinError> {
        let today = now.date();
        if date != today {
            warn!(%today, "Rejected check-in link for another day");
            return Err(CheckinError::TokenExpired { date });
        }

        if let Err(e) = self.registry.verify(today, token) {
            warn!(code = e.code(), "Rejected check-in token");
            return Err(e);
        }

        self.machine
            .check_in(&self.store, employee_id, today, now)
            .await
    }

    #[instrument(name = "submit_checkout", skip(self))]
    pub async fn submit_checkout(
        &self,
        employee_id: u64,
        now: NaiveDateTime,
    ) -> Result<AttendanceRecord, CheckoutError> {
        self.machine
            .check_out(&self.store, employee_id, now.date(), now)
            .await
    }

    /// Today's record for `employee_id` with the state it puts them in.
    pub async fn today(
        &self,
        employee_id: u64,
    ) -> Result<(AttendanceState, Option<AttendanceRecord>), StorageError> {
        let record = self.store.find(employee_id, self.clock.today()).await?;
        Ok((AttendanceState::of(record.as_ref()), record))
    }

    /// Manual marking by HR/Admin. The only way a day becomes `Absent`.
    #[instrument(name = "mark_attendance", skip(self, notes))]
    pub async fn mark_attendance(
        &self,
        employee_id: u64,
        date: NaiveDate,
        status: AttendanceStatus,
        notes: Option<&str>,
    ) -> Result<AttendanceRecord, StorageError> {
        let record = self
            .store
            .upsert_mark(employee_id, date, status, notes)
            .await?;
        info!("Attendance marked");
        Ok(record)
    }

    /// Every employee's record for one day, by employee id.
    pub async fn day_sheet(&self, date: NaiveDate) -> Result<Vec<AttendanceRecord>, StorageError> {
        self.store.list_by_date(date).await
    }

    pub async fn records(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StorageError> {
        self.store.list(employee_id, from, to).await
    }

    pub async fn summary(
        &self,
        employee_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AttendanceSummary, StorageError> {
        let records = self.store.list(employee_id, from, to).await?;
        Ok(AttendanceSummary::from_records(
            employee_id,
            from,
            to,
            &records,
        ))
    }

    /// Fills in an open-ended window: `to` defaults to today and `from` to
    /// [`DEFAULT_SUMMARY_DAYS`] before `to`. `None` when that start falls
    /// outside the calendar.
    pub fn window(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Option<(NaiveDate, NaiveDate)> {
        let to = to.unwrap_or_else(|| self.clock.today());
        let from = from.or_else(|| to.checked_sub_days(Days::new(DEFAULT_SUMMARY_DAYS)))?;
        Some((from, to))
    }
}

/// Link rendered into the QR code. Plain concatenation, nothing is signed.
pub fn build_checkin_link(base_url: &str, token: &str, date: NaiveDate) -> String {
    format!(
        "{}/attendance/qr-checkin?token={}&date={}",
        base_url.strip_suffix('/').unwrap_or(base_url),
        token,
        date.format("%Y-%m-%d")
    )
}
