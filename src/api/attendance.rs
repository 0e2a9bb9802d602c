use crate::attendance::clock::Clock;
use crate::attendance::error::{CheckinError, CheckoutError};
use crate::attendance::service::{AttendanceService, build_checkin_link};
use crate::attendance::state::AttendanceState;
use crate::attendance::store::AttendanceStore;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use actix_web::{HttpResponse, Responder, error::ErrorBadRequest, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
pub struct IssueTokenResponse {
    #[schema(example = "9f1c2b7de4a54f0b8a3c61e2d7f04b5a")]
    pub token: String,
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(
        example = "http://localhost:8080/api/attendance/qr-checkin?token=9f1c2b7de4a54f0b8a3c61e2d7f04b5a&date=2025-06-10"
    )]
    pub link: String,
    #[schema(example = "09:20")]
    pub cutoff: String,
}

/// What the QR link carries back.
#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CheckinRequest {
    #[schema(example = "9f1c2b7de4a54f0b8a3c61e2d7f04b5a")]
    pub token: String,
    /// Day the link was issued for
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    #[param(value_type = String, example = "2025-06-10")]
    pub date: NaiveDate,
}

#[derive(Deserialize, ToSchema)]
pub struct MarkAttendance {
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "2025-06-10", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(example = "Medical appointment")]
    pub notes: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Defaults to the caller's own employee profile
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    /// Inclusive start, defaults to 30 days before `to`
    #[schema(example = "2025-05-11", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, example = "2025-05-11")]
    pub from: Option<NaiveDate>,
    /// Inclusive end, defaults to today
    #[schema(example = "2025-06-10", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, example = "2025-06-10")]
    pub to: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct DayQuery {
    /// Defaults to today
    #[schema(example = "2025-06-10", format = "date", value_type = Option<String>)]
    #[param(value_type = Option<String>, example = "2025-06-10")]
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct TodayResponse {
    pub state: AttendanceState,
    pub record: Option<AttendanceRecord>,
}

/// Issue today's check-in token
#[utoipa::path(
    post,
    path = "/api/attendance/token",
    responses(
        (status = 200, description = "Token for today, idempotent until the day rolls over", body = IssueTokenResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn issue_token<S: AttendanceStore>(
    auth: AuthUser,
    service: web::Data<AttendanceService<S>>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let token = service.issue_token();
    let link = build_checkin_link(&config.checkin_base_url, &token.value, token.for_date);

    Ok(HttpResponse::Ok().json(IssueTokenResponse {
        link,
        token: token.value,
        date: token.for_date,
        cutoff: service.cutoff().format("%H:%M").to_string(),
    }))
}

async fn submit_checkin<S: AttendanceStore>(
    auth: AuthUser,
    service: &AttendanceService<S>,
    request: &CheckinRequest,
) -> actix_web::Result<HttpResponse> {
    let employee_id = auth.require_employee()?;
    let now = service.clock().now();

    match service
        .submit_checkin(employee_id, request.date, request.token.trim(), now)
        .await
    {
        Ok(record) => Ok(HttpResponse::Ok().json(json!({
            "message": "Checked in successfully",
            "status": "ok",
            "record": record
        }))),
        // intent already satisfied
        Err(e @ CheckinError::AlreadyCheckedIn { .. }) => Ok(HttpResponse::Ok().json(json!({
            "message": e.to_string(),
            "status": "info",
            "code": e.code()
        }))),
        Err(e) => {
            if let CheckinError::Storage(cause) = &e {
                error!(error = %cause, employee_id, "Check-in failed");
            }
            Err(e.into())
        }
    }
}

/// Check in with today's token
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body(
        content = CheckinRequest,
        description = "Token and date from the scanned QR link",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Checked in, or already checked in today", body = Object, example = json!({
            "message": "Checked in successfully",
            "status": "ok",
            "record": {
                "employee_id": 1000,
                "date": "2025-06-10",
                "status": "Present",
                "check_in_time": "2025-06-10T09:15:00",
                "check_out_time": null,
                "hours_worked": null,
                "notes": null
            }
        })),
        (status = 400, description = "No token issued today, or the token does not match", body = Object, example = json!({
            "message": "Invalid check-in link.",
            "code": "token_mismatch"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 410, description = "Link was issued for another day", body = Object, example = json!({
            "message": "This check-in link was issued for 2025-06-10 and is only valid on that day.",
            "code": "token_expired"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in<S: AttendanceStore>(
    auth: AuthUser,
    service: web::Data<AttendanceService<S>>,
    payload: web::Json<CheckinRequest>,
) -> actix_web::Result<impl Responder> {
    submit_checkin(auth, &service, &payload).await
}

/// Check in straight from the scanned QR link
#[utoipa::path(
    get,
    path = "/api/attendance/qr-checkin",
    params(CheckinRequest),
    responses(
        (status = 200, description = "Checked in, or already checked in today", body = Object),
        (status = 400, description = "No token issued today, or the token does not match"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 410, description = "Link was issued for another day"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn qr_check_in<S: AttendanceStore>(
    auth: AuthUser,
    service: web::Data<AttendanceService<S>>,
    query: web::Query<CheckinRequest>,
) -> actix_web::Result<impl Responder> {
    submit_checkin(auth, &service, &query).await
}

/// Check out for today
#[utoipa::path(
    put,
    path = "/api/attendance/check-out",
    responses(
        (status = 200, description = "Checked out, or already checked out today", body = Object, example = json!({
            "message": "Checked out successfully",
            "status": "ok",
            "record": {
                "employee_id": 1000,
                "date": "2025-06-10",
                "status": "Present",
                "check_in_time": "2025-06-10T09:15:00",
                "check_out_time": "2025-06-10T17:15:00",
                "hours_worked": 8.0,
                "notes": null
            }
        })),
        (status = 400, description = "No check-in found for today", body = Object, example = json!({
            "message": "No check-in found for today. Please check in first.",
            "code": "no_check_in_found"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out<S: AttendanceStore>(
    auth: AuthUser,
    service: web::Data<AttendanceService<S>>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let now = service.clock().now();

    match service.submit_checkout(employee_id, now).await {
        Ok(record) => Ok(HttpResponse::Ok().json(json!({
            "message": "Checked out successfully",
            "status": "ok",
            "record": record
        }))),
        Err(e @ CheckoutError::AlreadyCheckedOut { .. }) => Ok(HttpResponse::Ok().json(json!({
            "message": e.to_string(),
            "status": "info",
            "code": e.code()
        }))),
        Err(e) => {
            if let CheckoutError::Storage(cause) = &e {
                error!(error = %cause, employee_id, "Check-out failed");
            }
            Err(e.into())
        }
    }
}

/// Caller's attendance state for today
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's state and record", body = TodayResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today<S: AttendanceStore>(
    auth: AuthUser,
    service: web::Data<AttendanceService<S>>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let (state, record) = service.today(employee_id).await.map_err(|e| {
        error!(error = %e, employee_id, "Failed to load today's attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(TodayResponse { state, record }))
}

/// Mark attendance by hand
#[utoipa::path(
    put,
    path = "/api/attendance/mark",
    request_body = MarkAttendance,
    responses(
        (status = 200, description = "Attendance marked", body = AttendanceRecord),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance<S: AttendanceStore>(
    auth: AuthUser,
    service: web::Data<AttendanceService<S>>,
    payload: web::Json<MarkAttendance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let record = service
        .mark_attendance(
            payload.employee_id,
            payload.date,
            payload.status,
            payload.notes.as_deref(),
        )
        .await
        .map_err(|e| {
            error!(error = %e, employee_id = payload.employee_id, "Failed to mark attendance");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(record))
}

fn window<S: AttendanceStore>(
    service: &AttendanceService<S>,
    query: &AttendanceQuery,
) -> actix_web::Result<(NaiveDate, NaiveDate)> {
    let (from, to) = service
        .window(query.from, query.to)
        .ok_or_else(|| ErrorBadRequest("Date range is out of bounds"))?;
    if from > to {
        return Err(ErrorBadRequest("from cannot be after to"));
    }
    Ok((from, to))
}

/// Attendance totals over a date window
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance summary", body = crate::model::attendance::AttendanceSummary),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn summary<S: AttendanceStore>(
    auth: AuthUser,
    service: web::Data<AttendanceService<S>>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.resolve_employee(query.employee_id)?;
    let (from, to) = window(&service, &query)?;

    let summary = service.summary(employee_id, from, to).await.map_err(|e| {
        error!(error = %e, employee_id, "Failed to build attendance summary");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(summary))
}

/// Attendance records over a date window, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/records",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance records", body = [AttendanceRecord]),
        (status = 400, description = "Bad request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_records<S: AttendanceStore>(
    auth: AuthUser,
    service: web::Data<AttendanceService<S>>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.resolve_employee(query.employee_id)?;
    let (from, to) = window(&service, &query)?;

    let records = service.records(employee_id, from, to).await.map_err(|e| {
        error!(error = %e, employee_id, "Failed to list attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(records))
}

/// Everyone's attendance for one day
#[utoipa::path(
    get,
    path = "/api/attendance/day",
    params(DayQuery),
    responses(
        (status = 200, description = "Records for the day, by employee id", body = [AttendanceRecord]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn day_sheet<S: AttendanceStore>(
    auth: AuthUser,
    service: web::Data<AttendanceService<S>>,
    query: web::Query<DayQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let date = query.date.unwrap_or_else(|| service.clock().today());

    let records = service.day_sheet(date).await.map_err(|e| {
        error!(error = %e, %date, "Failed to load day sheet");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(records))
}
