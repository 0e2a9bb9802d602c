use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;
use serde_json::json;
use strum_macros::IntoStaticStr;

/// Failure of the persistence collaborator. Never a business-rule outcome.
#[derive(Debug, Display)]
pub enum StorageError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    /// A conditional write lost, and the re-read found no winner to report.
    #[display(fmt = "attendance row changed concurrently")]
    Conflict,
    #[display(fmt = "corrupt attendance row: {}", _0)]
    Corrupt(String),
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        StorageError::Database(e)
    }
}

#[derive(Debug, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CheckinError {
    #[display(fmt = "No check-in code has been generated for today. Please contact your administrator.")]
    NoTokenIssued,
    #[display(
        fmt = "This check-in link was issued for {} and is only valid on that day.",
        date
    )]
    TokenExpired { date: NaiveDate },
    #[display(fmt = "Invalid check-in link.")]
    TokenMismatch,
    #[display(
        fmt = "Already checked in today at {}",
        "checked_in_at.format(\"%H:%M\")"
    )]
    AlreadyCheckedIn { checked_in_at: NaiveDateTime },
    #[display(fmt = "{}", _0)]
    Storage(StorageError),
}

impl CheckinError {
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

impl std::error::Error for CheckinError {}

impl From<StorageError> for CheckinError {
    fn from(e: StorageError) -> Self {
        CheckinError::Storage(e)
    }
}

impl ResponseError for CheckinError {
    fn status_code(&self) -> StatusCode {
        match self {
            CheckinError::NoTokenIssued | CheckinError::TokenMismatch => StatusCode::BAD_REQUEST,
            CheckinError::TokenExpired { .. } => StatusCode::GONE,
            CheckinError::AlreadyCheckedIn { .. } => StatusCode::CONFLICT,
            CheckinError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": public_message(self, matches!(self, CheckinError::Storage(_))),
            "code": self.code(),
        }))
    }
}

#[derive(Debug, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CheckoutError {
    #[display(fmt = "No check-in found for today. Please check in first.")]
    NoCheckInFound,
    #[display(
        fmt = "Already checked out today at {}",
        "checked_out_at.format(\"%H:%M\")"
    )]
    AlreadyCheckedOut { checked_out_at: NaiveDateTime },
    #[display(fmt = "Check-out time is earlier than the recorded check-in.")]
    CheckOutBeforeCheckIn,
    #[display(fmt = "{}", _0)]
    Storage(StorageError),
}

impl CheckoutError {
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

impl std::error::Error for CheckoutError {}

impl From<StorageError> for CheckoutError {
    fn from(e: StorageError) -> Self {
        CheckoutError::Storage(e)
    }
}

impl ResponseError for CheckoutError {
    fn status_code(&self) -> StatusCode {
        match self {
            CheckoutError::NoCheckInFound | CheckoutError::CheckOutBeforeCheckIn => {
                StatusCode::BAD_REQUEST
            }
            CheckoutError::AlreadyCheckedOut { .. } => StatusCode::CONFLICT,
            CheckoutError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": public_message(self, matches!(self, CheckoutError::Storage(_))),
            "code": self.code(),
        }))
    }
}

// storage details stay in the log
fn public_message(err: &dyn std::fmt::Display, internal: bool) -> String {
    if internal {
        "Internal Server Error".to_string()
    } else {
        err.to_string()
    }
}
