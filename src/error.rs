//! HTTP error payloads and mapping from domain errors.

use crate::{
    attendance::{AttendanceError, store::StoreError},
    db::is_foreign_key_violation,
};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::{Map, Value, json};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Attendance(#[from] AttendanceError),

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if is_foreign_key_violation(&err) {
            AppError::Validation("Referenced user or shift does not exist".to_string())
        } else {
            AppError::Database(err)
        }
    }
}

impl AppError {
    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "ValidationError",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Attendance(e) => match e {
                AttendanceError::Validation(_) => "ValidationError",
                AttendanceError::NoCheckIn { .. } => "NoCheckInError",
                AttendanceError::InvalidOrder { .. } => "InvalidOrderError",
                AttendanceError::Conflict { .. } => "Conflict",
                AttendanceError::Store(StoreError::UnknownReference(_)) => "ValidationError",
                AttendanceError::Store(_) => "InternalError",
            },
            AppError::Database(_) | AppError::Internal(_) => "InternalError",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::Attendance(AttendanceError::NoCheckIn { user_id, date }) => Some(json!({
                "user_id": user_id,
                "date": date,
            })),
            AppError::Attendance(AttendanceError::InvalidOrder {
                check_in,
                check_out,
            }) => Some(json!({
                "check_in_time": check_in,
                "check_out_time": check_out,
            })),
            _ => None,
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Attendance(e) => match e {
                AttendanceError::Validation(_)
                | AttendanceError::NoCheckIn { .. }
                | AttendanceError::InvalidOrder { .. }
                | AttendanceError::Store(StoreError::UnknownReference(_)) => {
                    StatusCode::BAD_REQUEST
                }
                AttendanceError::Conflict { .. } => StatusCode::CONFLICT,
                AttendanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = Map::new();
        body.insert("kind".to_string(), Value::from(self.kind()));

        if self.is_internal() {
            error!(error = %self, "Request failed");
            body.insert("message".to_string(), Value::from("Internal Server Error"));
        } else {
            body.insert("message".to_string(), Value::from(self.to_string()));
            if let Some(Value::Object(details)) = self.details() {
                body.extend(details);
            }
        }

        HttpResponse::build(self.status_code()).json(Value::Object(body))
    }
}
