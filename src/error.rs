use crate::{auth::provider::AuthError, store::StoreError};
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Failure of an action, rendered as `{"error": message}`.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "No user logged in")]
    NotAuthenticated,
    #[display(fmt = "Attendance already recorded for today")]
    AlreadyRecorded,
    #[display(fmt = "No in-time recorded")]
    NoInTime,
    #[display(fmt = "No attendance record found for today")]
    NoRecordToday,
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    Auth(AuthError),
    #[display(fmt = "{}", _0)]
    Backend(String),
}

impl std::error::Error for AppError {}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        AppError::Auth(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Backend(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::AlreadyRecorded | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NoInTime | AppError::NoRecordToday | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::EmailInUse => StatusCode::CONFLICT,
                AuthError::InvalidEmail | AuthError::WeakPassword | AuthError::InvalidResetCode => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::Hash(_) | AuthError::Signing(_) | AuthError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self.status_code() {
            // backend details stay in the log
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error".to_string(),
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({ "error": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_failures_to_status_codes() {
        assert_eq!(AppError::NotAuthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AlreadyRecorded.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Conflict("taken".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::NoInTime.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(AuthError::EmailInUse).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(StoreError::Unavailable("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(AppError::NoInTime.to_string(), "No in-time recorded");
        assert_eq!(
            AppError::AlreadyRecorded.to_string(),
            "Attendance already recorded for today"
        );
    }
}
