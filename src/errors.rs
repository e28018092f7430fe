use actix_web::{HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Validation(String),
    Unauthorized,
    NotFound,
    InvalidState(String),
    DuplicateVote,
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Validation(msg) => write!(f, "Validation error: {msg}"),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::NotFound => write!(f, "Not found"),
            AppError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            AppError::DuplicateVote => write!(f, "Duplicate vote"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Validation(msg) => HttpResponse::BadRequest()
                .json(serde_json::json!({ "error": msg })),
            AppError::Unauthorized => HttpResponse::Unauthorized()
                .json(serde_json::json!({ "error": "Authentication required" })),
            AppError::NotFound => HttpResponse::NotFound()
                .json(serde_json::json!({ "error": "Not found" })),
            AppError::InvalidState(msg) => HttpResponse::Conflict()
                .json(serde_json::json!({ "error": msg })),
            AppError::DuplicateVote => HttpResponse::Conflict()
                .json(serde_json::json!({ "error": "You have already voted on this proposal" })),
            AppError::Conflict(msg) => HttpResponse::Conflict()
                .json(serde_json::json!({ "error": msg })),
            AppError::Db(_) => {
                log::error!("{self}");
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({ "error": "Internal server error" }))
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}
