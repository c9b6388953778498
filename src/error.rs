use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use crate::flash::Flash;
use crate::store::StoreError;

/// Failures of browser-facing handlers. Every variant turns into a redirect with a flash message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please log in to continue.")]
    NotLoggedIn,
    #[error("{message}")]
    Forbidden { message: String, redirect: String },
    #[error("{message}")]
    NotFound { message: String, redirect: String },
    #[error("{message}")]
    Invalid { message: String, redirect: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn forbidden(redirect: &str, message: impl Into<String>) -> Self {
        AppError::Forbidden { message: message.into(), redirect: redirect.to_string() }
    }

    pub fn not_found(redirect: &str, message: impl Into<String>) -> Self {
        AppError::NotFound { message: message.into(), redirect: redirect.to_string() }
    }

    pub fn invalid(redirect: &str, message: impl Into<String>) -> Self {
        AppError::Invalid { message: message.into(), redirect: redirect.to_string() }
    }

    pub fn flash(&self) -> Flash {
        match self {
            AppError::NotLoggedIn => Flash::error("/login", self.to_string()),
            AppError::Forbidden { message, redirect }
            | AppError::NotFound { message, redirect }
            | AppError::Invalid { message, redirect } => Flash::error(redirect.clone(), message.clone()),
            AppError::Store(_) => Flash::error("/dashboard", "Database connection error. Please try again later."),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SEE_OTHER
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Store(e) = self {
            error!("Database error: {}", e);
        }
        self.flash().into_response()
    }
}
