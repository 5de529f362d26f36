//! HTTP-facing error type.
//!
//! Every handler returns `Result<T, AppError>`. Errors render as a flat
//! `{"message": ...}` JSON body; server-side failures are logged and their
//! details are kept out of the response.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::domain::aggregates::{CartError, OrderError};
use crate::services::payment::PaymentError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Payment(PaymentError::InvalidSignature(_) | PaymentError::InvalidRequest(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Payment(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
        }

        let message = match &self {
            Self::Database(RepositoryError::Conflict(_)) => "Resource already exists".to_string(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Payment(PaymentError::InvalidSignature(reason)) => format!("Webhook Error: {reason}"),
            Self::Payment(PaymentError::InvalidRequest(reason)) => reason.clone(),
            Self::Payment(_) => "Payment provider error".to_string(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        Self::NotFound(err.to_string())
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by_key(|(field, _)| *field);
        let messages: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| format!("Invalid {field}"), ToString::to_string)
                })
            })
            .collect();
        Self::BadRequest(messages.join(", "))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::NotFound("Product not found".into())), StatusCode::NOT_FOUND);
        assert_eq!(get_status(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(AppError::Internal("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            get_status(RepositoryError::DataCorruption("x".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_errors_convert() {
        let err: AppError = CartError::ItemNotFound.into();
        assert_eq!(err.to_string(), "Cart item not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let err: AppError = OrderError::NoItems.into();
        assert_eq!(err.to_string(), "No order items");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_message_flattened() {
        #[derive(Validate)]
        struct Probe {
            #[validate(length(min = 1, message = "Please provide a name"))]
            name: String,
        }
        let err: AppError = Probe { name: String::new() }.validate().unwrap_err().into();
        assert_eq!(err.to_string(), "Please provide a name");
    }
}
