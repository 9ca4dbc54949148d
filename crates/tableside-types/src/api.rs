//! API types for the tableside HTTP API.
//!
//! The API boundary never exposes transport details to diners. Every failure
//! leaves the service as an [`ApiError`], which carries a stable error code
//! and maps to exactly one HTTP status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code for requests rejected before reaching the remote data service.
pub const ERROR_INVALID_REQUEST: &str = "INVALID_REQUEST";
/// Error code for a table, order or resource the remote service does not know.
pub const ERROR_NOT_FOUND: &str = "NOT_FOUND";
/// Error code for a creation rejected by the active-order constraint.
pub const ERROR_CONFLICT: &str = "CONFLICT";
/// Error code for any failure talking to the remote data service.
pub const ERROR_REMOTE_UNAVAILABLE: &str = "REMOTE_SERVICE_UNAVAILABLE";
/// Error code for a request body over the configured size limit.
pub const ERROR_PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";

/// API error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
	/// Malformed or invalid input (400)
	BadRequest { message: String },
	/// Referenced resource does not exist (404)
	NotFound { message: String },
	/// Creation rejected because the table already has an active order (409)
	Conflict { message: String },
	/// Request body over the size limit (413)
	PayloadTooLarge { message: String },
	/// Remote data service unreachable or misbehaving (503)
	ServiceUnavailable { message: String },
}

impl ApiError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::NotFound { .. } => 404,
			ApiError::Conflict { .. } => 409,
			ApiError::PayloadTooLarge { .. } => 413,
			ApiError::ServiceUnavailable { .. } => 503,
		}
	}

	/// Stable machine-readable code for this error.
	pub fn error_code(&self) -> &'static str {
		match self {
			ApiError::BadRequest { .. } => ERROR_INVALID_REQUEST,
			ApiError::NotFound { .. } => ERROR_NOT_FOUND,
			ApiError::Conflict { .. } => ERROR_CONFLICT,
			ApiError::PayloadTooLarge { .. } => ERROR_PAYLOAD_TOO_LARGE,
			ApiError::ServiceUnavailable { .. } => ERROR_REMOTE_UNAVAILABLE,
		}
	}

	fn message(&self) -> &str {
		match self {
			ApiError::BadRequest { message }
			| ApiError::NotFound { message }
			| ApiError::Conflict { message }
			| ApiError::PayloadTooLarge { message }
			| ApiError::ServiceUnavailable { message } => message,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		ErrorResponse {
			error: self.error_code().to_string(),
			message: self.message().to_string(),
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::BadRequest { message } => write!(f, "Bad Request: {}", message),
			ApiError::NotFound { message } => write!(f, "Not Found: {}", message),
			ApiError::Conflict { message } => write!(f, "Conflict: {}", message),
			ApiError::PayloadTooLarge { message } => write!(f, "Payload Too Large: {}", message),
			ApiError::ServiceUnavailable { message } => {
				write!(f, "Service Unavailable: {}", message)
			},
		}
	}
}

impl std::error::Error for ApiError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		(status, Json(self.to_error_response())).into_response()
	}
}
