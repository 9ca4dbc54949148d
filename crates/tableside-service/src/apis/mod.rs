//! Request handlers for the order API.
//!
//! Handlers translate between HTTP and the order service. Every failure
//! leaves as an [`ApiError`]; remote failures are logged with their detail
//! and answered with a generic message.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use tableside_core::OrderError;
use tableside_types::ApiError;

pub mod menu;
pub mod order;

const REMOTE_UNAVAILABLE_MESSAGE: &str = "The order service is temporarily unavailable";

/// Maps an order service failure to its API error.
pub fn api_error(err: OrderError) -> ApiError {
	match err {
		OrderError::InvalidRequest(message) => ApiError::BadRequest { message },
		OrderError::NotFound(message) => ApiError::NotFound { message },
		OrderError::Conflict(message) => ApiError::Conflict { message },
		OrderError::RemoteFailure(detail) => {
			tracing::warn!(error = %detail, "Remote data service failure");
			ApiError::ServiceUnavailable {
				message: REMOTE_UNAVAILABLE_MESSAGE.to_string(),
			}
		},
	}
}

/// Malformed bodies are a bad request; the body limit keeps its own status.
pub fn json_rejection(rejection: JsonRejection) -> ApiError {
	let message = rejection.body_text();
	if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
		ApiError::PayloadTooLarge { message }
	} else {
		ApiError::BadRequest { message }
	}
}

pub fn path_rejection(rejection: PathRejection) -> ApiError {
	ApiError::BadRequest {
		message: rejection.body_text(),
	}
}
