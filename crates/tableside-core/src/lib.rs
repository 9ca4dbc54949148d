//! Order orchestration core for the tableside ordering service.
//!
//! Sits between the HTTP boundary and the remote data gateway. It validates
//! incoming requests, resolves a table's current order, delegates creation to
//! the remote service and reduces every outcome to an [`OrderError`] kind the
//! boundary can map without knowing anything about transport.

use tableside_gateway::GatewayError;
use thiserror::Error;

pub mod builder;
pub mod guard;
pub mod lifecycle;
pub mod resolver;
pub mod service;

pub use builder::{BuilderError, OrderServiceBuilder};
pub use guard::{CreationGuard, CreationPermit};
pub use resolver::{OrderStateResolver, TableOrderState};
pub use service::{MenuItemStream, OrderService};

/// Outcome kinds surfaced to callers of [`OrderService`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
	/// The request is malformed; the remote service was not contacted.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// The table, order or a referenced menu item does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// The table already has an active order, or another creation for it is
	/// still in flight.
	#[error("Conflict: {0}")]
	Conflict(String),
	/// The remote service failed, timed out or answered with something that
	/// cannot be trusted.
	#[error("Remote service failure: {0}")]
	RemoteFailure(String),
}

impl From<GatewayError> for OrderError {
	fn from(err: GatewayError) -> Self {
		match err {
			GatewayError::NotFound => OrderError::NotFound("resource not found".into()),
			GatewayError::Conflict(detail) => OrderError::Conflict(detail),
			GatewayError::Remote(detail) => OrderError::RemoteFailure(detail),
			GatewayError::Configuration(detail) => OrderError::RemoteFailure(detail),
		}
	}
}
