//! Per-request lifecycle tracking.
//!
//! Every operation of the order service walks the same path:
//! Received -> Validating -> (Invalid | Delegating) -> outcome. The path is
//! checked against a static transition table and each step is logged at
//! debug level, so a request's progress can be followed in the logs.

use crate::OrderError;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Phase of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestPhase {
	Received,
	Validating,
	/// Rejected locally; terminal.
	Invalid,
	/// Waiting on the remote service.
	Delegating,
	Succeeded,
	NotFound,
	Conflict,
	RemoteFailure,
}

impl RequestPhase {
	pub fn is_terminal(self) -> bool {
		TRANSITIONS.get(&self).is_none_or(|next| next.is_empty())
	}

	/// Terminal phase corresponding to an operation result.
	pub fn outcome<T>(result: &Result<T, OrderError>) -> Self {
		match result {
			Ok(_) => RequestPhase::Succeeded,
			Err(OrderError::InvalidRequest(_)) => RequestPhase::Invalid,
			Err(OrderError::NotFound(_)) => RequestPhase::NotFound,
			Err(OrderError::Conflict(_)) => RequestPhase::Conflict,
			Err(OrderError::RemoteFailure(_)) => RequestPhase::RemoteFailure,
		}
	}
}

impl fmt::Display for RequestPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

// Static transition table - each phase maps to allowed next phases
static TRANSITIONS: Lazy<HashMap<RequestPhase, HashSet<RequestPhase>>> = Lazy::new(|| {
	use RequestPhase::*;

	let mut m = HashMap::new();
	m.insert(Received, HashSet::from([Validating]));
	m.insert(Validating, HashSet::from([Invalid, Delegating]));
	m.insert(
		Delegating,
		HashSet::from([Succeeded, NotFound, Conflict, RemoteFailure]),
	);
	for terminal in [Invalid, Succeeded, NotFound, Conflict, RemoteFailure] {
		m.insert(terminal, HashSet::new());
	}
	m
});

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid phase transition from {from} to {to}")]
pub struct InvalidTransition {
	pub from: RequestPhase,
	pub to: RequestPhase,
}

/// Tracks the phase of one request.
#[derive(Debug)]
pub struct RequestLifecycle {
	operation: &'static str,
	phase: RequestPhase,
	started: Instant,
}

impl RequestLifecycle {
	pub fn start(operation: &'static str) -> Self {
		tracing::debug!(operation, phase = %RequestPhase::Received, "Request received");
		Self {
			operation,
			phase: RequestPhase::Received,
			started: Instant::now(),
		}
	}

	pub fn phase(&self) -> RequestPhase {
		self.phase
	}

	/// Moves to `next` if the table allows it.
	pub fn advance(&mut self, next: RequestPhase) -> Result<(), InvalidTransition> {
		let allowed = TRANSITIONS
			.get(&self.phase)
			.is_some_and(|targets| targets.contains(&next));
		if !allowed {
			return Err(InvalidTransition {
				from: self.phase,
				to: next,
			});
		}

		tracing::debug!(
			operation = self.operation,
			from = %self.phase,
			to = %next,
			elapsed_ms = self.started.elapsed().as_millis() as u64,
			"Request phase changed"
		);
		self.phase = next;
		Ok(())
	}

	/// Like [`advance`](Self::advance), but an out-of-order transition is
	/// only logged.
	pub fn enter(&mut self, next: RequestPhase) {
		if let Err(e) = self.advance(next) {
			tracing::warn!(operation = self.operation, error = %e, "Unexpected request phase");
		}
	}

	/// Records the outcome of the operation and hands the result back.
	pub fn finish<T>(mut self, result: Result<T, OrderError>) -> Result<T, OrderError> {
		self.enter(RequestPhase::outcome(&result));
		result
	}
}
