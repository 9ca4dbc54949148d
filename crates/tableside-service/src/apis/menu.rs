//! Menu endpoint.
//!
//! The menu is streamed as newline-delimited JSON. The first item is awaited
//! before the response starts so that an unreachable remote service still
//! gets a proper 503; a failure after that can only cut the body short.

use super::api_error;
use crate::server::AppState;
use axum::{
	body::Body,
	extract::State,
	http::header,
	response::{IntoResponse, Response},
	BoxError,
};
use bytes::Bytes;
use futures::{stream, StreamExt};
use tableside_types::{ApiError, MenuItem};

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Handles GET /api/orders/menu.
pub async fn list_menu_items(State(state): State<AppState>) -> Result<Response, ApiError> {
	let mut items = state.orders.list_menu_items();

	let first = match items.next().await {
		Some(Ok(item)) => Some(item),
		Some(Err(e)) => return Err(api_error(e)),
		None => None,
	};

	let lines = stream::iter(first.map(Ok))
		.chain(items)
		.map(|item| -> Result<Bytes, BoxError> {
			let item = item.inspect_err(|e| {
				tracing::warn!(error = %e, "Menu stream aborted");
			})?;
			encode_line(&item)
		});

	Ok(([(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)], Body::from_stream(lines)).into_response())
}

fn encode_line(item: &MenuItem) -> Result<Bytes, BoxError> {
	let mut line = serde_json::to_vec(item)?;
	line.push(b'\n');
	Ok(Bytes::from(line))
}
