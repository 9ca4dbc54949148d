//! Order endpoints.

use super::{api_error, json_rejection, path_rejection};
use crate::server::AppState;
use axum::{
	extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
	http::StatusCode,
	response::Json,
};
use tableside_types::{ApiError, Order, OrderId, OrderRequest, TableId};

/// Handles GET /api/orders/table/{tableId}.
pub async fn get_active_order(
	State(state): State<AppState>,
	table_id: Result<Path<TableId>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
	let Path(table_id) = table_id.map_err(path_rejection)?;
	let order = state
		.orders
		.get_active_order(table_id)
		.await
		.map_err(api_error)?;
	Ok(Json(order))
}

/// Handles POST /api/orders.
pub async fn create_order(
	State(state): State<AppState>,
	request: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
	let Json(request) = request.map_err(json_rejection)?;
	let order = state
		.orders
		.create_order(request)
		.await
		.map_err(api_error)?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/orders/{orderId}.
pub async fn get_order(
	State(state): State<AppState>,
	order_id: Result<Path<OrderId>, PathRejection>,
) -> Result<Json<Order>, ApiError> {
	let Path(order_id) = order_id.map_err(path_rejection)?;
	let order = state.orders.get_order(order_id).await.map_err(api_error)?;
	Ok(Json(order))
}
