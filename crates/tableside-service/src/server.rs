//! HTTP server for the tableside order API.
//!
//! Routes live under `/api/orders`; handlers are in [`crate::apis`].

use crate::apis;
use axum::{
	extract::DefaultBodyLimit,
	http::{header, HeaderValue, Method},
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use tableside_config::ApiConfig;
use tableside_core::OrderService;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub orders: Arc<OrderService>,
}

/// Builds the router with all routes and middleware.
pub fn router(state: AppState, api_config: &ApiConfig) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(apis::order::create_order))
				.route("/orders/menu", get(apis::menu::list_menu_items))
				.route("/orders/table/{table_id}", get(apis::order::get_active_order))
				.route("/orders/{order_id}", get(apis::order::get_order)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(api_config))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

/// Permissive unless specific origins are configured.
fn cors_layer(api_config: &ApiConfig) -> CorsLayer {
	let Some(cors) = api_config
		.cors
		.as_ref()
		.filter(|c| !c.allowed_origins.is_empty() && !c.allowed_origins.iter().any(|o| o == "*"))
	else {
		return CorsLayer::permissive();
	};

	let origins: Vec<HeaderValue> = cors
		.allowed_origins
		.iter()
		.filter_map(|origin| match HeaderValue::from_str(origin) {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
				None
			},
		})
		.collect();

	CorsLayer::new()
		.allow_origin(origins)
		.allow_methods([Method::GET, Method::POST])
		.allow_headers([header::CONTENT_TYPE])
}

/// Starts the HTTP server and runs it until ctrl-c.
pub async fn start_server(
	api_config: ApiConfig,
	orders: Arc<OrderService>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(AppState { orders }, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Tableside API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "Failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
	tracing::info!("Shutdown signal received");
}
