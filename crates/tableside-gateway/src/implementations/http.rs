//! HTTP client for the remote data service.
//!
//! Endpoints, relative to `base_url`:
//!
//! - `GET  /orders/active?tableId={id}`: the table's CREATED order, or 404
//! - `POST /orders`: creates an order, 200/201 on success, 404 for an unknown
//!   table or menu item, 409 when the table already has an active order
//! - `GET  /orders/{id}`: an order by id, or 404
//! - `GET  /menu`: newline-delimited JSON menu items, or a single JSON array
//!   when the response is `application/json`
//!
//! Every other status, transport failure or undecodable body becomes
//! [`GatewayError::Remote`]. 409 is only meaningful for creation; on a read it
//! is an unexpected answer like any other.

use crate::{GatewayError, GatewayInterface, MenuStream};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tableside_types::{
	http_url, ConfigSchema, Field, FieldType, MenuItem, Order, OrderId, OrderRequest, Schema,
	TableId, ValidationError,
};

/// What a call does, which decides how its status codes are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
	Read,
	Create,
}

/// Gateway speaking JSON over HTTP to the remote data service.
pub struct HttpGateway {
	client: Client,
	/// Base URL without trailing slash.
	base_url: String,
}

impl HttpGateway {
	pub fn new(client: Client, base_url: impl Into<String>) -> Self {
		let base_url = base_url.into().trim_end_matches('/').to_string();
		Self { client, base_url }
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	/// Turns a response into a decoded body or a classified error.
	async fn decode<T: DeserializeOwned>(
		kind: CallKind,
		response: Response,
	) -> Result<T, GatewayError> {
		let status = response.status();
		match status {
			StatusCode::OK | StatusCode::CREATED => response
				.json::<T>()
				.await
				.map_err(|e| GatewayError::Remote(format!("invalid response body: {}", e))),
			StatusCode::NOT_FOUND => Err(GatewayError::NotFound),
			StatusCode::CONFLICT if kind == CallKind::Create => {
				let detail = response.text().await.unwrap_or_default();
				Err(GatewayError::Conflict(if detail.is_empty() {
					"table already has an active order".to_string()
				} else {
					detail
				}))
			},
			other => {
				tracing::debug!(status = %other, ?kind, "Unexpected status from remote service");
				Err(GatewayError::Remote(format!("unexpected status {}", other)))
			},
		}
	}
}

fn transport_error(e: reqwest::Error) -> GatewayError {
	if e.is_timeout() {
		GatewayError::Remote(format!("request timed out: {}", e))
	} else {
		GatewayError::Remote(format!("request failed: {}", e))
	}
}

/// Parses one NDJSON line; blank lines yield `None`.
/// Longest menu line accepted from the remote service.
const MAX_MENU_LINE_BYTES: usize = 64 * 1024;

/// Splits a chunked body into newline-terminated lines.
///
/// Bytes already searched for a newline are not searched again.
struct LineSplitter {
	buffer: Vec<u8>,
	scanned: usize,
	max_line: usize,
}

impl LineSplitter {
	fn new(max_line: usize) -> Self {
		Self {
			buffer: Vec::new(),
			scanned: 0,
			max_line,
		}
	}

	fn push(&mut self, chunk: &[u8]) {
		self.buffer.extend_from_slice(chunk);
	}

	fn next_line(&mut self) -> Option<Vec<u8>> {
		match self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
			Some(offset) => {
				let line = self.buffer.drain(..=self.scanned + offset).collect();
				self.scanned = 0;
				Some(line)
			},
			None => {
				self.scanned = self.buffer.len();
				None
			},
		}
	}

	/// Fails once the unterminated tail outgrows the line limit.
	fn check_pending(&self) -> Result<(), GatewayError> {
		if self.buffer.len() > self.max_line {
			return Err(GatewayError::Remote(format!(
				"menu line exceeds {} bytes",
				self.max_line
			)));
		}
		Ok(())
	}

	fn remainder(&self) -> &[u8] {
		&self.buffer
	}
}

fn parse_menu_line(line: &[u8]) -> Option<Result<MenuItem, GatewayError>> {
	let line = line.trim_ascii();
	if line.is_empty() {
		return None;
	}
	Some(
		serde_json::from_slice::<MenuItem>(line)
			.map_err(|e| GatewayError::Remote(format!("invalid menu item: {}", e))),
	)
}

fn is_json_array(response: &Response) -> bool {
	response
		.headers()
		.get(CONTENT_TYPE)
		.and_then(|v| v.to_str().ok())
		.is_some_and(|v| v.starts_with("application/json"))
}

#[async_trait]
impl GatewayInterface for HttpGateway {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpGatewaySchema)
	}

	async fn find_active_order(&self, table_id: TableId) -> Result<Order, GatewayError> {
		let response = self
			.client
			.get(self.url("/orders/active"))
			.query(&[("tableId", table_id)])
			.send()
			.await
			.map_err(transport_error)?;
		Self::decode(CallKind::Read, response).await
	}

	async fn create_order(&self, request: &OrderRequest) -> Result<Order, GatewayError> {
		let response = self
			.client
			.post(self.url("/orders"))
			.json(request)
			.send()
			.await
			.map_err(transport_error)?;
		Self::decode(CallKind::Create, response).await
	}

	async fn get_order(&self, order_id: OrderId) -> Result<Order, GatewayError> {
		let response = self
			.client
			.get(self.url(&format!("/orders/{}", order_id)))
			.send()
			.await
			.map_err(transport_error)?;
		Self::decode(CallKind::Read, response).await
	}

	fn list_menu_items(&self) -> MenuStream {
		let request = self.client.get(self.url("/menu"));

		Box::pin(async_stream::stream! {
			let response = match request.send().await {
				Ok(response) => response,
				Err(e) => {
					yield Err(transport_error(e));
					return;
				},
			};
			if response.status() != StatusCode::OK {
				yield Err(GatewayError::Remote(format!(
					"unexpected status {}",
					response.status()
				)));
				return;
			}

			if is_json_array(&response) {
				match response.json::<Vec<MenuItem>>().await {
					Ok(items) => {
						for item in items {
							yield Ok(item);
						}
					},
					Err(e) => yield Err(GatewayError::Remote(format!("invalid menu: {}", e))),
				}
				return;
			}

			let mut body = response.bytes_stream();
			let mut lines = LineSplitter::new(MAX_MENU_LINE_BYTES);
			while let Some(chunk) = body.next().await {
				match chunk {
					Ok(chunk) => lines.push(&chunk),
					Err(e) => {
						yield Err(transport_error(e));
						return;
					},
				}
				while let Some(line) = lines.next_line() {
					match parse_menu_line(&line) {
						Some(Ok(item)) => yield Ok(item),
						Some(Err(e)) => {
							yield Err(e);
							return;
						},
						None => {},
					}
				}
				if let Err(e) = lines.check_pending() {
					yield Err(e);
					return;
				}
			}
			if let Some(last) = parse_menu_line(lines.remainder()) {
				yield last;
			}
		})
	}
}

/// Configuration schema for HttpGateway.
pub struct HttpGatewaySchema;

impl ConfigSchema for HttpGatewaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("base_url", FieldType::String).with_validator(http_url)],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new(
					"pool_max_idle_per_host",
					FieldType::Integer {
						min: Some(0),
						max: Some(1024),
					},
				),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HTTP gateway from configuration.
///
/// Configuration parameters:
/// - `base_url`: root of the remote data service API (required)
/// - `timeout_seconds`: per-request client timeout (default: 30)
/// - `pool_max_idle_per_host`: idle connections kept per host (default: 10)
pub fn create_gateway(config: &toml::Value) -> Result<Box<dyn GatewayInterface>, GatewayError> {
	HttpGatewaySchema
		.validate(config)
		.map_err(|e| GatewayError::Configuration(format!("Invalid http gateway config: {}", e)))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| GatewayError::Configuration("base_url is required".into()))?;
	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;
	let pool_max_idle = config
		.get("pool_max_idle_per_host")
		.and_then(|v| v.as_integer())
		.unwrap_or(10) as usize;

	let client = Client::builder()
		.pool_idle_timeout(Duration::from_secs(90))
		.pool_max_idle_per_host(pool_max_idle)
		.timeout(Duration::from_secs(timeout_seconds))
		.build()
		.map_err(|e| GatewayError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

	Ok(Box::new(HttpGateway::new(client, base_url)))
}

/// Registry for the HTTP gateway implementation.
pub struct Registry;

impl tableside_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = crate::GatewayFactory;

	fn factory() -> Self::Factory {
		create_gateway
	}
}

impl crate::GatewayRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		extract::{Path, Query},
		http::{header, StatusCode as AxumStatus},
		response::IntoResponse,
		routing::get,
		Json, Router,
	};
	use serde_json::{json, Value};
	use std::collections::HashMap;
	use tableside_types::{OrderLineRequest, OrderStatus};

	fn order_json(id: i64, table_id: i64) -> Value {
		json!({
			"id": id,
			"tableId": table_id,
			"status": "CREATED",
			"createdAt": "2025-03-01T18:30:00",
			"items": [{ "id": 1, "orderId": id, "menuId": 7, "quantity": 2 }]
		})
	}

	async fn active(Query(params): Query<HashMap<String, String>>) -> axum::response::Response {
		match params.get("tableId").map(String::as_str) {
			Some("42") => Json(order_json(100, 42)).into_response(),
			Some("13") => AxumStatus::CONFLICT.into_response(),
			Some("500") => AxumStatus::INTERNAL_SERVER_ERROR.into_response(),
			_ => AxumStatus::NOT_FOUND.into_response(),
		}
	}

	async fn create(Json(body): Json<Value>) -> axum::response::Response {
		match body["tableId"].as_i64() {
			Some(42) => (AxumStatus::CREATED, Json(order_json(101, 42))).into_response(),
			Some(7) => (AxumStatus::CONFLICT, "table 7 already has order 55").into_response(),
			Some(99) => AxumStatus::NOT_FOUND.into_response(),
			_ => AxumStatus::BAD_GATEWAY.into_response(),
		}
	}

	async fn by_id(Path(id): Path<i64>) -> axum::response::Response {
		match id {
			100 => Json(order_json(100, 42)).into_response(),
			666 => (AxumStatus::OK, "not json").into_response(),
			_ => AxumStatus::NOT_FOUND.into_response(),
		}
	}

	async fn ndjson_menu() -> axum::response::Response {
		(
			[(header::CONTENT_TYPE, "application/x-ndjson")],
			concat!(
				"{\"id\":1,\"name\":\"Pad Thai\",\"price\":45.00}\n",
				"\n",
				"{\"id\":2,\"name\":\"Tom Yum\",\"price\":\"60.50\",\"available\":false}\n",
				"{\"id\":3,\"name\":\"Green Curry\",\"price\":55}"
			),
		)
			.into_response()
	}

	async fn broken_menu() -> axum::response::Response {
		(
			[(header::CONTENT_TYPE, "application/x-ndjson")],
			"{\"id\":1,\"name\":\"Pad Thai\",\"price\":45.00}\n{garbage\n{\"id\":2,\"name\":\"x\",\"price\":1}\n",
		)
			.into_response()
	}

	async fn array_menu() -> axum::response::Response {
		Json(json!([
			{ "id": 1, "name": "Pad Thai", "price": "45.00" },
			{ "id": 2, "name": "Tom Yum", "price": "60.50" }
		]))
		.into_response()
	}

	/// Serves `router` on an ephemeral port and returns its base URL.
	async fn spawn(router: Router) -> String {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, router).await.unwrap();
		});
		format!("http://{}", addr)
	}

	async fn remote() -> HttpGateway {
		let router = Router::new()
			.route("/orders", axum::routing::post(create))
			.route("/orders/active", get(active))
			.route("/orders/{id}", get(by_id))
			.route("/menu", get(ndjson_menu));
		HttpGateway::new(Client::new(), spawn(router).await)
	}

	fn request(table_id: TableId) -> OrderRequest {
		OrderRequest::new(
			table_id,
			vec![OrderLineRequest {
				menu_id: 7,
				quantity: 2,
			}],
		)
	}

	#[tokio::test]
	async fn test_find_active_order_classification() {
		let gateway = remote().await;

		let order = gateway.find_active_order(42).await.unwrap();
		assert_eq!(order.id, 100);
		assert_eq!(order.status, OrderStatus::Created);

		assert!(matches!(
			gateway.find_active_order(1).await,
			Err(GatewayError::NotFound)
		));
		// 409 is not a conflict outside of creation
		assert!(matches!(
			gateway.find_active_order(13).await,
			Err(GatewayError::Remote(_))
		));
		assert!(matches!(
			gateway.find_active_order(500).await,
			Err(GatewayError::Remote(_))
		));
	}

	#[tokio::test]
	async fn test_create_order_classification() {
		let gateway = remote().await;

		let created = gateway.create_order(&request(42)).await.unwrap();
		assert_eq!(created.id, 101);
		assert_eq!(created.table_id, 42);

		match gateway.create_order(&request(7)).await {
			Err(GatewayError::Conflict(detail)) => assert!(detail.contains("order 55")),
			other => panic!("expected conflict, got {:?}", other),
		}
		assert!(matches!(
			gateway.create_order(&request(99)).await,
			Err(GatewayError::NotFound)
		));
		assert!(matches!(
			gateway.create_order(&request(1)).await,
			Err(GatewayError::Remote(_))
		));
	}

	#[tokio::test]
	async fn test_get_order_rejects_bad_body() {
		let gateway = remote().await;

		assert_eq!(gateway.get_order(100).await.unwrap().table_id, 42);
		assert!(matches!(
			gateway.get_order(5).await,
			Err(GatewayError::NotFound)
		));
		assert!(matches!(
			gateway.get_order(666).await,
			Err(GatewayError::Remote(_))
		));
	}

	#[tokio::test]
	async fn test_ndjson_menu() {
		let gateway = remote().await;
		let items: Vec<_> = gateway.list_menu_items().collect().await;

		assert_eq!(items.len(), 3);
		let names: Vec<_> = items
			.iter()
			.map(|i| i.as_ref().unwrap().name.clone())
			.collect();
		assert_eq!(names, vec!["Pad Thai", "Tom Yum", "Green Curry"]);
		assert!(!items[1].as_ref().unwrap().available);
	}

	#[tokio::test]
	async fn test_ndjson_menu_stops_at_bad_line() {
		let base = spawn(Router::new().route("/menu", get(broken_menu))).await;
		let gateway = HttpGateway::new(Client::new(), base);
		let items: Vec<_> = gateway.list_menu_items().collect().await;

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].as_ref().unwrap().id, 1);
		assert!(matches!(items[1], Err(GatewayError::Remote(_))));
	}

	#[test]
	fn test_line_splitter_across_chunks() {
		let mut lines = LineSplitter::new(64);

		lines.push(b"{\"id\":1");
		assert_eq!(lines.next_line(), None);
		lines.push(b"}\n{\"id\"");
		assert_eq!(lines.next_line().as_deref(), Some(&b"{\"id\":1}\n"[..]));
		assert_eq!(lines.next_line(), None);
		lines.push(b":2}\n\n{\"id\":3}");
		assert_eq!(lines.next_line().as_deref(), Some(&b"{\"id\":2}\n"[..]));
		assert_eq!(lines.next_line().as_deref(), Some(&b"\n"[..]));
		assert_eq!(lines.next_line(), None);
		assert_eq!(lines.remainder(), b"{\"id\":3}");
	}

	#[test]
	fn test_line_splitter_rejects_overlong_line() {
		let mut lines = LineSplitter::new(8);

		lines.push(b"0123");
		assert_eq!(lines.next_line(), None);
		assert!(lines.check_pending().is_ok());
		lines.push(b"456789");
		assert_eq!(lines.next_line(), None);
		assert!(matches!(
			lines.check_pending(),
			Err(GatewayError::Remote(_))
		));
	}

	async fn endless_menu_line() -> axum::response::Response {
		let chunks = futures::stream::iter((0..16).map(|_| Ok::<_, std::io::Error>(vec![b'x'; 16 * 1024])));
		(
			[(header::CONTENT_TYPE, "application/x-ndjson")],
			axum::body::Body::from_stream(chunks),
		)
			.into_response()
	}

	#[tokio::test]
	async fn test_overlong_menu_line_is_remote_error() {
		let base = spawn(Router::new().route("/menu", get(endless_menu_line))).await;
		let gateway = HttpGateway::new(Client::new(), base);
		let items: Vec<_> = gateway.list_menu_items().collect().await;

		assert_eq!(items.len(), 1);
		assert!(matches!(items[0], Err(GatewayError::Remote(_))));
	}

	#[tokio::test]
	async fn test_json_array_menu() {
		let base = spawn(Router::new().route("/menu", get(array_menu))).await;
		let gateway = HttpGateway::new(Client::new(), format!("{}/", base));
		let items: Vec<_> = gateway.list_menu_items().collect().await;

		assert_eq!(items.len(), 2);
		assert!(items.iter().all(|i| i.is_ok()));
	}

	#[tokio::test]
	async fn test_unreachable_remote_is_remote_error() {
		// Bind then drop to get a port nothing listens on.
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);

		let gateway = HttpGateway::new(Client::new(), format!("http://{}", addr));
		assert!(matches!(
			gateway.find_active_order(42).await,
			Err(GatewayError::Remote(_))
		));

		let items: Vec<_> = gateway.list_menu_items().collect().await;
		assert_eq!(items.len(), 1);
		assert!(items[0].is_err());
	}

	#[test]
	fn test_factory_validates_config() {
		let missing: toml::Value = toml::from_str("timeout_seconds = 5").unwrap();
		assert!(matches!(
			create_gateway(&missing),
			Err(GatewayError::Configuration(_))
		));

		let bad_scheme: toml::Value = toml::from_str("base_url = \"ftp://remote\"").unwrap();
		assert!(create_gateway(&bad_scheme).is_err());

		let valid: toml::Value =
			toml::from_str("base_url = \"http://localhost:8081/api\"\ntimeout_seconds = 3").unwrap();
		assert!(create_gateway(&valid).is_ok());
	}
}
