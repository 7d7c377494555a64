//! HTTP API: order intake, fulfilment triggers and the provider webhook.

use crate::fulfillment::{Fulfillment, SellerPickupAddress};
use axum::{
	body::Bytes,
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Json, Response},
	routing::{get, post, put},
	Router,
};
use serde_json::{json, Value};
use shipment_client::{ShiprocketClient, WebhookPayload, WebhookVerifier, SIGNATURE_HEADER};
use shipment_types::wire::StatusWebhook;
use shipment_types::{Order, ShipmentError};
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub fulfillment: Arc<Fulfillment>,
	pub verifier: WebhookVerifier,
}

impl AppState {
	pub fn new(fulfillment: Arc<Fulfillment>, verifier: WebhookVerifier) -> Self {
		Self {
			fulfillment,
			verifier,
		}
	}

	fn client(&self) -> &ShiprocketClient {
		self.fulfillment.client()
	}
}

/// Error rendered as `{success: false, error, code, details}`.
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	message: String,
	code: &'static str,
	details: Option<Value>,
}

impl ApiError {
	fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
		Self {
			status,
			message: message.into(),
			code,
			details: None,
		}
	}
}

impl From<ShipmentError> for ApiError {
	fn from(err: ShipmentError) -> Self {
		let status = match &err {
			ShipmentError::Validation { .. } => StatusCode::BAD_REQUEST,
			ShipmentError::NotFound(_) => StatusCode::NOT_FOUND,
			ShipmentError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
			ShipmentError::Configuration(_) | ShipmentError::Disabled => {
				StatusCode::SERVICE_UNAVAILABLE
			}
			ShipmentError::Timeout(_) | ShipmentError::AwbTimeout { .. } => {
				StatusCode::GATEWAY_TIMEOUT
			}
			ShipmentError::Authentication(_)
			| ShipmentError::Network(_)
			| ShipmentError::Vendor { .. }
			| ShipmentError::Decode(_)
			| ShipmentError::AssignmentFailed { .. } => StatusCode::BAD_GATEWAY,
		};

		Self {
			status,
			message: err.to_string(),
			code: err.code(),
			details: err.details().cloned(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = json!({
			"success": false,
			"error": self.message,
			"code": self.code,
			"details": self.details,
		});
		(self.status, Json(body)).into_response()
	}
}

type ApiResult = Result<Json<Value>, ApiError>;

fn success(data: impl serde::Serialize) -> ApiResult {
	let data = serde_json::to_value(data).map_err(|e| {
		ApiError::new(
			StatusCode::INTERNAL_SERVER_ERROR,
			"SERIALIZATION_ERROR",
			e.to_string(),
		)
	})?;
	Ok(Json(json!({"success": true, "data": data})))
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health_check))
		.route("/api/orders/{id}", put(put_order).get(get_order))
		.route("/api/orders/{id}/shipment", post(ship_order))
		.route("/api/orders/{id}/cancel", post(cancel_order))
		.route("/api/sellers/{id}/pickup", post(register_seller_pickup))
		.route("/api/shipments/{id}/track", get(track_shipment))
		.route("/api/shipments/{id}/verify-awb", post(verify_awb))
		.route("/api/shipments/{id}/label", post(generate_label))
		.route("/api/webhooks/shiprocket", post(shiprocket_webhook))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Serve the API until `shutdown` resolves.
pub async fn serve(
	state: AppState,
	host: &str,
	port: u16,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
	let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
	info!("API server listening on {}:{}", host, port);

	axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown)
		.await?;
	Ok(())
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
	Json(json!({
		"status": "ok",
		"shippingEnabled": state.client().is_enabled(),
		"timestamp": chrono::Utc::now().timestamp(),
	}))
}

async fn put_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(order): Json<Order>,
) -> ApiResult {
	if order.id != id {
		return Err(ApiError::new(
			StatusCode::BAD_REQUEST,
			"VALIDATION_ERROR",
			format!("order id {} does not match path {}", order.id, id),
		));
	}

	state.fulfillment.store().put_order(order).await?;
	success(json!({"orderId": id}))
}

async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
	let stored = state
		.fulfillment
		.store()
		.get_order(&id)
		.await?
		.ok_or_else(|| ShipmentError::NotFound(format!("order {}", id)))?;
	success(stored)
}

async fn ship_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
	success(state.fulfillment.ship_order(&id).await?)
}

async fn cancel_order(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
	success(state.fulfillment.cancel_order(&id).await?)
}

async fn register_seller_pickup(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(address): Json<SellerPickupAddress>,
) -> ApiResult {
	success(state.fulfillment.register_seller_pickup(&id, address).await?)
}

async fn track_shipment(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
	success(state.client().track_shipment(id).await?)
}

async fn verify_awb(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
	success(state.client().verify_awb_generation_default(id).await?)
}

async fn generate_label(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult {
	success(state.client().generate_label(&[id]).await?)
}

/// Status updates pushed by the provider.
async fn shiprocket_webhook(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> ApiResult {
	let signature = headers
		.get(SIGNATURE_HEADER)
		.and_then(|value| value.to_str().ok());

	if !state.verifier.verify(WebhookPayload::Raw(&body), signature) {
		warn!("Rejected webhook with invalid signature");
		return Err(ApiError::new(
			StatusCode::UNAUTHORIZED,
			"INVALID_SIGNATURE",
			"invalid webhook signature",
		));
	}

	let update: StatusWebhook = serde_json::from_slice(&body).map_err(|e| {
		ApiError::new(
			StatusCode::BAD_REQUEST,
			"VALIDATION_ERROR",
			format!("invalid webhook payload: {}", e),
		)
	})?;

	success(state.fulfillment.apply_status_update(&update).await?)
}
