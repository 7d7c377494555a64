//! Order fulfilment: shipment creation, courier assignment, seller pickup
//! registration and status updates.

use crate::store::{OrderStore, ShipmentRecord, StatusRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shipment_client::ShiprocketClient;
use shipment_types::wire::{AddPickupRequest, StatusWebhook};
use shipment_types::{
	translate_status, InternalStatus, PickupLocation, Result, Shipment, ShipmentError,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of shipping one order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipOutcome {
	pub order_id: String,
	pub shipment: Shipment,
	/// Set when the shipment exists but no courier could be assigned
	pub assignment_error: Option<String>,
}

/// Result of applying one webhook status event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateOutcome {
	pub order_id: String,
	pub status: InternalStatus,
	pub previous: Option<InternalStatus>,
	pub regression: bool,
}

/// Pickup address a seller ships from.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerPickupAddress {
	pub name: String,
	pub email: String,
	pub phone: String,
	pub address: String,
	#[serde(default)]
	pub address_2: Option<String>,
	pub city: String,
	pub state: String,
	#[serde(default)]
	pub country: Option<String>,
	pub pin_code: String,
}

/// Result of registering a seller's pickup address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerPickupOutcome {
	pub seller_id: String,
	pub pickup_location: PickupLocation,
	pub response: Value,
}

/// Drives orders through the shipping provider and records the results.
pub struct Fulfillment {
	client: Arc<ShiprocketClient>,
	store: Arc<dyn OrderStore>,
}

impl Fulfillment {
	pub fn new(client: Arc<ShiprocketClient>, store: Arc<dyn OrderStore>) -> Self {
		Self { client, store }
	}

	pub fn client(&self) -> &Arc<ShiprocketClient> {
		&self.client
	}

	pub fn store(&self) -> &Arc<dyn OrderStore> {
		&self.store
	}

	/// Create the shipment for an order and try to get it an AWB.
	///
	/// The shipment is written back as soon as it exists, so a failed
	/// courier assignment leaves the order with a shipment and no AWB.
	/// Orders that already carry an AWB are returned unchanged. A stored
	/// shipment without one only gets the courier assignment retried.
	#[instrument(skip(self))]
	pub async fn ship_order(&self, order_id: &str) -> Result<ShipOutcome> {
		let stored = self
			.store
			.get_order(order_id)
			.await?
			.ok_or_else(|| ShipmentError::NotFound(format!("order {}", order_id)))?;

		let mut shipment = match &stored.shipment {
			Some(existing) if existing.awb_number.is_some() => {
				info!(
					"Order {} already has shipment {}, not creating another",
					order_id, existing.shipment_id
				);
				return Ok(ShipOutcome {
					order_id: order_id.to_string(),
					shipment: existing.to_shipment(),
					assignment_error: None,
				});
			}
			Some(existing) => {
				info!(
					"Order {} has shipment {} without AWB, retrying assignment",
					order_id, existing.shipment_id
				);
				existing.to_shipment()
			}
			None => {
				let shipment = self.client.create_shipment(&stored.order).await?;
				self.store
					.record_shipment(order_id, ShipmentRecord::from_shipment(&shipment))
					.await?;
				shipment
			}
		};

		let assignment_error = if shipment.has_awb() {
			None
		} else {
			match self
				.client
				.auto_assign_courier_and_generate_awb(shipment.shiprocket_order_id, shipment.shipment_id)
				.await
			{
				Ok(assignment) => {
					shipment.apply_assignment(&assignment);
					self.store
						.record_shipment(order_id, ShipmentRecord::from_shipment(&shipment))
						.await?;
					None
				}
				Err(e) => {
					warn!(
						"Shipment {} for order {} created without AWB: {}",
						shipment.shipment_id, order_id, e
					);
					Some(e.to_string())
				}
			}
		};

		info!(
			"Order {} shipped as {} (AWB {:?})",
			order_id, shipment.shipment_id, shipment.awb_number
		);
		Ok(ShipOutcome {
			order_id: order_id.to_string(),
			shipment,
			assignment_error,
		})
	}

	/// Register the pickup address later orders of this seller ship from.
	#[instrument(skip(self, address))]
	pub async fn register_seller_pickup(
		&self,
		seller_id: &str,
		address: SellerPickupAddress,
	) -> Result<SellerPickupOutcome> {
		if seller_id.trim().is_empty() {
			return Err(ShipmentError::Validation {
				message: "seller id must not be empty".to_string(),
				details: None,
			});
		}

		let location = PickupLocation::for_seller(seller_id);
		let request = AddPickupRequest {
			pickup_location: location.as_str().to_string(),
			name: address.name,
			email: address.email,
			phone: address.phone,
			address: address.address,
			address_2: address.address_2.unwrap_or_default(),
			city: address.city,
			state: address.state,
			country: address
				.country
				.unwrap_or_else(|| self.client.settings().default_country.clone()),
			pin_code: address.pin_code,
		};

		let response = self.client.register_pickup_location(&request).await?;
		info!("Registered pickup location {} for seller {}", location, seller_id);
		Ok(SellerPickupOutcome {
			seller_id: seller_id.to_string(),
			pickup_location: location,
			response,
		})
	}

	/// Cancel the provider order behind a shipped order.
	pub async fn cancel_order(&self, order_id: &str) -> Result<Value> {
		let stored = self
			.store
			.get_order(order_id)
			.await?
			.ok_or_else(|| ShipmentError::NotFound(format!("order {}", order_id)))?;
		let shipment = stored.shipment.ok_or_else(|| ShipmentError::Validation {
			message: format!("order {} has no shipment to cancel", order_id),
			details: None,
		})?;

		self.client
			.cancel_shipment(&[shipment.shiprocket_order_id])
			.await
	}

	/// Translate and persist a status event.
	///
	/// The provider's latest event always wins. Moving back to an earlier
	/// stage is logged but still recorded.
	#[instrument(skip(self, update), fields(awb = ?update.awb))]
	pub async fn apply_status_update(&self, update: &StatusWebhook) -> Result<StatusUpdateOutcome> {
		let order_id = self.resolve_order(update).await?;
		let stored = self
			.store
			.get_order(&order_id)
			.await?
			.ok_or_else(|| ShipmentError::NotFound(format!("order {}", order_id)))?;

		let status = translate_status(update.vendor_status());
		let previous = stored.delivery.as_ref().map(|d| d.status);
		let regression = previous.is_some_and(|p| p.is_regression_to(status));

		if regression {
			warn!(
				"Order {} moved back from {} to {} ({:?})",
				order_id,
				previous.unwrap_or_default(),
				status,
				update.vendor_status()
			);
		}

		self.store
			.record_status(
				&order_id,
				StatusRecord {
					status,
					vendor_status: update.vendor_status().map(str::to_string),
					awb_number: update.awb.clone(),
					updated_at: Utc::now(),
				},
			)
			.await?;

		info!("Order {} is now {}", order_id, status);
		Ok(StatusUpdateOutcome {
			order_id,
			status,
			previous,
			regression,
		})
	}

	/// Match an event to an order by its order id, falling back to the AWB.
	async fn resolve_order(&self, update: &StatusWebhook) -> Result<String> {
		if let Some(order_id) = update.order_id.as_deref().filter(|id| !id.is_empty()) {
			if self.store.get_order(order_id).await?.is_some() {
				return Ok(order_id.to_string());
			}
		}

		if let Some(awb) = update.awb.as_deref().filter(|awb| !awb.is_empty()) {
			if let Some(order_id) = self.store.find_by_awb(awb).await? {
				return Ok(order_id);
			}
		}

		Err(ShipmentError::NotFound(format!(
			"no order for status update (order {:?}, awb {:?})",
			update.order_id, update.awb
		)))
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::store::tests::order;
	use crate::store::InMemoryOrderStore;
	use serde_json::json;
	use shipment_config::ShiprocketSettings;
	use wiremock::matchers::{body_partial_json, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	pub(crate) fn settings_for(server: &MockServer) -> ShiprocketSettings {
		ShiprocketSettings {
			email: Some("ops@example.com".to_string()),
			password: Some("secret".to_string()),
			base_url: server.uri(),
			webhook_secret: Some("whsec-test".to_string()),
			initial_backoff_ms: 10,
			assignment_delay_ms: 0,
			awb_poll_delay_ms: 10,
			..Default::default()
		}
	}

	pub(crate) async fn mount_shipping_flow(server: &MockServer, assign_status: u64) {
		Mock::given(method("POST"))
			.and(path("/auth/login"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
			.mount(server)
			.await;
		Mock::given(method("POST"))
			.and(path("/orders/create/adhoc"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"order_id": 5501,
				"shipment_id": 7702,
				"status": "NEW"
			})))
			.mount(server)
			.await;
		Mock::given(method("GET"))
			.and(path("/courier/serviceability/"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"data": {"available_courier_companies": [
					{"courier_company_id": 51, "courier_name": "Delhivery", "rate": 70.0,
					 "estimated_delivery_days": 4, "rating": 4.5, "cod": 1}
				]}
			})))
			.mount(server)
			.await;
		Mock::given(method("POST"))
			.and(path("/courier/assign/awb"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"awb_assign_status": assign_status,
				"response": {"data": {"awb_code": "AWB123456", "courier_name": "Delhivery"}}
			})))
			.mount(server)
			.await;
	}

	async fn fulfillment(server: &MockServer) -> (Fulfillment, Arc<InMemoryOrderStore>) {
		let store = Arc::new(InMemoryOrderStore::new());
		store.put_order(order("ORD-001")).await.unwrap();
		let client = Arc::new(ShiprocketClient::new(settings_for(server)).unwrap());
		(Fulfillment::new(client, store.clone()), store)
	}

	fn webhook(status: &str) -> StatusWebhook {
		serde_json::from_value(json!({"awb": "AWB123456", "current_status": status})).unwrap()
	}

	#[tokio::test]
	async fn test_ship_order_writes_back_awb() {
		let server = MockServer::start().await;
		mount_shipping_flow(&server, 1).await;
		let (fulfillment, store) = fulfillment(&server).await;

		let outcome = fulfillment.ship_order("ORD-001").await.unwrap();
		assert_eq!(outcome.shipment.awb_number.as_deref(), Some("AWB123456"));
		assert!(outcome.assignment_error.is_none());

		let record = store.get_order("ORD-001").await.unwrap().unwrap().shipment.unwrap();
		assert_eq!(record.shipment_id, 7702);
		assert_eq!(record.awb_number.as_deref(), Some("AWB123456"));
		assert_eq!(record.courier_name.as_deref(), Some("Delhivery"));
	}

	#[tokio::test]
	async fn test_failed_assignment_keeps_shipment() {
		let server = MockServer::start().await;
		mount_shipping_flow(&server, 0).await;
		let (fulfillment, store) = fulfillment(&server).await;

		let outcome = fulfillment.ship_order("ORD-001").await.unwrap();
		assert!(outcome.assignment_error.is_some());

		let record = store.get_order("ORD-001").await.unwrap().unwrap().shipment.unwrap();
		assert_eq!(record.shipment_id, 7702);
		assert!(record.awb_number.is_none());
	}

	#[tokio::test]
	async fn test_ship_order_not_repeated() {
		let server = MockServer::start().await;
		mount_shipping_flow(&server, 1).await;
		let (fulfillment, _) = fulfillment(&server).await;

		fulfillment.ship_order("ORD-001").await.unwrap();
		let again = fulfillment.ship_order("ORD-001").await.unwrap();
		assert_eq!(again.shipment.shipment_id, 7702);

		let creates = server
			.received_requests()
			.await
			.unwrap()
			.into_iter()
			.filter(|r| r.url.path() == "/orders/create/adhoc")
			.count();
		assert_eq!(creates, 1);
	}

	#[tokio::test]
	async fn test_assignment_retried_for_existing_shipment() {
		let server = MockServer::start().await;
		mount_shipping_flow(&server, 0).await;
		let (fulfillment, store) = fulfillment(&server).await;

		let first = fulfillment.ship_order("ORD-001").await.unwrap();
		assert!(first.assignment_error.is_some());

		server.reset().await;
		mount_shipping_flow(&server, 1).await;

		let second = fulfillment.ship_order("ORD-001").await.unwrap();
		assert!(second.assignment_error.is_none());
		assert_eq!(second.shipment.shipment_id, 7702);
		assert_eq!(second.shipment.awb_number.as_deref(), Some("AWB123456"));

		let requests = server.received_requests().await.unwrap();
		let count = |p: &str| requests.iter().filter(|r| r.url.path() == p).count();
		assert_eq!(count("/orders/create/adhoc"), 0);
		assert_eq!(count("/courier/assign/awb"), 1);

		let record = store.get_order("ORD-001").await.unwrap().unwrap().shipment.unwrap();
		assert_eq!(record.awb_number.as_deref(), Some("AWB123456"));
	}

	fn pickup_address() -> SellerPickupAddress {
		serde_json::from_value(json!({
			"name": "Kavya Stores",
			"email": "kavya@example.com",
			"phone": "9000000000",
			"address": "44 Residency Road",
			"city": "Bengaluru",
			"state": "Karnataka",
			"pinCode": "560001"
		}))
		.unwrap()
	}

	#[tokio::test]
	async fn test_seller_pickup_registered_under_seller_name() {
		let server = MockServer::start().await;
		mount_shipping_flow(&server, 1).await;
		Mock::given(method("POST"))
			.and(path("/settings/company/addpickup"))
			.and(body_partial_json(json!({
				"pickup_location": "Seller_S9",
				"country": "India",
				"address_2": ""
			})))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
			.expect(1)
			.mount(&server)
			.await;
		let (fulfillment, _) = fulfillment(&server).await;

		let outcome = fulfillment
			.register_seller_pickup("S9", pickup_address())
			.await
			.unwrap();
		assert_eq!(outcome.pickup_location.as_str(), "Seller_S9");
		assert_eq!(outcome.response["success"], true);
	}

	#[tokio::test]
	async fn test_seller_pickup_needs_seller_id() {
		let server = MockServer::start().await;
		let (fulfillment, _) = fulfillment(&server).await;
		assert!(matches!(
			fulfillment.register_seller_pickup(" ", pickup_address()).await,
			Err(ShipmentError::Validation { .. })
		));
	}

	#[tokio::test]
	async fn test_unknown_order() {
		let server = MockServer::start().await;
		let (fulfillment, _) = fulfillment(&server).await;
		assert!(matches!(
			fulfillment.ship_order("ORD-404").await,
			Err(ShipmentError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_status_regression_recorded() {
		let server = MockServer::start().await;
		mount_shipping_flow(&server, 1).await;
		let (fulfillment, store) = fulfillment(&server).await;
		fulfillment.ship_order("ORD-001").await.unwrap();

		let delivered = fulfillment
			.apply_status_update(&webhook("DELIVERED"))
			.await
			.unwrap();
		assert_eq!(delivered.order_id, "ORD-001");
		assert!(!delivered.regression);

		let back = fulfillment
			.apply_status_update(&webhook("in_transit"))
			.await
			.unwrap();
		assert!(back.regression);
		assert_eq!(back.previous, Some(InternalStatus::Delivered));

		let stored = store.get_order("ORD-001").await.unwrap().unwrap();
		assert_eq!(stored.delivery.unwrap().status, InternalStatus::Shipping);
	}

	#[tokio::test]
	async fn test_status_for_unknown_awb() {
		let server = MockServer::start().await;
		let (fulfillment, _) = fulfillment(&server).await;
		assert!(matches!(
			fulfillment.apply_status_update(&webhook("DELIVERED")).await,
			Err(ShipmentError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_cancel_requires_shipment() {
		let server = MockServer::start().await;
		let (fulfillment, _) = fulfillment(&server).await;
		assert!(matches!(
			fulfillment.cancel_order("ORD-001").await,
			Err(ShipmentError::Validation { .. })
		));
	}
}
