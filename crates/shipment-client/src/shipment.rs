//! Shipment creation and cancellation.

use crate::client::ShiprocketClient;
use chrono::{DateTime, Utc};
use serde_json::Value;
use shipment_config::ShiprocketSettings;
use shipment_types::wire::{
	CancelOrdersRequest, CreateOrderRequest, CreateOrderResponse, OrderItemPayload,
};
use shipment_types::{Order, PackageDimensions, PickupLocation, Result, Shipment, ShipmentError};
use tracing::{info, instrument, warn};

/// Split a full name into first name and the remaining tokens.
pub fn split_name(full_name: &str) -> (String, String) {
	let mut tokens = full_name.split_whitespace();
	let first = tokens.next().unwrap_or_default().to_string();
	let rest = tokens.collect::<Vec<_>>().join(" ");
	(first, rest)
}

/// Map an internal order onto the provider's adhoc order schema.
pub fn build_shipment_request(
	order: &Order,
	pickup: &PickupLocation,
	settings: &ShiprocketSettings,
	order_date: DateTime<Utc>,
) -> CreateOrderRequest {
	let (first_name, last_name) = split_name(&order.customer_name);
	let address = &order.shipping_address;
	let package = PackageDimensions::default();

	let non_blank = |value: &Option<String>| {
		value
			.as_deref()
			.map(str::trim)
			.filter(|v| !v.is_empty())
			.map(str::to_string)
	};

	CreateOrderRequest {
		order_id: order.id.clone(),
		order_date: order_date.format("%Y-%m-%d %H:%M").to_string(),
		pickup_location: pickup.as_str().to_string(),
		billing_customer_name: first_name,
		billing_last_name: last_name,
		billing_address: address.line1.clone(),
		billing_address_2: address.line2.clone().unwrap_or_default(),
		billing_city: address.city.clone(),
		billing_pincode: address.pincode.clone(),
		billing_state: non_blank(&address.state).unwrap_or_else(|| settings.default_state.clone()),
		billing_country: non_blank(&address.country)
			.unwrap_or_else(|| settings.default_country.clone()),
		billing_email: order.customer_email.clone().unwrap_or_default(),
		billing_phone: order.customer_phone.clone(),
		shipping_is_billing: true,
		order_items: order
			.items
			.iter()
			.map(|item| OrderItemPayload {
				name: item.name.clone(),
				sku: item.sku_or_id().to_string(),
				units: item.quantity,
				selling_price: item.price.to_string(),
			})
			.collect(),
		payment_method: order.payment_method.as_vendor_str().to_string(),
		sub_total: order.total,
		length: package.length,
		breadth: package.breadth,
		height: package.height,
		weight: package.weight,
	}
}

impl ShiprocketClient {
	/// Create the provider-side shipment for an order.
	///
	/// The order id is sent as the provider's order reference, so repeating
	/// the call for the same order relies on the provider treating it as a
	/// duplicate.
	#[instrument(skip(self, order), fields(order_id = %order.id))]
	pub async fn create_shipment(&self, order: &Order) -> Result<Shipment> {
		if order.items.is_empty() {
			return Err(ShipmentError::Validation {
				message: format!("order {} has no items", order.id),
				details: None,
			});
		}

		let pickup = self
			.resolve_pickup_location(order.seller_id.as_deref())
			.await;
		let order_date = order.created_at.unwrap_or_else(Utc::now);
		let request = build_shipment_request(order, &pickup, self.settings(), order_date);

		info!(
			"Creating shipment for order {} from pickup location {}",
			order.id, pickup
		);

		let raw: Value = self
			.post(
				"/orders/create/adhoc",
				&request,
				self.options().for_order(order.id.clone()),
			)
			.await?;

		let response: CreateOrderResponse = serde_json::from_value(raw.clone())
			.map_err(|e| ShipmentError::Decode(format!("create order response: {}", e)))?;

		let (Some(shiprocket_order_id), Some(shipment_id)) =
			(response.order_id, response.shipment_id)
		else {
			warn!("Shiprocket did not return shipment identifiers: {}", raw);
			let message = raw
				.get("message")
				.and_then(Value::as_str)
				.unwrap_or("shipment was not created")
				.to_string();
			return Err(ShipmentError::Validation {
				message,
				details: Some(raw),
			});
		};

		let shipment = Shipment {
			shiprocket_order_id,
			shipment_id,
			awb_number: response.awb_code.filter(|awb| !awb.is_empty()),
			courier_name: response.courier_name.filter(|name| !name.is_empty()),
			estimated_delivery: response.etd,
		};

		info!(
			"Created Shiprocket order {} with shipment {} for order {}",
			shipment.shiprocket_order_id, shipment.shipment_id, order.id
		);
		Ok(shipment)
	}

	/// Cancel provider orders by their Shiprocket order ids.
	pub async fn cancel_shipment(&self, shiprocket_order_ids: &[u64]) -> Result<Value> {
		if shiprocket_order_ids.is_empty() {
			return Err(ShipmentError::Validation {
				message: "no orders to cancel".to_string(),
				details: None,
			});
		}

		info!("Cancelling Shiprocket orders {:?}", shiprocket_order_ids);
		self.post(
			"/orders/cancel",
			&CancelOrdersRequest {
				ids: shiprocket_order_ids.to_vec(),
			},
			self.options(),
		)
		.await
	}
}
