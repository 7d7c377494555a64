//! Request and response schemas for the Shiprocket REST API.
//!
//! Responses are decoded leniently: the provider omits fields freely and
//! sometimes sends numbers as strings, so everything optional is an `Option`
//! and shape validation happens where the data is converted into the
//! internal model.

use crate::shipment::Courier;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Serialize)]
pub struct LoginRequest {
	pub email: String,
	pub password: String,
}

impl fmt::Debug for LoginRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("LoginRequest")
			.field("email", &self.email)
			.field("password", &"<redacted>")
			.finish()
	}
}

#[derive(Clone, Deserialize)]
pub struct LoginResponse {
	#[serde(default)]
	pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PickupListResponse {
	#[serde(default)]
	pub data: Option<PickupListData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PickupListData {
	#[serde(default)]
	pub shipping_address: Vec<PickupAddressEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PickupAddressEntry {
	pub pickup_location: String,
	#[serde(default)]
	pub city: Option<String>,
	#[serde(default)]
	pub pin_code: Option<Value>,
}

/// Body of `POST /settings/company/addpickup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddPickupRequest {
	pub pickup_location: String,
	pub name: String,
	pub email: String,
	pub phone: String,
	pub address: String,
	#[serde(default)]
	pub address_2: String,
	pub city: String,
	pub state: String,
	pub country: String,
	pub pin_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemPayload {
	pub name: String,
	pub sku: String,
	pub units: u32,
	pub selling_price: String,
}

/// Body of `POST /orders/create/adhoc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateOrderRequest {
	pub order_id: String,
	pub order_date: String,
	pub pickup_location: String,
	pub billing_customer_name: String,
	pub billing_last_name: String,
	pub billing_address: String,
	pub billing_address_2: String,
	pub billing_city: String,
	pub billing_pincode: String,
	pub billing_state: String,
	pub billing_country: String,
	pub billing_email: String,
	pub billing_phone: String,
	pub shipping_is_billing: bool,
	pub order_items: Vec<OrderItemPayload>,
	pub payment_method: String,
	pub sub_total: f64,
	pub length: f64,
	pub breadth: f64,
	pub height: f64,
	pub weight: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
	#[serde(default, deserialize_with = "lenient_u64")]
	pub order_id: Option<u64>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub shipment_id: Option<u64>,
	#[serde(default)]
	pub status: Option<String>,
	#[serde(default)]
	pub awb_code: Option<String>,
	#[serde(default)]
	pub courier_name: Option<String>,
	#[serde(default)]
	pub etd: Option<String>,
}

/// Body of `POST /orders/cancel`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancelOrdersRequest {
	pub ids: Vec<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceabilityResponse {
	#[serde(default)]
	pub data: Option<ServiceabilityData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceabilityData {
	#[serde(default)]
	pub available_courier_companies: Vec<CourierCompany>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub recommended_courier_company_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourierCompany {
	#[serde(deserialize_with = "required_u64")]
	pub courier_company_id: u64,
	pub courier_name: String,
	#[serde(default, deserialize_with = "lenient_f64")]
	pub rate: Option<f64>,
	#[serde(default, deserialize_with = "lenient_f64")]
	pub freight_charge: Option<f64>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub estimated_delivery_days: Option<u64>,
	#[serde(default)]
	pub etd: Option<String>,
	#[serde(default, deserialize_with = "lenient_f64")]
	pub rating: Option<f64>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub cod: Option<u64>,
}

impl CourierCompany {
	/// Convert into the internal courier model.
	pub fn into_courier(self, recommended_id: Option<u64>) -> Courier {
		Courier {
			id: self.courier_company_id,
			recommended: recommended_id == Some(self.courier_company_id),
			name: self.courier_name,
			rate: self.rate.or(self.freight_charge).unwrap_or(0.0),
			estimated_delivery_days: self
				.estimated_delivery_days
				.and_then(|days| u32::try_from(days).ok()),
			etd: self.etd,
			rating: self.rating,
			cod_available: self.cod == Some(1),
		}
	}
}

/// Body of `POST /courier/assign/awb`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssignAwbRequest {
	pub shipment_id: u64,
	pub courier_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignAwbResponse {
	#[serde(default, deserialize_with = "lenient_u64")]
	pub awb_assign_status: Option<u64>,
	#[serde(default)]
	pub response: Option<AssignAwbEnvelope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignAwbEnvelope {
	#[serde(default)]
	pub data: Option<AssignAwbData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignAwbData {
	#[serde(default)]
	pub awb_code: Option<String>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub courier_company_id: Option<u64>,
	#[serde(default)]
	pub courier_name: Option<String>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub shipment_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingResponse {
	#[serde(default)]
	pub tracking_data: Option<TrackingData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingData {
	#[serde(default, deserialize_with = "lenient_u64")]
	pub track_status: Option<u64>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub shipment_status: Option<u64>,
	#[serde(default)]
	pub shipment_track: Vec<ShipmentTrack>,
	#[serde(default)]
	pub track_url: Option<String>,
	#[serde(default)]
	pub etd: Option<String>,
	#[serde(default)]
	pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShipmentTrack {
	#[serde(default)]
	pub awb_code: Option<String>,
	#[serde(default)]
	pub current_status: Option<String>,
	#[serde(default)]
	pub courier_name: Option<String>,
	#[serde(default)]
	pub edd: Option<String>,
}

/// Body of `POST /courier/generate/label`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateLabelRequest {
	pub shipment_id: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateLabelResponse {
	#[serde(default, deserialize_with = "lenient_u64")]
	pub label_created: Option<u64>,
	#[serde(default)]
	pub label_url: Option<String>,
	#[serde(default)]
	pub response: Option<String>,
	#[serde(default)]
	pub not_created: Vec<Value>,
}

/// Status update pushed by the provider's webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusWebhook {
	#[serde(default)]
	pub awb: Option<String>,
	#[serde(default)]
	pub courier_name: Option<String>,
	#[serde(default)]
	pub current_status: Option<String>,
	#[serde(default)]
	pub shipment_status: Option<String>,
	/// Marketplace order id the shipment was created with.
	#[serde(default)]
	pub order_id: Option<String>,
	#[serde(default, deserialize_with = "lenient_u64")]
	pub sr_order_id: Option<u64>,
	#[serde(default)]
	pub etd: Option<String>,
	#[serde(default)]
	pub current_timestamp: Option<String>,
}

impl StatusWebhook {
	/// Status string used for translation, preferring `current_status`.
	pub fn vendor_status(&self) -> Option<&str> {
		self.current_status
			.as_deref()
			.or(self.shipment_status.as_deref())
	}
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<Value>::deserialize(deserializer)?;
	Ok(match value {
		Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
		Some(Value::String(s)) => s.trim().parse().ok(),
		_ => None,
	})
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Option::<Value>::deserialize(deserializer)?;
	Ok(match value {
		Some(Value::Number(n)) => n.as_f64(),
		Some(Value::String(s)) => s.trim().parse().ok(),
		_ => None,
	})
}

fn required_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	lenient_u64(deserializer)?
		.ok_or_else(|| serde::de::Error::custom("expected a numeric identifier"))
}
