//! Internal order model as handed over by the order controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment method chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
	#[serde(rename = "COD", alias = "cod")]
	Cod,
	#[serde(rename = "Prepaid", alias = "prepaid", alias = "PREPAID", alias = "online")]
	Prepaid,
}

impl PaymentMethod {
	/// Value expected by the shipping provider's `payment_method` field.
	pub fn as_vendor_str(&self) -> &'static str {
		match self {
			PaymentMethod::Cod => "COD",
			PaymentMethod::Prepaid => "Prepaid",
		}
	}
}

impl fmt::Display for PaymentMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_vendor_str())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
	#[serde(alias = "address")]
	pub line1: String,
	#[serde(default)]
	pub line2: Option<String>,
	pub city: String,
	pub pincode: String,
	#[serde(default)]
	pub state: Option<String>,
	#[serde(default)]
	pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
	pub name: String,
	#[serde(default)]
	pub sku: Option<String>,
	#[serde(default)]
	pub id: Option<String>,
	pub quantity: u32,
	pub price: f64,
}

impl OrderItem {
	/// SKU sent to the provider; falls back to the product id, then the name.
	pub fn sku_or_id(&self) -> &str {
		self.sku
			.as_deref()
			.or(self.id.as_deref())
			.unwrap_or(self.name.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	pub id: String,
	pub customer_name: String,
	#[serde(default)]
	pub customer_email: Option<String>,
	pub customer_phone: String,
	pub shipping_address: ShippingAddress,
	pub items: Vec<OrderItem>,
	pub total: f64,
	pub payment_method: PaymentMethod,
	#[serde(default)]
	pub seller_id: Option<String>,
	#[serde(default)]
	pub created_at: Option<DateTime<Utc>>,
}

/// Parcel dimensions sent with every shipment.
///
/// These are fixed and not derived from the items in the order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PackageDimensions {
	/// Centimetres
	pub length: f64,
	pub breadth: f64,
	pub height: f64,
	/// Kilograms
	pub weight: f64,
}

impl Default for PackageDimensions {
	fn default() -> Self {
		Self {
			length: 10.0,
			breadth: 10.0,
			height: 10.0,
			weight: 0.5,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_order_deserialization() {
		let order: Order = serde_json::from_value(json!({
			"id": "ORD-001",
			"customerName": "Asha Rao",
			"customerPhone": "9876543210",
			"shippingAddress": {
				"address": "12 MG Road",
				"city": "Pune",
				"pincode": "411001"
			},
			"items": [{"name": "Shirt", "sku": "SH1", "quantity": 2, "price": 500}],
			"total": 1000,
			"paymentMethod": "cod",
			"sellerId": "S1"
		}))
		.unwrap();

		assert_eq!(order.payment_method, PaymentMethod::Cod);
		assert_eq!(order.shipping_address.line1, "12 MG Road");
		assert!(order.shipping_address.state.is_none());
		assert_eq!(order.items[0].sku_or_id(), "SH1");
	}

	#[test]
	fn test_sku_falls_back_to_id() {
		let item = OrderItem {
			name: "Mug".to_string(),
			sku: None,
			id: Some("prod-9".to_string()),
			quantity: 1,
			price: 199.0,
		};
		assert_eq!(item.sku_or_id(), "prod-9");
	}
}
