//! Order storage seen by the fulfilment flow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shipment_types::{InternalStatus, Order, Result, Shipment, ShipmentError};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Shipment fields written back onto an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
	pub invoice_generated: bool,
	pub invoice_path: Option<String>,
	pub shiprocket_order_id: u64,
	pub shipment_id: u64,
	pub awb_number: Option<String>,
	pub courier_name: Option<String>,
	pub estimated_delivery: Option<String>,
	pub updated_at: DateTime<Utc>,
}

impl ShipmentRecord {
	pub fn from_shipment(shipment: &Shipment) -> Self {
		Self {
			invoice_generated: false,
			invoice_path: None,
			shiprocket_order_id: shipment.shiprocket_order_id,
			shipment_id: shipment.shipment_id,
			awb_number: shipment.awb_number.clone(),
			courier_name: shipment.courier_name.clone(),
			estimated_delivery: shipment.estimated_delivery.clone(),
			updated_at: Utc::now(),
		}
	}

	pub fn to_shipment(&self) -> Shipment {
		Shipment {
			shiprocket_order_id: self.shiprocket_order_id,
			shipment_id: self.shipment_id,
			awb_number: self.awb_number.clone(),
			courier_name: self.courier_name.clone(),
			estimated_delivery: self.estimated_delivery.clone(),
		}
	}
}

/// Latest delivery status reported for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
	pub status: InternalStatus,
	pub vendor_status: Option<String>,
	pub awb_number: Option<String>,
	pub updated_at: DateTime<Utc>,
}

/// An order together with its fulfilment state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredOrder {
	pub order: Order,
	pub shipment: Option<ShipmentRecord>,
	pub delivery: Option<StatusRecord>,
}

/// Storage backend trait
#[async_trait]
pub trait OrderStore: Send + Sync {
	async fn get_order(&self, order_id: &str) -> Result<Option<StoredOrder>>;

	/// Insert or replace an order, keeping any recorded fulfilment state.
	async fn put_order(&self, order: Order) -> Result<()>;

	/// Store shipment fields. Invoice fields already on the order are kept.
	async fn record_shipment(&self, order_id: &str, record: ShipmentRecord) -> Result<()>;

	async fn record_status(&self, order_id: &str, record: StatusRecord) -> Result<()>;

	/// Order id owning the given AWB.
	async fn find_by_awb(&self, awb_number: &str) -> Result<Option<String>>;
}

/// In-memory storage implementation
#[derive(Default)]
pub struct InMemoryOrderStore {
	orders: RwLock<HashMap<String, StoredOrder>>,
}

impl InMemoryOrderStore {
	pub fn new() -> Self {
		Self::default()
	}
}

fn unknown_order(order_id: &str) -> ShipmentError {
	ShipmentError::NotFound(format!("order {}", order_id))
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
	async fn get_order(&self, order_id: &str) -> Result<Option<StoredOrder>> {
		Ok(self.orders.read().await.get(order_id).cloned())
	}

	async fn put_order(&self, order: Order) -> Result<()> {
		let mut orders = self.orders.write().await;
		match orders.get_mut(&order.id) {
			Some(existing) => existing.order = order,
			None => {
				orders.insert(
					order.id.clone(),
					StoredOrder {
						order,
						shipment: None,
						delivery: None,
					},
				);
			}
		}
		Ok(())
	}

	async fn record_shipment(&self, order_id: &str, record: ShipmentRecord) -> Result<()> {
		let mut orders = self.orders.write().await;
		let entry = orders.get_mut(order_id).ok_or_else(|| unknown_order(order_id))?;
		let mut record = record;
		if let Some(previous) = &entry.shipment {
			record.invoice_generated = previous.invoice_generated;
			record.invoice_path = previous.invoice_path.clone();
		}
		entry.shipment = Some(record);
		Ok(())
	}

	async fn record_status(&self, order_id: &str, record: StatusRecord) -> Result<()> {
		let mut orders = self.orders.write().await;
		let entry = orders.get_mut(order_id).ok_or_else(|| unknown_order(order_id))?;
		entry.delivery = Some(record);
		Ok(())
	}

	async fn find_by_awb(&self, awb_number: &str) -> Result<Option<String>> {
		Ok(self
			.orders
			.read()
			.await
			.values()
			.find(|entry| {
				entry
					.shipment
					.as_ref()
					.and_then(|s| s.awb_number.as_deref())
					== Some(awb_number)
			})
			.map(|entry| entry.order.id.clone()))
	}
}
