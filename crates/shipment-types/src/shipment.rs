//! Shipment-side records: pickup locations, couriers and created shipments.

use crate::status::InternalStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a pickup address registered with the shipping provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickupLocation(pub String);

impl PickupLocation {
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	/// Location registered on behalf of a marketplace seller.
	pub fn for_seller(seller_id: &str) -> Self {
		Self(format!("Seller_{}", seller_id))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for PickupLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// A courier able to service a given shipment.
///
/// Fetched per shipment and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Courier {
	pub id: u64,
	pub name: String,
	pub rate: f64,
	pub estimated_delivery_days: Option<u32>,
	pub etd: Option<String>,
	pub rating: Option<f64>,
	pub cod_available: bool,
	pub recommended: bool,
}

impl Courier {
	/// A courier that reports both a rating and a delivery estimate.
	pub fn is_serviceable(&self) -> bool {
		self.rating.is_some() && self.estimated_delivery_days.is_some()
	}
}

/// Vendor-side record for one order's physical fulfilment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
	pub shiprocket_order_id: u64,
	pub shipment_id: u64,
	pub awb_number: Option<String>,
	pub courier_name: Option<String>,
	pub estimated_delivery: Option<String>,
}

impl Shipment {
	pub fn has_awb(&self) -> bool {
		self.awb_number.as_deref().is_some_and(|awb| !awb.is_empty())
	}

	/// Fold a successful courier assignment into the shipment record.
	pub fn apply_assignment(&mut self, assignment: &AwbAssignment) {
		self.awb_number = Some(assignment.awb_number.clone());
		self.courier_name = Some(assignment.courier_name.clone());
		if assignment.estimated_delivery.is_some() {
			self.estimated_delivery = assignment.estimated_delivery.clone();
		}
	}
}

/// Outcome of assigning a courier to a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwbAssignment {
	pub shipment_id: u64,
	pub awb_number: String,
	pub courier_id: u64,
	pub courier_name: String,
	pub estimated_delivery: Option<String>,
}

/// Point-in-time view of a shipment's tracking state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
	pub shipment_id: u64,
	pub awb_number: Option<String>,
	pub vendor_status: Option<String>,
	pub status: InternalStatus,
	pub track_url: Option<String>,
	pub etd: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn courier(rating: Option<f64>, days: Option<u32>) -> Courier {
		Courier {
			id: 1,
			name: "Delhivery".to_string(),
			rate: 80.0,
			estimated_delivery_days: days,
			etd: None,
			rating,
			cod_available: true,
			recommended: false,
		}
	}

	#[test]
	fn test_seller_pickup_location() {
		assert_eq!(PickupLocation::for_seller("S1").as_str(), "Seller_S1");
	}

	#[test]
	fn test_serviceable_requires_rating_and_estimate() {
		assert!(courier(Some(4.2), Some(3)).is_serviceable());
		assert!(!courier(None, Some(3)).is_serviceable());
		assert!(!courier(Some(4.2), None).is_serviceable());
	}

	#[test]
	fn test_apply_assignment() {
		let mut shipment = Shipment {
			shiprocket_order_id: 10,
			shipment_id: 20,
			awb_number: None,
			courier_name: None,
			estimated_delivery: Some("2026-10-21".to_string()),
		};
		assert!(!shipment.has_awb());

		shipment.apply_assignment(&AwbAssignment {
			shipment_id: 20,
			awb_number: "AWB123".to_string(),
			courier_id: 7,
			courier_name: "Xpressbees".to_string(),
			estimated_delivery: None,
		});

		assert!(shipment.has_awb());
		assert_eq!(shipment.courier_name.as_deref(), Some("Xpressbees"));
		assert_eq!(shipment.estimated_delivery.as_deref(), Some("2026-10-21"));
	}
}
