//! Internal delivery lifecycle and translation from provider statuses.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// The five delivery stages shown to buyers and sellers.
///
/// Stages are ordered, but nothing here enforces forward-only movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InternalStatus {
	#[default]
	Ordered,
	Packing,
	Shipping,
	OutForDelivery,
	Delivered,
}

impl InternalStatus {
	/// Position in the happy-path lifecycle, starting at 0.
	pub fn rank(&self) -> u8 {
		match self {
			InternalStatus::Ordered => 0,
			InternalStatus::Packing => 1,
			InternalStatus::Shipping => 2,
			InternalStatus::OutForDelivery => 3,
			InternalStatus::Delivered => 4,
		}
	}

	/// True when moving from `self` to `next` goes backwards.
	pub fn is_regression_to(&self, next: InternalStatus) -> bool {
		next.rank() < self.rank()
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			InternalStatus::Ordered => "ORDERED",
			InternalStatus::Packing => "PACKING",
			InternalStatus::Shipping => "SHIPPING",
			InternalStatus::OutForDelivery => "OUT_FOR_DELIVERY",
			InternalStatus::Delivered => "DELIVERED",
		}
	}
}

impl fmt::Display for InternalStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Map a provider status string onto the internal lifecycle.
///
/// Matching is case-insensitive. Missing or unknown statuses map to
/// [`InternalStatus::Ordered`].
pub fn translate_status(vendor_status: Option<&str>) -> InternalStatus {
	let Some(raw) = vendor_status else {
		warn!("Missing shipment status, defaulting to ORDERED");
		return InternalStatus::Ordered;
	};

	match raw.to_ascii_uppercase().as_str() {
		"NEW" | "PENDING" | "READY_TO_SHIP" => InternalStatus::Packing,
		"SHIPPED" | "IN_TRANSIT" | "PICKUP_SCHEDULED" | "PICKUP_COMPLETE" => {
			InternalStatus::Shipping
		}
		"OUT_FOR_DELIVERY" => InternalStatus::OutForDelivery,
		"DELIVERED" => InternalStatus::Delivered,
		_ => {
			warn!("Unrecognized shipment status '{}', defaulting to ORDERED", raw);
			InternalStatus::Ordered
		}
	}
}
