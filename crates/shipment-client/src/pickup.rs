//! Pickup location lookup and registration.

use crate::client::ShiprocketClient;
use serde_json::Value;
use shipment_types::wire::{AddPickupRequest, PickupListResponse};
use shipment_types::{PickupLocation, Result};
use tracing::{debug, info, warn};

impl ShiprocketClient {
	/// Pickup locations registered on the account, in provider order.
	pub async fn list_pickup_locations(&self) -> Result<Vec<PickupLocation>> {
		let response: PickupListResponse = self
			.get("/settings/company/pickup", self.options())
			.await?;

		Ok(response
			.data
			.map(|data| {
				data.shipping_address
					.into_iter()
					.map(|entry| PickupLocation::new(entry.pickup_location))
					.collect()
			})
			.unwrap_or_default())
	}

	/// Pick the origin for a shipment.
	///
	/// A seller gets their own `Seller_<id>` location. Without a seller the
	/// first registered location is used, and the configured default covers
	/// an empty or failed lookup.
	pub async fn resolve_pickup_location(&self, seller_id: Option<&str>) -> PickupLocation {
		if let Some(seller_id) = seller_id.filter(|id| !id.trim().is_empty()) {
			return PickupLocation::for_seller(seller_id);
		}

		match self.list_pickup_locations().await {
			Ok(locations) => match locations.into_iter().next() {
				Some(location) => {
					debug!("Using registered pickup location {}", location);
					location
				}
				None => {
					warn!(
						"No pickup locations registered, falling back to {}",
						self.settings().default_pickup_location
					);
					self.default_pickup_location()
				}
			},
			Err(e) => {
				warn!(
					"Pickup location lookup failed ({}), falling back to {}",
					e,
					self.settings().default_pickup_location
				);
				self.default_pickup_location()
			}
		}
	}

	/// Register a new pickup address.
	pub async fn register_pickup_location(&self, request: &AddPickupRequest) -> Result<Value> {
		info!("Registering pickup location {}", request.pickup_location);
		self.post("/settings/company/addpickup", request, self.options())
			.await
	}

	fn default_pickup_location(&self) -> PickupLocation {
		PickupLocation::new(self.settings().default_pickup_location.clone())
	}
}
