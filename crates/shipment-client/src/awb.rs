//! AWB orchestration, tracking and shipping labels.

use crate::client::ShiprocketClient;
use crate::courier::select_best_courier;
use serde_json::Value;
use shipment_types::wire::{
	GenerateLabelRequest, GenerateLabelResponse, TrackingData, TrackingResponse,
};
use shipment_types::{translate_status, AwbAssignment, Result, ShipmentError, TrackingSnapshot};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

fn snapshot(shipment_id: u64, data: TrackingData) -> TrackingSnapshot {
	let latest = data.shipment_track.into_iter().next();
	let vendor_status = latest.as_ref().and_then(|t| t.current_status.clone());

	TrackingSnapshot {
		shipment_id,
		awb_number: latest
			.as_ref()
			.and_then(|t| t.awb_code.clone())
			.filter(|awb| !awb.is_empty()),
		status: translate_status(vendor_status.as_deref()),
		vendor_status,
		track_url: data.track_url,
		etd: data.etd.or_else(|| latest.and_then(|t| t.edd)),
	}
}

/// Errors that make further polling pointless.
fn is_terminal(err: &ShipmentError) -> bool {
	matches!(
		err,
		ShipmentError::Configuration(_)
			| ShipmentError::Disabled
			| ShipmentError::Authentication(_)
			| ShipmentError::RateLimited { .. }
	)
}

impl ShiprocketClient {
	/// Pick and assign a courier for a freshly created shipment.
	///
	/// Waits for the configured settle delay first, then fetches couriers,
	/// ranks them and assigns the winner, strictly in that order.
	#[instrument(skip(self))]
	pub async fn auto_assign_courier_and_generate_awb(
		&self,
		shiprocket_order_id: u64,
		shipment_id: u64,
	) -> Result<AwbAssignment> {
		let delay = self.settings().assignment_delay();
		if !delay.is_zero() {
			debug!("Waiting {:?} before courier lookup", delay);
			tokio::time::sleep(delay).await;
		}

		let couriers = self.get_available_couriers(shiprocket_order_id).await?;
		let courier = select_best_courier(&couriers, self.settings().courier_policy)
			.ok_or_else(|| ShipmentError::NotFound("no couriers available".to_string()))?;

		info!(
			"Selected courier {} ({}) at rate {} for shipment {}",
			courier.name, courier.id, courier.rate, shipment_id
		);

		let mut assignment = self.assign_courier(shipment_id, courier.id).await?;
		if assignment.courier_name.is_empty() {
			assignment.courier_name = courier.name.clone();
		}
		if assignment.estimated_delivery.is_none() {
			assignment.estimated_delivery = courier.etd.clone().or_else(|| {
				courier
					.estimated_delivery_days
					.map(|days| format!("{} days", days))
			});
		}
		Ok(assignment)
	}

	async fn fetch_tracking(&self, shipment_id: u64, retries: u32) -> Result<Option<TrackingData>> {
		let response: TrackingResponse = self
			.get(
				&format!("/courier/track/shipment/{}", shipment_id),
				self.options().with_retries(retries),
			)
			.await?;
		Ok(response.tracking_data.filter(|data| data.error.is_none()))
	}

	/// Current tracking state of a shipment.
	pub async fn track_shipment(&self, shipment_id: u64) -> Result<TrackingSnapshot> {
		let data = self
			.fetch_tracking(shipment_id, self.settings().max_retries)
			.await?
			.ok_or_else(|| {
				ShipmentError::NotFound(format!("no tracking data for shipment {}", shipment_id))
			})?;
		Ok(snapshot(shipment_id, data))
	}

	/// Poll tracking until the shipment shows up, at most `max_attempts` times.
	///
	/// Sleeps `delay` between polls but not after the last one.
	#[instrument(skip(self))]
	pub async fn verify_awb_generation(
		&self,
		shipment_id: u64,
		max_attempts: u32,
		delay: Duration,
	) -> Result<TrackingSnapshot> {
		let max_attempts = max_attempts.max(1);

		for attempt in 1..=max_attempts {
			match self.fetch_tracking(shipment_id, 1).await {
				Ok(Some(data)) => {
					let snapshot = snapshot(shipment_id, data);
					info!(
						"Tracking available for shipment {} after {} attempt(s), AWB {:?}",
						shipment_id, attempt, snapshot.awb_number
					);
					return Ok(snapshot);
				}
				Ok(None) => {
					debug!(
						"No tracking yet for shipment {} (attempt {}/{})",
						shipment_id, attempt, max_attempts
					);
				}
				Err(e) if is_terminal(&e) => return Err(e),
				Err(e) => {
					warn!(
						"Tracking poll for shipment {} failed (attempt {}/{}): {}",
						shipment_id, attempt, max_attempts, e
					);
				}
			}

			if attempt < max_attempts {
				tokio::time::sleep(delay).await;
			}
		}

		warn!(
			"AWB for shipment {} not confirmed after {} attempts",
			shipment_id, max_attempts
		);
		Err(ShipmentError::AwbTimeout {
			attempts: max_attempts,
		})
	}

	/// Poll with the configured attempt count and delay.
	pub async fn verify_awb_generation_default(&self, shipment_id: u64) -> Result<TrackingSnapshot> {
		self.verify_awb_generation(
			shipment_id,
			self.settings().awb_poll_attempts,
			self.settings().awb_poll_delay(),
		)
		.await
	}

	/// Generate the shipping label for one or more shipments.
	pub async fn generate_label(&self, shipment_ids: &[u64]) -> Result<GenerateLabelResponse> {
		if shipment_ids.is_empty() {
			return Err(ShipmentError::Validation {
				message: "no shipments to label".to_string(),
				details: None,
			});
		}

		let raw: Value = self
			.post(
				"/courier/generate/label",
				&GenerateLabelRequest {
					shipment_id: shipment_ids.to_vec(),
				},
				self.options(),
			)
			.await?;
		let response: GenerateLabelResponse = serde_json::from_value(raw.clone())
			.map_err(|e| ShipmentError::Decode(format!("generate label response: {}", e)))?;

		if response.label_created != Some(1) {
			warn!("Label not generated for shipments {:?}: {}", shipment_ids, raw);
			return Err(ShipmentError::Validation {
				message: response
					.response
					.clone()
					.unwrap_or_else(|| "label was not generated".to_string()),
				details: Some(raw),
			});
		}

		info!(
			"Generated label for shipments {:?}: {:?}",
			shipment_ids, response.label_url
		);
		Ok(response)
	}
}
