//! Courier discovery, ranking and AWB assignment.

use crate::client::ShiprocketClient;
use serde_json::Value;
use shipment_config::CourierPolicy;
use shipment_types::wire::{AssignAwbRequest, AssignAwbResponse, ServiceabilityResponse};
use shipment_types::{AwbAssignment, Courier, Result, ShipmentError};
use std::cmp::Ordering;
use tracing::{debug, info, instrument, warn};

/// Higher rating first, then the cheaper rate.
fn rating_then_price(a: &Courier, b: &Courier) -> Ordering {
	let rating_a = a.rating.unwrap_or(f64::MIN);
	let rating_b = b.rating.unwrap_or(f64::MIN);
	rating_b
		.total_cmp(&rating_a)
		.then_with(|| a.rate.total_cmp(&b.rate))
}

/// Pick a courier for a shipment.
///
/// Only serviceable couriers are ranked. When none qualify the first
/// courier of the input is returned unchanged, so the result is `None` only
/// for an empty slice. Ties keep input order.
pub fn select_best_courier(couriers: &[Courier], policy: CourierPolicy) -> Option<Courier> {
	let first = couriers.first()?;

	if policy == CourierPolicy::RecommendedFirst {
		if let Some(recommended) = couriers.iter().find(|c| c.recommended) {
			return Some(recommended.clone());
		}
	}

	let best = couriers
		.iter()
		.filter(|c| c.is_serviceable())
		.min_by(|a, b| rating_then_price(a, b));

	match best {
		Some(courier) => Some(courier.clone()),
		None => {
			debug!(
				"No courier reports both rating and delivery estimate, using {}",
				first.name
			);
			Some(first.clone())
		}
	}
}

impl ShiprocketClient {
	/// Couriers able to service a created order.
	pub async fn get_available_couriers(&self, shiprocket_order_id: u64) -> Result<Vec<Courier>> {
		let path = format!("/courier/serviceability/?order_id={}", shiprocket_order_id);
		let options = self
			.options()
			.with_retries(self.settings().courier_fetch_retries);

		let raw: Value = self.get(&path, options).await?;
		let response: ServiceabilityResponse = match serde_json::from_value(raw) {
			Ok(response) => response,
			Err(e) => {
				warn!(
					"Malformed serviceability response for order {}: {}",
					shiprocket_order_id, e
				);
				return Err(no_couriers());
			}
		};

		let Some(data) = response.data else {
			return Err(no_couriers());
		};
		let recommended = data.recommended_courier_company_id;
		let couriers: Vec<Courier> = data
			.available_courier_companies
			.into_iter()
			.map(|company| company.into_courier(recommended))
			.collect();

		if couriers.is_empty() {
			return Err(no_couriers());
		}

		debug!(
			"{} couriers available for order {}",
			couriers.len(),
			shiprocket_order_id
		);
		Ok(couriers)
	}

	/// Assign a courier to a shipment, which issues the AWB.
	#[instrument(skip(self))]
	pub async fn assign_courier(&self, shipment_id: u64, courier_id: u64) -> Result<AwbAssignment> {
		let raw: Value = self
			.post(
				"/courier/assign/awb",
				&AssignAwbRequest {
					shipment_id,
					courier_id,
				},
				self.options(),
			)
			.await?;

		let response: AssignAwbResponse = serde_json::from_value(raw.clone())
			.map_err(|e| ShipmentError::Decode(format!("assign AWB response: {}", e)))?;

		let data = response.response.and_then(|envelope| envelope.data);
		let awb_code = data
			.as_ref()
			.and_then(|d| d.awb_code.clone())
			.filter(|awb| !awb.is_empty());

		match (response.awb_assign_status, awb_code) {
			(Some(1), Some(awb_number)) => {
				let data = data.unwrap_or_default();
				let assignment = AwbAssignment {
					shipment_id: data.shipment_id.unwrap_or(shipment_id),
					awb_number,
					courier_id: data.courier_company_id.unwrap_or(courier_id),
					courier_name: data.courier_name.unwrap_or_default(),
					estimated_delivery: None,
				};
				info!(
					"Assigned AWB {} via {} to shipment {}",
					assignment.awb_number, assignment.courier_name, shipment_id
				);
				Ok(assignment)
			}
			(status, _) => {
				warn!(
					"Courier {} assignment for shipment {} not confirmed (status {:?}): {}",
					courier_id, shipment_id, status, raw
				);
				let message = raw
					.get("message")
					.and_then(Value::as_str)
					.unwrap_or("AWB was not assigned")
					.to_string();
				Err(ShipmentError::AssignmentFailed {
					message,
					details: Some(raw),
				})
			}
		}
	}
}

fn no_couriers() -> ShipmentError {
	ShipmentError::NotFound("no couriers available".to_string())
}
