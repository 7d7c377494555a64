//! Configuration types for the shipment service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
	/// HTTP server and logging settings
	#[serde(default)]
	pub service: ServiceSettings,
	/// Shipping provider account and client behaviour
	#[serde(default)]
	pub shiprocket: ShiprocketSettings,
}

/// Service identity, listener and logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSettings {
	/// Service name used in logs
	pub name: String,
	/// Address the HTTP API binds to
	pub host: String,
	/// HTTP API port
	pub port: u16,
	/// Default log filter when `RUST_LOG` is not set
	pub log_level: String,
	/// Log output format
	pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

/// Which courier to pick among the serviceable ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CourierPolicy {
	/// Highest rating first, cheapest among equally rated.
	#[default]
	RatingThenPrice,
	/// The provider's recommended courier first, then rating and price.
	RecommendedFirst,
}

/// Shiprocket account and client tuning.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShiprocketSettings {
	/// Account email; the client stays disabled without it
	pub email: Option<String>,
	/// Account password; the client stays disabled without it
	pub password: Option<String>,
	/// External API base URL
	pub base_url: String,
	/// Shared secret for webhook signatures
	pub webhook_secret: Option<String>,
	/// Per-request timeout
	pub request_timeout_secs: u64,
	/// Attempts per request for transient failures
	pub max_retries: u32,
	/// First backoff delay; doubles on every further attempt
	pub initial_backoff_ms: u64,
	/// Lifetime assumed for a freshly issued token
	pub token_ttl_days: i64,
	/// Attempts when fetching serviceable couriers
	pub courier_fetch_retries: u32,
	/// Settle time between shipment creation and courier lookup
	pub assignment_delay_ms: u64,
	/// Tracking polls while waiting for an AWB
	pub awb_poll_attempts: u32,
	/// Delay between tracking polls
	pub awb_poll_delay_ms: u64,
	/// Pickup location used when nothing else resolves
	pub default_pickup_location: String,
	/// Billing state used when the order has none
	pub default_state: String,
	/// Billing country used when the order has none
	pub default_country: String,
	/// Courier selection policy
	pub courier_policy: CourierPolicy,
}

impl ShiprocketSettings {
	pub fn has_credentials(&self) -> bool {
		let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
		present(&self.email) && present(&self.password)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn initial_backoff(&self) -> Duration {
		Duration::from_millis(self.initial_backoff_ms)
	}

	pub fn assignment_delay(&self) -> Duration {
		Duration::from_millis(self.assignment_delay_ms)
	}

	pub fn awb_poll_delay(&self) -> Duration {
		Duration::from_millis(self.awb_poll_delay_ms)
	}
}

impl Default for ShiprocketSettings {
	fn default() -> Self {
		Self {
			email: None,
			password: None,
			base_url: "https://apiv2.shiprocket.in/v1/external".to_string(),
			webhook_secret: None,
			request_timeout_secs: 10,
			max_retries: 3,
			initial_backoff_ms: 1000,
			token_ttl_days: 9,
			courier_fetch_retries: 2,
			assignment_delay_ms: 3000,
			awb_poll_attempts: 5,
			awb_poll_delay_ms: 3000,
			default_pickup_location: "Primary".to_string(),
			default_state: "Maharashtra".to_string(),
			default_country: "India".to_string(),
			courier_policy: CourierPolicy::default(),
		}
	}
}

impl fmt::Debug for ShiprocketSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let redacted = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
		f.debug_struct("ShiprocketSettings")
			.field("email", &self.email)
			.field("password", &redacted(&self.password))
			.field("base_url", &self.base_url)
			.field("webhook_secret", &redacted(&self.webhook_secret))
			.field("request_timeout_secs", &self.request_timeout_secs)
			.field("max_retries", &self.max_retries)
			.field("initial_backoff_ms", &self.initial_backoff_ms)
			.field("token_ttl_days", &self.token_ttl_days)
			.field("courier_fetch_retries", &self.courier_fetch_retries)
			.field("assignment_delay_ms", &self.assignment_delay_ms)
			.field("awb_poll_attempts", &self.awb_poll_attempts)
			.field("awb_poll_delay_ms", &self.awb_poll_delay_ms)
			.field("default_pickup_location", &self.default_pickup_location)
			.field("courier_policy", &self.courier_policy)
			.finish()
	}
}

impl Default for ServiceSettings {
	fn default() -> Self {
		Self {
			name: "shipment-service".to_string(),
			host: "0.0.0.0".to_string(),
			port: 8080,
			log_level: "info".to_string(),
			log_format: LogFormat::Pretty,
		}
	}
}
