//! Error types for the shipment orchestration system.

use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShipmentError>;

#[derive(Error, Debug)]
pub enum ShipmentError {
	/// Credentials are missing; the client never left the disabled state.
	#[error("Configuration error: {0}")]
	Configuration(String),

	/// A previous login failed and the client was switched off for the
	/// remainder of the process.
	#[error("Shipping integration is disabled")]
	Disabled,

	#[error("Authentication error: {0}")]
	Authentication(String),

	#[error("Rate limited by shipping provider")]
	RateLimited { details: Option<Value> },

	#[error("Validation error: {message}")]
	Validation {
		message: String,
		details: Option<Value>,
	},

	#[error("Network error: {0}")]
	Network(String),

	#[error("Request timed out after {0}s")]
	Timeout(u64),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Shipping provider returned status {status}")]
	Vendor { status: u16, details: Option<Value> },

	#[error("Unexpected response: {0}")]
	Decode(String),

	#[error("Courier assignment failed: {message}")]
	AssignmentFailed {
		message: String,
		details: Option<Value>,
	},

	#[error("AWB not confirmed after {attempts} attempts")]
	AwbTimeout { attempts: u32 },
}

impl ShipmentError {
	/// Only transport-level failures are worth another attempt.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Network(_) | Self::Timeout(_))
	}

	/// Raw vendor payload attached to the error, if any.
	pub fn details(&self) -> Option<&Value> {
		match self {
			Self::RateLimited { details }
			| Self::Validation { details, .. }
			| Self::Vendor { details, .. }
			| Self::AssignmentFailed { details, .. } => details.as_ref(),
			_ => None,
		}
	}

	/// Stable machine-readable code used in API error bodies.
	pub fn code(&self) -> &'static str {
		match self {
			Self::Configuration(_) => "CONFIGURATION_ERROR",
			Self::Disabled => "SERVICE_DISABLED",
			Self::Authentication(_) => "AUTHENTICATION_ERROR",
			Self::RateLimited { .. } => "RATE_LIMITED",
			Self::Validation { .. } => "VALIDATION_ERROR",
			Self::Network(_) | Self::Timeout(_) => "NETWORK_ERROR",
			Self::NotFound(_) => "NOT_FOUND",
			Self::Vendor { .. } => "VENDOR_ERROR",
			Self::Decode(_) => "DECODE_ERROR",
			Self::AssignmentFailed { .. } => "ASSIGNMENT_FAILED",
			Self::AwbTimeout { .. } => "AWB_TIMEOUT",
		}
	}
}
