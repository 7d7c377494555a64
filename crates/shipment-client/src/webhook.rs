//! HMAC-SHA256 authentication of inbound status webhooks.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-shiprocket-signature";

/// Body whose signature is being checked.
#[derive(Debug, Clone, Copy)]
pub enum WebhookPayload<'a> {
	/// Bytes exactly as received on the wire.
	Raw(&'a [u8]),
	/// An already parsed body, re-serialized compactly before hashing.
	///
	/// Key order survives parsing, but whitespace and number formatting of
	/// the original bytes do not. Prefer `Raw` when the bytes are at hand.
	Json(&'a Value),
}

/// Verifies webhook signatures against the shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
	secret: Option<String>,
}

impl fmt::Debug for WebhookVerifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebhookVerifier")
			.field("configured", &self.is_configured())
			.finish()
	}
}

impl WebhookVerifier {
	pub fn new(secret: Option<String>) -> Self {
		Self {
			secret: secret.filter(|s| !s.is_empty()),
		}
	}

	pub fn is_configured(&self) -> bool {
		self.secret.is_some()
	}

	/// Lowercase hex HMAC-SHA256 of `body`, or `None` without a secret.
	pub fn sign(&self, body: &[u8]) -> Option<String> {
		let secret = self.secret.as_ref()?;
		let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
		mac.update(body);
		Some(hex::encode(mac.finalize().into_bytes()))
	}

	/// True only for an exact match against the expected signature.
	///
	/// A missing secret, missing signature, length mismatch or any encoding
	/// failure yields `false`.
	pub fn verify(&self, payload: WebhookPayload<'_>, signature: Option<&str>) -> bool {
		let Some(signature) = signature else {
			warn!("Webhook rejected: missing signature");
			return false;
		};
		if !self.is_configured() {
			warn!("Webhook rejected: no webhook secret configured");
			return false;
		}

		let encoded;
		let body = match payload {
			WebhookPayload::Raw(bytes) => bytes,
			WebhookPayload::Json(value) => match serde_json::to_vec(value) {
				Ok(bytes) => {
					encoded = bytes;
					encoded.as_slice()
				}
				Err(e) => {
					warn!("Webhook rejected: payload could not be serialized: {}", e);
					return false;
				}
			},
		};

		let Some(expected) = self.sign(body) else {
			return false;
		};

		// Slices of different length compare unequal without panicking
		let valid = bool::from(expected.as_bytes().ct_eq(signature.as_bytes()));
		if !valid {
			debug!("Webhook signature mismatch");
		}
		valid
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	const BODY: &[u8] = br#"{"awb":"AWB123456","current_status":"DELIVERED"}"#;

	fn verifier() -> WebhookVerifier {
		WebhookVerifier::new(Some("whsec-test".to_string()))
	}

	#[test]
	fn test_valid_signature_accepted() {
		let verifier = verifier();
		let signature = verifier.sign(BODY).unwrap();

		assert_eq!(signature.len(), 64);
		assert!(signature.chars().all(|c| !c.is_ascii_uppercase()));
		assert!(verifier.verify(WebhookPayload::Raw(BODY), Some(&signature)));
	}

	#[test]
	fn test_single_byte_payload_mutation_rejected() {
		let verifier = verifier();
		let signature = verifier.sign(BODY).unwrap();

		for i in 0..BODY.len() {
			let mut mutated = BODY.to_vec();
			mutated[i] ^= 0x01;
			assert!(
				!verifier.verify(WebhookPayload::Raw(&mutated), Some(&signature)),
				"byte {}",
				i
			);
		}
	}

	#[test]
	fn test_single_byte_signature_mutation_rejected() {
		let verifier = verifier();
		let signature = verifier.sign(BODY).unwrap();

		for i in 0..signature.len() {
			let mut mutated = signature.clone().into_bytes();
			mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
			let mutated = String::from_utf8(mutated).unwrap();
			assert!(!verifier.verify(WebhookPayload::Raw(BODY), Some(&mutated)));
		}
	}

	#[test]
	fn test_length_mismatch_rejected() {
		let verifier = verifier();
		let signature = verifier.sign(BODY).unwrap();

		assert!(!verifier.verify(WebhookPayload::Raw(BODY), Some(&signature[..63])));
		assert!(!verifier.verify(
			WebhookPayload::Raw(BODY),
			Some(&format!("{}00", signature))
		));
		assert!(!verifier.verify(WebhookPayload::Raw(BODY), Some("")));
	}

	#[test]
	fn test_fails_closed_without_secret_or_signature() {
		let unconfigured = WebhookVerifier::new(None);
		assert!(unconfigured.sign(BODY).is_none());
		assert!(!unconfigured.verify(WebhookPayload::Raw(BODY), Some("abcd")));

		let empty_secret = WebhookVerifier::new(Some(String::new()));
		assert!(!empty_secret.is_configured());

		assert!(!verifier().verify(WebhookPayload::Raw(BODY), None));
	}

	#[test]
	fn test_json_payload_uses_compact_serialization() {
		let verifier = verifier();
		let value = json!({"awb": "AWB123456", "current_status": "DELIVERED"});
		let signature = verifier.sign(&serde_json::to_vec(&value).unwrap()).unwrap();

		assert!(verifier.verify(WebhookPayload::Json(&value), Some(&signature)));

		let other = json!({"awb": "AWB123456", "current_status": "RTO"});
		assert!(!verifier.verify(WebhookPayload::Json(&other), Some(&signature)));
	}

	#[test]
	fn test_json_payload_keeps_sender_key_order() {
		let verifier = verifier();
		let body = br#"{"current_status":"DELIVERED","awb":"AWB123456"}"#;
		let signature = verifier.sign(body).unwrap();

		let value: Value = serde_json::from_slice(body).unwrap();
		assert!(verifier.verify(WebhookPayload::Json(&value), Some(&signature)));
	}

	#[test]
	fn test_uppercase_signature_rejected() {
		let verifier = verifier();
		let signature = verifier.sign(BODY).unwrap().to_uppercase();
		assert!(!verifier.verify(WebhookPayload::Raw(BODY), Some(&signature)));
	}

	#[test]
	fn test_debug_hides_secret() {
		assert!(!format!("{:?}", verifier()).contains("whsec-test"));
	}
}
