//! Shiprocket integration for marketplace order fulfilment.
//!
//! # Components
//!
//! - `client`: authenticated HTTP client with token cache and retries
//! - `pickup`: pickup location lookup, fallback and registration
//! - `shipment`: mapping orders to provider shipments, cancellation
//! - `courier`: courier ranking and AWB assignment
//! - `awb`: assignment orchestration, AWB polling, tracking and labels
//! - `webhook`: HMAC-SHA256 verification of inbound status updates
//!
//! All provider calls for one order run sequentially. The only state shared
//! between calls is the cached token and the enabled flag inside
//! [`ShiprocketClient`].

pub mod awb;
pub mod client;
pub mod clock;
pub mod courier;
pub mod pickup;
pub mod retry;
pub mod shipment;
pub mod webhook;

pub use client::{AuthToken, RequestOptions, ShiprocketClient, ShiprocketClientBuilder};
pub use clock::{Clock, ManualClock, SystemClock};
pub use courier::select_best_courier;
pub use retry::RetryPolicy;
pub use shipment::{build_shipment_request, split_name};
pub use webhook::{WebhookPayload, WebhookVerifier, SIGNATURE_HEADER};
