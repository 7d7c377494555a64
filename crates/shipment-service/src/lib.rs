//! Shipment orchestration service.
//!
//! Wires the Shiprocket client to an order store and exposes the fulfilment
//! flow over HTTP.
//!
//! # Components
//!
//! - `api`: axum routes for orders, shipments and the provider webhook
//! - `fulfillment`: ship an order end to end and apply status updates
//! - `store`: order storage trait with an in-memory backend

pub mod api;
pub mod fulfillment;
pub mod store;
