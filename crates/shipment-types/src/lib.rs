//! Shared types for the shipment orchestration workspace.
//!
//! Holds the internal order and shipment model, the Shiprocket wire schemas,
//! the delivery lifecycle with its status translator, and the error taxonomy
//! used by every other crate.

pub mod errors;
pub mod order;
pub mod shipment;
pub mod status;
pub mod wire;

pub use errors::*;
pub use order::*;
pub use shipment::*;
pub use status::*;
