//! Dispatch tracker - shipment enrichment from TMS screenshots
//!
//! # Features
//! - Structured shipment extraction from screenshots via an AI vision call
//! - Zip-to-city geocoding and cached driving distance/ETA enrichment
//! - Customer grouping and email draft composition
//! - Rate-limited batch execution against the Google Maps APIs

pub mod batch;
pub mod config;
pub mod email;
pub mod extract;
pub mod geo;
pub mod model;
pub mod pipeline;
pub mod route;
pub mod telemetry;

pub use model::{CustomerGroup, DestinationType, ProcessedShipmentRecord, RawShipmentRecord};
pub use pipeline::{group_by_customer, ShipmentProcessor};
