//! Shipment record types shared across the pipeline.

use serde::{Deserialize, Serialize};

/// A shipment row as extracted from a TMS screenshot.
///
/// Field names on the wire are camelCase to match the extraction schema.
/// Cells the extractor could not read come back as `"N/A"`; a missing
/// `reeferTemp` means a dry (non-refrigerated) load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShipmentRecord {
    /// BOL/PO number, or "N/A" when the cell was empty.
    pub bol: String,
    /// Raw customer name, often prefixed with a TMS code ("VITAAUTX - Vital Farms").
    pub customer: String,
    /// Last call-in city (current truck location), or "N/A".
    pub last_callin_city: String,
    /// Brokerage status: COVRD, DISPATCH, IN-TRANS, DLVD, or others.
    pub brokerage_status: String,
    /// Origin/shipper zip code.
    pub origin_zip: String,
    /// Destination/receiver zip code.
    pub dest_zip: String,
    /// Reefer temperature requirement, absent for dry loads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reefer_temp: Option<String>,
}

/// Which end of the load the truck is currently heading toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationType {
    Shipper,
    Receiver,
}

impl DestinationType {
    /// Classify from a brokerage status. COVRD/DISPATCH loads have not
    /// picked up yet, so the relevant destination is the shipper.
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_uppercase().as_str() {
            "COVRD" | "DISPATCH" => Self::Shipper,
            _ => Self::Receiver,
        }
    }

    /// Lowercase noun used in ETA strings ("5 miles from the shipper").
    pub fn as_noun(&self) -> &'static str {
        match self {
            Self::Shipper => "shipper",
            Self::Receiver => "receiver",
        }
    }
}

/// A shipment row after enrichment, ready for display or email composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedShipmentRecord {
    /// PO number, "N/A" when the BOL was absent or was really the customer name.
    pub po_number: String,
    /// Cleaned customer display name.
    pub customer: String,
    /// Current truck location, or "N/A".
    pub current_location: String,
    /// Resolved "City, ST" destination, falling back to the raw zip.
    pub destination: String,
    pub destination_type: DestinationType,
    /// Human-readable ETA string ("5 miles from the receiver", "Delivered", ...).
    pub eta: String,
    /// Driving distance in miles, 0 when unknown.
    pub distance: u32,
    /// Driving time in hours, 0.0 when unknown.
    pub travel_time: f64,
    /// Raw brokerage status, display-mapped elsewhere.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reefer_temp: Option<String>,
}

/// Shipments for one customer, in original processing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerGroup {
    pub customer: String,
    pub shipments: Vec<ProcessedShipmentRecord>,
}

/// True for cells the extractor marked unusable: empty, whitespace, or "N/A".
pub fn is_trivial(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a")
}
