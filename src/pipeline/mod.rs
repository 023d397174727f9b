//! Shipment enrichment pipeline: dedup, geocode, route, derive.

mod group;

pub use group::group_by_customer;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::geo::{GeocodeResult, ZipResolver};
use crate::model::{is_trivial, DestinationType, ProcessedShipmentRecord, RawShipmentRecord};
use crate::route::{RoutePair, RoutePlanner, RouteResult};

const WORLD_CLASS_CANONICAL: &str = "World Class Distribution";

/// Orchestrates enrichment of raw extracted rows.
///
/// Collaborators are injected behind traits; both must degrade failures to
/// fallback results rather than erroring, so `process` itself never fails.
pub struct ShipmentProcessor {
    geo: Arc<dyn ZipResolver>,
    routes: Arc<dyn RoutePlanner>,
}

impl ShipmentProcessor {
    pub fn new(geo: Arc<dyn ZipResolver>, routes: Arc<dyn RoutePlanner>) -> Self {
        Self { geo, routes }
    }

    /// Enrich a batch of raw rows into display-ready records.
    ///
    /// Duplicated BOLs are dropped, every distinct zip is geocoded once,
    /// and all routes resolve in a single batched pass. Per-row lookup
    /// failures degrade individual fields ("N/A", "ETA Unavailable");
    /// they never abort the batch.
    pub async fn process(&self, raw: Vec<RawShipmentRecord>) -> Vec<ProcessedShipmentRecord> {
        let shipments = dedup_by_bol(raw);
        tracing::info!(count = shipments.len(), "processing shipments");

        // Geocode each distinct zip exactly once, in first-seen order.
        let mut seen = HashSet::new();
        let mut zips: Vec<String> = Vec::new();
        for shipment in &shipments {
            for zip in [&shipment.origin_zip, &shipment.dest_zip] {
                let trimmed = zip.trim();
                if !is_trivial(trimmed) && seen.insert(trimmed.to_string()) {
                    zips.push(trimmed.to_string());
                }
            }
        }
        let geocoded = self.geo.resolve_many(&zips).await;
        let locations: HashMap<String, GeocodeResult> =
            zips.into_iter().zip(geocoded).collect();

        // One route per record: current truck location to the zip that
        // matters for its status, as a city/state when geocoding succeeded.
        let pairs: Vec<RoutePair> = shipments
            .iter()
            .map(|shipment| {
                let destination_zip = classified_zip(shipment);
                let destination = locations
                    .get(destination_zip.trim())
                    .map(|g| g.city_state.clone())
                    .filter(|loc| !is_trivial(loc))
                    .unwrap_or_else(|| "N/A".to_string());
                RoutePair {
                    origin: current_location(shipment),
                    destination,
                }
            })
            .collect();
        let routes = self.routes.batch_distances(&pairs).await;

        shipments
            .into_iter()
            .zip(routes)
            .map(|(shipment, route)| derive_record(shipment, route, &locations))
            .collect()
    }
}

/// Keep the first record for each non-trivial BOL (trimmed, uppercased).
/// Records without a usable BOL are all retained; "N/A" rows must never
/// collapse into one another.
pub fn dedup_by_bol(raw: Vec<RawShipmentRecord>) -> Vec<RawShipmentRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(raw.len());
    for shipment in raw {
        let bol = shipment.bol.trim().to_uppercase();
        if !is_trivial(&bol) && !seen.insert(bol) {
            tracing::debug!(bol = %shipment.bol, "duplicate BOL skipped");
            continue;
        }
        unique.push(shipment);
    }
    unique
}

/// The zip the truck is actually heading toward: origin for loads not yet
/// picked up, destination otherwise.
fn classified_zip(shipment: &RawShipmentRecord) -> &str {
    match DestinationType::from_status(&shipment.brokerage_status) {
        DestinationType::Shipper => &shipment.origin_zip,
        DestinationType::Receiver => &shipment.dest_zip,
    }
}

fn current_location(shipment: &RawShipmentRecord) -> String {
    let city = shipment.last_callin_city.trim();
    if is_trivial(city) {
        "N/A".to_string()
    } else {
        city.to_string()
    }
}

fn derive_record(
    shipment: RawShipmentRecord,
    route: RouteResult,
    locations: &HashMap<String, GeocodeResult>,
) -> ProcessedShipmentRecord {
    let destination_type = DestinationType::from_status(&shipment.brokerage_status);
    let destination_zip = classified_zip(&shipment).trim().to_string();

    // Display the resolved city/state, falling back to the raw zip.
    let destination = locations
        .get(&destination_zip)
        .map(|g| g.city_state.clone())
        .filter(|loc| !is_trivial(loc))
        .unwrap_or_else(|| destination_zip.clone());

    let location = current_location(&shipment);
    let (distance, travel_time) = match route.leg() {
        Some(leg) => (leg.distance_miles, leg.duration_hours),
        None => (0, 0.0),
    };

    let status = shipment.brokerage_status.trim().to_uppercase();
    let eta = match &route {
        RouteResult::Resolved(leg) => {
            format_eta(leg.distance_miles, destination_type, &location, &status)
        }
        _ if status == "DLVD" => "Delivered".to_string(),
        RouteResult::NoRoute | RouteResult::MissingLocation => "N/A".to_string(),
        RouteResult::Failed => "ETA Unavailable".to_string(),
    };

    let customer = clean_customer_name(&shipment.customer);
    let po_number = po_number(&shipment.bol, &customer);

    ProcessedShipmentRecord {
        po_number,
        customer,
        current_location: location,
        destination,
        destination_type,
        eta,
        distance,
        travel_time,
        status: shipment.brokerage_status,
        reefer_temp: shipment.reefer_temp,
    }
}

/// ETA display string. Delivered loads and unknown truck locations win
/// over the computed distance.
fn format_eta(
    distance_miles: u32,
    destination_type: DestinationType,
    current_location: &str,
    status: &str,
) -> String {
    if status.eq_ignore_ascii_case("DLVD") {
        return "Delivered".to_string();
    }
    if is_trivial(current_location) {
        return "N/A".to_string();
    }
    if distance_miles == 1 {
        format!("1 mile from the {}", destination_type.as_noun())
    } else {
        format!("{distance_miles} miles from the {}", destination_type.as_noun())
    }
}

/// Strip the TMS account prefix ("VITAAUTX - Vital Farms" → "Vital Farms")
/// and merge the known World Class Distribution name variants.
pub fn clean_customer_name(raw: &str) -> String {
    let cleaned = match raw.split_once('-') {
        Some((_, rest)) => rest.trim(),
        None => raw.trim(),
    };
    if cleaned.to_lowercase().contains("world class distribution") {
        return WORLD_CLASS_CANONICAL.to_string();
    }
    cleaned.to_string()
}

/// The extractor sometimes copies the customer name into the BOL cell;
/// such values are not PO numbers.
fn po_number(bol: &str, customer: &str) -> String {
    let bol = bol.trim();
    if is_trivial(bol) {
        return "N/A".to_string();
    }
    if !customer.is_empty() && bol.to_lowercase().contains(&customer.to_lowercase()) {
        return "N/A".to_string();
    }
    bol.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn raw(bol: &str, customer: &str, status: &str) -> RawShipmentRecord {
        RawShipmentRecord {
            bol: bol.to_string(),
            customer: customer.to_string(),
            last_callin_city: "South Amboy, NJ".to_string(),
            brokerage_status: status.to_string(),
            origin_zip: "65802".to_string(),
            dest_zip: "08832".to_string(),
            reefer_temp: None,
        }
    }

    #[test]
    fn dedup_is_case_and_whitespace_insensitive() {
        let records = vec![
            raw("ABC", "A", "IN-TRANS"),
            raw("abc ", "B", "IN-TRANS"),
            raw("XYZ", "C", "IN-TRANS"),
        ];
        let unique = dedup_by_bol(records);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].customer, "A");
        assert_eq!(unique[1].bol, "XYZ");
    }

    #[test]
    fn trivial_bols_never_collapse() {
        let records = vec![
            raw("N/A", "A", "COVRD"),
            raw("", "B", "COVRD"),
            raw("n/a", "C", "COVRD"),
        ];
        assert_eq!(dedup_by_bol(records).len(), 3);
    }

    #[test]
    fn eta_formatting() {
        let loc = "South Amboy, NJ";
        assert_eq!(
            format_eta(1, DestinationType::Shipper, loc, "COVRD"),
            "1 mile from the shipper"
        );
        assert_eq!(
            format_eta(5, DestinationType::Receiver, loc, "IN-TRANS"),
            "5 miles from the receiver"
        );
        assert_eq!(format_eta(5, DestinationType::Receiver, loc, "DLVD"), "Delivered");
        assert_eq!(format_eta(5, DestinationType::Receiver, "N/A", "IN-TRANS"), "N/A");
    }

    #[test]
    fn customer_name_cleaning() {
        assert_eq!(clean_customer_name("VITAAUTX - Vital Farms"), "Vital Farms");
        assert_eq!(
            clean_customer_name("WORLDCT - World Class Distribution Hartford"),
            "World Class Distribution"
        );
        assert_eq!(clean_customer_name("  Vital Farms  "), "Vital Farms");
    }

    #[test]
    fn po_suppressed_when_bol_echoes_customer() {
        assert_eq!(po_number("VITAL FARMS INC", "Vital Farms"), "N/A");
        assert_eq!(po_number("919628907", "Vital Farms"), "919628907");
        assert_eq!(po_number("N/A", "Vital Farms"), "N/A");
        assert_eq!(po_number("  ", "Vital Farms"), "N/A");
    }

    #[test]
    fn empty_customer_never_suppresses_the_po() {
        // An empty name is a substring of every BOL; without the guard a
        // row whose customer cell failed to extract would lose its PO too.
        assert_eq!(po_number("919628907", ""), "919628907");
    }

    struct StubResolver;

    #[async_trait]
    impl ZipResolver for StubResolver {
        async fn resolve_many(&self, zips: &[String]) -> Vec<GeocodeResult> {
            zips.iter()
                .map(|zip| match zip.as_str() {
                    "65802" => GeocodeResult {
                        city_state: "Springfield, MO".to_string(),
                        resolved: true,
                    },
                    "08832" => GeocodeResult {
                        city_state: "Keasbey, NJ".to_string(),
                        resolved: true,
                    },
                    other => GeocodeResult {
                        city_state: other.to_string(),
                        resolved: false,
                    },
                })
                .collect()
        }
    }

    struct StubPlanner {
        miles: u32,
    }

    #[async_trait]
    impl RoutePlanner for StubPlanner {
        async fn batch_distances(&self, pairs: &[RoutePair]) -> Vec<RouteResult> {
            pairs
                .iter()
                .map(|pair| {
                    if is_trivial(&pair.origin) || is_trivial(&pair.destination) {
                        RouteResult::MissingLocation
                    } else {
                        RouteResult::Resolved(crate::route::RouteLeg {
                            distance_miles: self.miles,
                            duration_hours: self.miles as f64 / 50.0,
                            formatted_distance: format!("{} mi", self.miles),
                            formatted_duration: "a while".to_string(),
                        })
                    }
                })
                .collect()
        }
    }

    fn processor(miles: u32) -> ShipmentProcessor {
        ShipmentProcessor::new(Arc::new(StubResolver), Arc::new(StubPlanner { miles }))
    }

    #[tokio::test]
    async fn covrd_resolves_against_origin_zip() {
        let records = processor(120)
            .process(vec![raw("919628907", "VITAAUTX - Vital Farms", "COVRD")])
            .await;
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.destination_type, DestinationType::Shipper);
        assert_eq!(record.destination, "Springfield, MO");
        assert_eq!(record.eta, "120 miles from the shipper");
    }

    #[tokio::test]
    async fn in_trans_resolves_against_dest_zip() {
        let records = processor(42)
            .process(vec![raw("919628907", "VITAAUTX - Vital Farms", "IN-TRANS")])
            .await;
        let record = &records[0];
        assert_eq!(record.destination_type, DestinationType::Receiver);
        assert_eq!(record.destination, "Keasbey, NJ");
        assert_eq!(record.eta, "42 miles from the receiver");
        assert_eq!(record.distance, 42);
    }

    #[tokio::test]
    async fn unknown_truck_location_degrades_eta_only() {
        let mut shipment = raw("H0752257", "ACME - Acme Foods", "IN-TRANS");
        shipment.last_callin_city = "N/A".to_string();
        let records = processor(42).process(vec![shipment]).await;
        let record = &records[0];
        assert_eq!(record.current_location, "N/A");
        assert_eq!(record.eta, "N/A");
        assert_eq!(record.destination, "Keasbey, NJ");
    }

    #[tokio::test]
    async fn unresolvable_destination_falls_back_to_raw_zip() {
        let mut shipment = raw("H0752257", "ACME - Acme Foods", "IN-TRANS");
        shipment.dest_zip = "N/A".to_string();
        let records = processor(42).process(vec![shipment]).await;
        let record = &records[0];
        assert_eq!(record.destination, "N/A");
        assert_eq!(record.distance, 0);
        assert_eq!(record.eta, "N/A");
    }
}
