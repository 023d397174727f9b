//! Grouping of processed shipments by customer.

use std::collections::HashMap;

use crate::model::{CustomerGroup, ProcessedShipmentRecord};

/// Group shipments by customer name, groups ordered by the customer's
/// first appearance and shipments kept in their original relative order.
/// Records with an empty customer land in an "Unknown" group.
pub fn group_by_customer(shipments: Vec<ProcessedShipmentRecord>) -> Vec<CustomerGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<CustomerGroup> = Vec::new();

    for shipment in shipments {
        let customer = if shipment.customer.trim().is_empty() {
            "Unknown".to_string()
        } else {
            shipment.customer.clone()
        };
        match index.get(&customer) {
            Some(&i) => groups[i].shipments.push(shipment),
            None => {
                index.insert(customer.clone(), groups.len());
                groups.push(CustomerGroup {
                    customer,
                    shipments: vec![shipment],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DestinationType;

    fn processed(customer: &str, po: &str) -> ProcessedShipmentRecord {
        ProcessedShipmentRecord {
            po_number: po.to_string(),
            customer: customer.to_string(),
            current_location: "Newark, NJ".to_string(),
            destination: "Keasbey, NJ".to_string(),
            destination_type: DestinationType::Receiver,
            eta: "5 miles from the receiver".to_string(),
            distance: 5,
            travel_time: 0.1,
            status: "IN-TRANS".to_string(),
            reefer_temp: None,
        }
    }

    #[test]
    fn groups_in_first_seen_order() {
        let groups = group_by_customer(vec![
            processed("A", "1"),
            processed("B", "2"),
            processed("A", "3"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].customer, "A");
        assert_eq!(groups[1].customer, "B");
        let pos: Vec<&str> = groups[0].shipments.iter().map(|s| s.po_number.as_str()).collect();
        assert_eq!(pos, vec!["1", "3"]);
    }

    #[test]
    fn blank_customer_becomes_unknown() {
        let groups = group_by_customer(vec![processed("  ", "1")]);
        assert_eq!(groups[0].customer, "Unknown");
    }

    #[test]
    fn every_record_lands_in_exactly_one_group() {
        let groups = group_by_customer(vec![
            processed("A", "1"),
            processed("B", "2"),
            processed("A", "3"),
            processed("C", "4"),
        ]);
        let total: usize = groups.iter().map(|g| g.shipments.len()).sum();
        assert_eq!(total, 4);
    }
}
