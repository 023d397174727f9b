//! Per-customer email draft composition.

use chrono::NaiveDate;

use crate::model::CustomerGroup;

/// A ready-to-send draft for one customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailDraft {
    pub customer: String,
    pub subject: String,
    pub body: String,
}

/// Compose the update email for one customer group.
///
/// "N/A" locations and ETAs render as "Currently Unavailable"; a missing
/// or blank reefer temp renders as "Dry".
pub fn compose_draft(group: &CustomerGroup, date: NaiveDate) -> EmailDraft {
    let subject = format!("{} - {}", group.customer, date.format("%b %-d, %Y"));

    let mut body = String::from("Good afternoon,\n\nPlease see below for today's shipment updates:\n\n");
    for (i, shipment) in group.shipments.iter().enumerate() {
        let location = display_or_unavailable(&shipment.current_location);
        let eta = display_or_unavailable(&shipment.eta);
        let temp = shipment
            .reefer_temp
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Dry");

        body.push_str(&format!("Load {}:\n", i + 1));
        body.push_str(&format!("  \u{2022} PO #: {}\n", shipment.po_number));
        body.push_str(&format!("  \u{2022} Current Location: {location}\n"));
        body.push_str(&format!("  \u{2022} ETA: {eta}\n"));
        body.push_str(&format!("  \u{2022} Reefer Temp: {temp}\n\n"));
    }
    body.push_str("Please let me know if you have any questions or need additional information.\n\n");
    body.push_str("Best regards");

    EmailDraft {
        customer: group.customer.clone(),
        subject,
        body,
    }
}

fn display_or_unavailable(value: &str) -> &str {
    if value.trim().eq_ignore_ascii_case("n/a") {
        "Currently Unavailable"
    } else {
        value
    }
}
