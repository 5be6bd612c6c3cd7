//! Decoded Shopify order webhook payload.
//!
//! Shopify order payloads are large; only the fields the provisioning
//! pipeline reads are modeled, everything else is ignored. Every field is
//! optional - real deliveries omit fields freely and a missing field must
//! never fail the decode step.

use serde::Deserialize;

/// An order-complete webhook payload, as far as provisioning cares.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayload {
    /// Shopify order id, used for log correlation only.
    pub id: Option<i64>,
    /// Checkout email of the order.
    pub email: Option<String>,
    /// Customer record attached to the order.
    pub customer: Option<Customer>,
    /// Purchased items.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

/// The customer block of an order payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Customer {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// One purchased line item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItem {
    pub title: Option<String>,
    pub name: Option<String>,
    pub sku: Option<String>,
}

impl OrderPayload {
    /// Display name for the buyer: customer first + last name, falling back
    /// to the local part of the order email, then to a placeholder.
    #[must_use]
    pub fn customer_display_name(&self) -> String {
        let first = self
            .customer
            .as_ref()
            .and_then(|c| c.first_name.as_deref())
            .unwrap_or("");
        let last = self
            .customer
            .as_ref()
            .and_then(|c| c.last_name.as_deref())
            .unwrap_or("");

        let name = format!("{first} {last}").trim().to_owned();
        if !name.is_empty() {
            return name;
        }

        let from_email = self
            .email
            .as_deref()
            .and_then(|e| e.split('@').next())
            .unwrap_or("")
            .trim();
        if !from_email.is_empty() {
            return from_email.to_owned();
        }

        "user".to_owned()
    }
}
