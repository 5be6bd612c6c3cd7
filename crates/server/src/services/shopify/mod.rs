//! Shopify webhook ingestion: payload types, signature verification, and
//! order eligibility matching.
//!
//! The provisioning decision itself lives in
//! [`crate::services::provisioner`]; this module only answers "is this
//! delivery authentic" and "does this order qualify".

pub mod matcher;
pub mod types;
pub mod verify;

pub use matcher::order_matches_keywords;
pub use types::{Customer, LineItem, OrderPayload};
pub use verify::verify_signature;
