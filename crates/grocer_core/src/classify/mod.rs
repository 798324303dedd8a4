//! Item name ingestion: quantity parsing and category classification.
//!
//! # Responsibility
//! - Turn free text into a clean name plus quantity.
//! - Map item names onto store category labels.

pub mod quantity;
pub mod reference;
pub mod resolver;
