//! Domain model for stores, grocery trips and trip items.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep id aliases explicit so signatures say which entity they expect.
//!
//! # Invariants
//! - Every persisted object is identified by a stable UUID.
//! - Items are always owned by exactly one grocery trip.

pub mod item;
pub mod store;
