//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into item lifecycle use-cases.
//! - Keep transport layers (GraphQL resolvers, FFI, CLI) decoupled from
//!   storage details.

pub mod error;
pub mod item_service;
pub mod position_allocator;
pub mod trip_category_registry;
