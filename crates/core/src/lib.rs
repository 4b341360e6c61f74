//! Threadline Core - Shared domain types and pure storefront logic.
//!
//! This crate provides the types used by every Threadline component:
//! - `storefront` - HTTP API, cart reconciliation and stock refresh
//! - `integration-tests` - Cross-crate scenarios
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no timers. Anything that talks to the remote backend lives in the
//! storefront crate.
//!
//! # Modules
//!
//! - [`types`] - Identifiers, products, stock records, emails and money
//! - [`cart`] - The cart store and its quantity rules
//! - [`filters`] - Filter definitions, selection state and the filter resolver

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod filters;
pub mod types;

pub use cart::{Cart, CartLine};
pub use filters::{FilterDefinition, FilterScope, FilterValue, SelectedFilters, SelectionMode};
pub use types::*;
