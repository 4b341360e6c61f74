//! Core types for Threadline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod product;
pub mod stock;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::format_amount;
pub use product::Product;
pub use stock::Stock;
