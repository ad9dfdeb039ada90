//! Forneria Core - Shared point-of-sale types.
//!
//! This crate provides the value types used across the Forneria components:
//! - `pos` - Cart, totals and sale submission for the cashier register
//! - `cli` - Command-line register for scripted sessions and catalog search
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no cart
//! state. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, discounts and sale enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
