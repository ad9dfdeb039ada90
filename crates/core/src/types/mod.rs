//! Core types for Forneria.
//!
//! This module provides type-safe wrappers for common point-of-sale concepts.

pub mod discount;
pub mod id;
pub mod money;
pub mod sale;

pub use discount::DiscountPct;
pub use id::*;
pub use money::Money;
pub use sale::*;
