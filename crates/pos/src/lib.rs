//! Forneria POS - Cashier register library.
//!
//! The register lets a cashier search a pre-loaded product catalog, build a
//! cart, see net/tax/total, and submit the sale to the sales backend in a
//! single request.
//!
//! # Architecture
//!
//! ```text
//! ProductCatalog (immutable) -> CartStore (operator commands) -> Totals
//!                                   |
//!                                   v
//!                             SaleRequest -> SaleGateway -> Checkout outcome
//! ```
//!
//! - [`catalog`] - Product records loaded once per session, with name search
//! - [`cart`] - Cart lines with quantity/stock reconciliation
//! - [`totals`] - Net, tax and total as a pure function of the cart
//! - [`sale`] - Sale request payload and payment tender
//! - [`gateway`] - Network submission of a sale (`reqwest`)
//! - [`checkout`] - Per-attempt submission state machine
//! - [`register`] - Operator command handlers tying it all together
//! - [`config`] - Environment configuration
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use forneria_core::{Money, ProductId};
//! use forneria_pos::catalog::{Product, ProductCatalog};
//! use forneria_pos::register::Register;
//! use forneria_pos::totals::TaxPolicy;
//!
//! let catalog = ProductCatalog::from_products(vec![
//!     Product::new(ProductId::new(1), "Marraqueta", Money::from_units(1000)).with_stock(10),
//! ])?;
//! let mut register = Register::new(Arc::new(catalog), TaxPolicy::default());
//!
//! register.on_add(ProductId::new(1))?;
//! let snapshot = register.on_quantity_change(ProductId::new(1), "2");
//! assert_eq!(snapshot.totals.total.to_string(), "$2.380");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod gateway;
pub mod register;
pub mod sale;
pub mod totals;

pub use cart::{CartError, CartLine, CartStore, MAX_LINE_QUANTITY};
pub use catalog::{CatalogError, Product, ProductCatalog};
pub use checkout::{Checkout, CheckoutError, CheckoutState, Navigator, SaleConfirmation};
pub use config::{ConfigError, PosConfig};
pub use gateway::{GatewayError, HttpSaleGateway, SaleGateway, SaleResponse};
pub use register::{CartSnapshot, Register};
pub use sale::{SaleError, SaleLine, SaleOptions, SaleRequest, Tender};
pub use totals::{TaxBase, TaxPolicy, Totals};
