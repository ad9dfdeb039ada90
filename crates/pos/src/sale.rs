//! Sale request payload sent to the sales backend.
//!
//! Wire shape:
//!
//! ```json
//! {
//!   "cliente_id": 1,
//!   "canal_venta": "TIENDA",
//!   "carrito": [{"id": 3, "cantidad": 2, "precio": "1000", "descuento_pct": "0"}],
//!   "pago_completo": true
//! }
//! ```
//!
//! Prices are taken from the cart line snapshot. The backend is expected to
//! re-check price and stock before committing the sale.

use forneria_core::{CustomerId, DiscountPct, Money, PaymentMethod, ProductId, SalesChannel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{CartLine, CartStore};
use crate::totals::{TaxPolicy, Totals};

/// Reasons a sale request cannot be assembled. Submission must not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SaleError {
    #[error("the cart is empty")]
    EmptyCart,

    #[error("a customer must be selected")]
    MissingCustomer,
}

/// One line of the sale as the backend receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    #[serde(rename = "cantidad")]
    pub quantity: u32,
    #[serde(rename = "precio")]
    pub unit_price: Money,
    #[serde(rename = "descuento_pct")]
    pub discount_pct: DiscountPct,
}

impl From<&CartLine> for SaleLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: line.unit_price,
            discount_pct: line.discount,
        }
    }
}

// =============================================================================
// Tender
// =============================================================================

/// How the customer is paying, with the amount handed over per method.
///
/// Only the amount for the chosen method counts, except for
/// [`PaymentMethod::Mixed`] which sums all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tender {
    pub method: PaymentMethod,
    pub cash: Money,
    pub debit: Money,
    pub credit: Money,
}

impl Tender {
    /// A tender with nothing handed over yet.
    #[must_use]
    pub const fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            cash: Money::ZERO,
            debit: Money::ZERO,
            credit: Money::ZERO,
        }
    }

    /// Single-method tender of `amount`. For `Mixed` the amount is booked as cash.
    #[must_use]
    pub fn single(method: PaymentMethod, amount: Money) -> Self {
        let mut tender = Self::new(method);
        match method {
            PaymentMethod::Cash | PaymentMethod::Mixed => tender.cash = amount,
            PaymentMethod::Debit => tender.debit = amount,
            PaymentMethod::Credit => tender.credit = amount,
        }
        tender
    }

    /// Split tender across all three methods.
    #[must_use]
    pub const fn mixed(cash: Money, debit: Money, credit: Money) -> Self {
        Self {
            method: PaymentMethod::Mixed,
            cash,
            debit,
            credit,
        }
    }

    /// Amount that counts toward the sale.
    #[must_use]
    pub fn tendered(&self) -> Money {
        match self.method {
            PaymentMethod::Cash => self.cash,
            PaymentMethod::Debit => self.debit,
            PaymentMethod::Credit => self.credit,
            PaymentMethod::Mixed => self.cash + self.debit + self.credit,
        }
    }

    #[must_use]
    pub fn covers(&self, total: Money) -> bool {
        self.tendered() >= total
    }

    /// Change to hand back (vuelto), never negative.
    #[must_use]
    pub fn change(&self, total: Money) -> Money {
        (self.tendered() - total).floor_zero()
    }

    /// Amount still owed (saldo pendiente), never negative.
    #[must_use]
    pub fn balance_due(&self, total: Money) -> Money {
        (total - self.tendered()).floor_zero()
    }
}

// =============================================================================
// SaleOptions
// =============================================================================

/// Everything about a sale that is not the cart itself.
#[derive(Debug, Clone, Default)]
pub struct SaleOptions {
    /// Selected customer; `None` falls back to the walk-in customer unless
    /// `require_customer` is set.
    pub customer: Option<CustomerId>,
    pub require_customer: bool,
    pub channel: SalesChannel,
    pub tender: Option<Tender>,
    /// Receipt number, if the register issues one.
    pub folio: Option<String>,
}

// =============================================================================
// SaleRequest
// =============================================================================

/// The outbound sale payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRequest {
    #[serde(rename = "cliente_id")]
    pub customer_id: CustomerId,
    #[serde(rename = "canal_venta")]
    pub channel: SalesChannel,
    #[serde(rename = "carrito")]
    pub lines: Vec<SaleLine>,
    #[serde(rename = "pago_completo")]
    pub paid_in_full: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folio: Option<String>,
}

impl SaleRequest {
    /// Build the request for the current cart.
    ///
    /// Without a tender the sale is marked as paid in full. With one, it is
    /// paid in full when the tendered amount covers the total.
    ///
    /// # Errors
    ///
    /// - `SaleError::EmptyCart` if the cart has no lines
    /// - `SaleError::MissingCustomer` if a customer is required but unset
    pub fn assemble(
        cart: &CartStore,
        options: &SaleOptions,
        policy: &TaxPolicy,
    ) -> Result<Self, SaleError> {
        if cart.is_empty() {
            return Err(SaleError::EmptyCart);
        }

        let customer_id = match (options.customer, options.require_customer) {
            (Some(id), _) => id,
            (None, true) => return Err(SaleError::MissingCustomer),
            (None, false) => CustomerId::WALK_IN,
        };

        let paid_in_full = options.tender.as_ref().is_none_or(|tender| {
            tender.covers(Totals::compute(cart.lines(), policy).total)
        });

        Ok(Self {
            customer_id,
            channel: options.channel,
            lines: cart.lines().iter().map(SaleLine::from).collect(),
            paid_in_full,
            folio: options.folio.clone(),
        })
    }
}
