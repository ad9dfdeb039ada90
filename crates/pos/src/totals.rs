//! Net, tax and total for a set of cart lines.

use forneria_core::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::CartLine;

/// Which net amount tax is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBase {
    /// Round the net to whole units first, then tax it. The reported net is
    /// the rounded one.
    #[default]
    RoundedNet,
    /// Tax the exact net; only the tax is rounded.
    UnroundedNet,
}

impl std::str::FromStr for TaxBase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rounded" | "rounded_net" => Ok(Self::RoundedNet),
            "unrounded" | "unrounded_net" => Ok(Self::UnroundedNet),
            _ => Err(format!("invalid tax base: {s}")),
        }
    }
}

/// Tax configuration for the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxPolicy {
    /// Fraction of the net charged as tax (0.19 for Chilean IVA).
    pub rate: Decimal,
    pub base: TaxBase,
}

impl TaxPolicy {
    /// Default IVA rate.
    pub const DEFAULT_RATE: Decimal = Decimal::from_parts(19, 0, 0, false, 2);

    #[must_use]
    pub const fn new(rate: Decimal, base: TaxBase) -> Self {
        Self { rate, base }
    }
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_RATE, TaxBase::default())
    }
}

/// Net, tax and total of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub net: Money,
    pub tax: Money,
    pub total: Money,
}

impl Totals {
    /// Compute totals from scratch.
    ///
    /// `net` is the sum of line subtotals, `tax` is `net * rate` rounded half
    /// away from zero to whole units, and `total = net + tax`. Line order does
    /// not matter.
    #[must_use]
    pub fn compute(lines: &[CartLine], policy: &TaxPolicy) -> Self {
        let exact_net: Money = lines.iter().map(CartLine::subtotal).sum();
        let net = match policy.base {
            TaxBase::RoundedNet => exact_net.round_units(),
            TaxBase::UnroundedNet => exact_net,
        };
        let tax = (net * policy.rate).round_units();
        Self {
            net,
            tax,
            total: net + tax,
        }
    }
}
