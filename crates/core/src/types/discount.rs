//! Per-line discount percentage.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A discount percentage, always within `0..=100`.
///
/// Out-of-range inputs are clamped rather than rejected, so an operator edit
/// can never leave a line with an invalid discount.
///
/// ```
/// use forneria_core::DiscountPct;
/// use rust_decimal::Decimal;
///
/// assert_eq!(DiscountPct::clamped(Decimal::from(150)), DiscountPct::FULL);
/// assert_eq!(DiscountPct::clamped(Decimal::from(-5)), DiscountPct::NONE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct DiscountPct(Decimal);

impl DiscountPct {
    /// No discount.
    pub const NONE: Self = Self(Decimal::ZERO);
    /// The whole line is free.
    pub const FULL: Self = Self(Decimal::ONE_HUNDRED);

    /// Build a discount, clamping to `0..=100`.
    #[must_use]
    pub fn clamped(pct: Decimal) -> Self {
        Self(pct.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
    }

    /// The percentage value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Multiplier applied to a gross amount: `1 - pct / 100`.
    #[must_use]
    pub fn factor(&self) -> Decimal {
        (Decimal::ONE_HUNDRED - self.0) / Decimal::ONE_HUNDRED
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        self.0.is_zero()
    }
}

impl<'de> Deserialize<'de> for DiscountPct {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(Self::clamped)
    }
}

impl fmt::Display for DiscountPct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}
