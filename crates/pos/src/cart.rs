//! Cart lines and their reconciliation against the catalog.
//!
//! # Invariants
//!
//! - At most one line per product.
//! - Every line has `1 <= quantity`.
//! - A line never holds more units than its product's stock, or more than
//!   [`MAX_LINE_QUANTITY`] when the product has no stock limit.
//! - Lines keep the order in which they were first added.
//!
//! Name and unit price are copied from the catalog when a line is created and
//! never re-read, so a priced line cannot change behind the cashier's back.

use std::sync::Arc;

use forneria_core::{DiscountPct, Money, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{Product, ProductCatalog};

/// Upper bound on a line's quantity for products without a stock limit.
pub const MAX_LINE_QUANTITY: u32 = 9_999;

/// Cart operations that were rejected. The cart is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("{name} is out of stock")]
    OutOfStock { product_id: ProductId, name: String },

    #[error("not enough stock for {name} (available: {available})")]
    StockExceeded {
        product_id: ProductId,
        name: String,
        available: u32,
    },

    /// The per-line cap applies when stock does not bind first.
    #[error("a line of {name} cannot hold more than {limit} units")]
    LineLimitReached {
        product_id: ProductId,
        name: String,
        limit: u32,
    },
}

/// One product entry in the sale being built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    #[serde(default)]
    pub discount: DiscountPct,
}

impl CartLine {
    fn from_product(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.unit_price,
            quantity: 1,
            discount: DiscountPct::NONE,
        }
    }

    /// `unit_price * quantity * (1 - discount / 100)`, unrounded.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity * self.discount.factor()
    }
}

/// Highest quantity a line for `product` may hold.
fn quantity_ceiling(product: Option<&Product>) -> u32 {
    product
        .and_then(|p| p.stock)
        .map_or(MAX_LINE_QUANTITY, |stock| stock.min(MAX_LINE_QUANTITY))
}

/// The rejection for a line that would go past `ceiling` units.
fn ceiling_error(product: &Product, ceiling: u32) -> CartError {
    match product.stock {
        Some(stock) if stock <= MAX_LINE_QUANTITY => CartError::StockExceeded {
            product_id: product.id,
            name: product.name.clone(),
            available: ceiling,
        },
        _ => CartError::LineLimitReached {
            product_id: product.id,
            name: product.name.clone(),
            limit: MAX_LINE_QUANTITY,
        },
    }
}

/// Sanitize free-text quantity input.
///
/// Reads an optional sign followed by the leading digits, ignoring anything
/// after them (`"3 units"` is 3). Text with no leading integer yields 1, and
/// so does anything below 1.
///
/// ```
/// use forneria_pos::cart::parse_quantity_input;
///
/// assert_eq!(parse_quantity_input("4"), 4);
/// assert_eq!(parse_quantity_input(" 12abc"), 12);
/// assert_eq!(parse_quantity_input("abc"), 1);
/// assert_eq!(parse_quantity_input("-3"), 1);
/// ```
#[must_use]
pub fn parse_quantity_input(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, trimmed.get(1..).unwrap_or("")),
        Some(b'+') => (false, trimmed.get(1..).unwrap_or("")),
        _ => (false, trimmed),
    };

    let digits: &str = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| rest.get(..end).unwrap_or(""));

    if digits.is_empty() || negative {
        return 1;
    }

    // Saturate rather than fail on absurdly long input; the stock clamp
    // brings it back into range.
    digits.parse::<i64>().unwrap_or(i64::MAX).max(1)
}

/// The in-progress sale: an ordered set of cart lines.
#[derive(Debug, Clone)]
pub struct CartStore {
    catalog: Arc<ProductCatalog>,
    lines: Vec<CartLine>,
}

impl CartStore {
    /// Create an empty cart backed by `catalog`.
    #[must_use]
    pub const fn new(catalog: Arc<ProductCatalog>) -> Self {
        Self {
            catalog,
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Add one unit of `product_id`.
    ///
    /// Creates a line with quantity 1 the first time, otherwise increments the
    /// existing line. Increments that would exceed stock are rejected outright
    /// instead of being clamped, so the cashier sees the shortage.
    ///
    /// # Errors
    ///
    /// - `CartError::ProductNotFound` if the catalog has no such product
    /// - `CartError::OutOfStock` if a new line is requested for a product
    ///   with no units left
    /// - `CartError::StockExceeded` if the increment would exceed stock
    /// - `CartError::LineLimitReached` if the line is already at
    ///   [`MAX_LINE_QUANTITY`]
    // Positions come from `self.position` or a push on the same vector.
    #[allow(clippy::indexing_slicing)]
    pub fn add_by_identifier(&mut self, product_id: ProductId) -> Result<&CartLine, CartError> {
        let Some(product) = self.catalog.get(product_id) else {
            warn!(%product_id, "Add rejected: unknown product");
            return Err(CartError::ProductNotFound(product_id));
        };
        let ceiling = quantity_ceiling(Some(product));

        if let Some(position) = self.position(product_id) {
            let line = &mut self.lines[position];
            if line.quantity >= ceiling {
                warn!(%product_id, quantity = line.quantity, ceiling, "Add rejected: limit reached");
                return Err(ceiling_error(product, ceiling));
            }
            line.quantity += 1;
            debug!(%product_id, quantity = line.quantity, "Cart line incremented");
            return Ok(line);
        }

        if !product.is_available() {
            warn!(%product_id, "Add rejected: out of stock");
            return Err(CartError::OutOfStock {
                product_id,
                name: product.name.clone(),
            });
        }

        let position = self.lines.len();
        self.lines.push(CartLine::from_product(product));
        debug!(%product_id, "Cart line created");
        Ok(&self.lines[position])
    }

    /// Set a line's quantity, clamped to `1..=stock`.
    ///
    /// Requests below 1 become 1; this never removes the line. Returns `None`
    /// (and does nothing) when the product has no line.
    pub fn set_quantity(&mut self, product_id: ProductId, requested: i64) -> Option<&CartLine> {
        let ceiling = quantity_ceiling(self.catalog.get(product_id)).max(1);
        let line = self.lines.iter_mut().find(|l| l.product_id == product_id)?;

        let clamped = requested.clamp(1, i64::from(ceiling));
        line.quantity = u32::try_from(clamped).unwrap_or(1);
        debug!(%product_id, requested, quantity = line.quantity, "Cart line quantity set");
        Some(line)
    }

    /// Set a line's quantity from operator text; see [`parse_quantity_input`].
    pub fn set_quantity_input(&mut self, product_id: ProductId, raw: &str) -> Option<&CartLine> {
        self.set_quantity(product_id, parse_quantity_input(raw))
    }

    /// Set a line's discount, clamped to `0..=100`.
    pub fn set_discount(&mut self, product_id: ProductId, pct: Decimal) -> Option<&CartLine> {
        let line = self.lines.iter_mut().find(|l| l.product_id == product_id)?;
        line.discount = DiscountPct::clamped(pct);
        debug!(%product_id, discount = %line.discount, "Cart line discount set");
        Some(line)
    }

    /// Remove a line. Removing an absent product is not an error.
    pub fn remove(&mut self, product_id: ProductId) -> Option<CartLine> {
        let position = self.position(product_id)?;
        debug!(%product_id, "Cart line removed");
        Some(self.lines.remove(position))
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn find(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Replace the cart with previously recorded lines, e.g. when reopening a
    /// stored sale for editing.
    ///
    /// Lines for the same product are merged. Recorded names and prices are
    /// kept as they were sold. Quantities below 1 become 1.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` for a product missing from the
    /// catalog, or `CartError::StockExceeded` when a merged quantity exceeds
    /// stock. The cart is unchanged on error.
    pub fn restore(&mut self, recorded: Vec<CartLine>) -> Result<(), CartError> {
        let mut restored: Vec<CartLine> = Vec::with_capacity(recorded.len());
        for mut line in recorded {
            line.quantity = line.quantity.max(1);
            match restored.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
                None => restored.push(line),
            }
        }

        for line in &restored {
            let product = self
                .catalog
                .get(line.product_id)
                .ok_or(CartError::ProductNotFound(line.product_id))?;
            let ceiling = quantity_ceiling(Some(product));
            if line.quantity > ceiling {
                return Err(ceiling_error(product, ceiling));
            }
        }

        debug!(lines = restored.len(), "Cart restored");
        self.lines = restored;
        Ok(())
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id == product_id)
    }
}
