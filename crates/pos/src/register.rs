//! Operator command handlers.
//!
//! Each handler applies one cashier action to the cart and returns a fresh
//! [`CartSnapshot`] for the view to re-render. Totals are recomputed from
//! scratch on every call. Rendering itself happens elsewhere.

use std::sync::Arc;

use forneria_core::{CustomerId, ProductId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use crate::cart::{CartError, CartLine, CartStore};
use crate::catalog::{Product, ProductCatalog};
use crate::checkout::{Checkout, CheckoutError, Navigator, SaleConfirmation};
use crate::gateway::SaleGateway;
use crate::sale::{SaleOptions, Tender};
use crate::totals::{TaxPolicy, Totals};

/// What the view needs after every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub totals: Totals,
    pub item_count: u64,
}

/// The cashier's register: one cart plus the sale options around it.
#[derive(Debug, Clone)]
pub struct Register {
    cart: CartStore,
    policy: TaxPolicy,
    options: SaleOptions,
    /// Customer each new sale starts with.
    default_customer: Option<CustomerId>,
}

impl Register {
    #[must_use]
    pub fn new(catalog: Arc<ProductCatalog>, policy: TaxPolicy) -> Self {
        Self::with_options(catalog, policy, SaleOptions::default())
    }

    #[must_use]
    pub const fn with_options(
        catalog: Arc<ProductCatalog>,
        policy: TaxPolicy,
        options: SaleOptions,
    ) -> Self {
        Self {
            cart: CartStore::new(catalog),
            policy,
            default_customer: options.customer,
            options,
        }
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn options(&self) -> &SaleOptions {
        &self.options
    }

    #[must_use]
    pub const fn policy(&self) -> &TaxPolicy {
        &self.policy
    }

    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            lines: self.cart.lines().to_vec(),
            totals: Totals::compute(self.cart.lines(), &self.policy),
            item_count: self.cart.item_count(),
        }
    }

    /// Products matching the search box, in catalog order.
    #[must_use]
    pub fn on_search(&self, query: &str) -> Vec<&Product> {
        self.cart.catalog().search(query).collect()
    }

    /// Add one unit of a product (product card click or ID entry).
    ///
    /// # Errors
    ///
    /// Returns the [`CartError`] to show the operator; the cart is unchanged.
    pub fn on_add(&mut self, product_id: ProductId) -> Result<CartSnapshot, CartError> {
        self.cart.add_by_identifier(product_id)?;
        Ok(self.snapshot())
    }

    /// Quantity field edited. Bad input is sanitized, never rejected.
    pub fn on_quantity_change(&mut self, product_id: ProductId, raw: &str) -> CartSnapshot {
        self.cart.set_quantity_input(product_id, raw);
        self.snapshot()
    }

    /// Discount field edited.
    pub fn on_discount_change(&mut self, product_id: ProductId, pct: Decimal) -> CartSnapshot {
        self.cart.set_discount(product_id, pct);
        self.snapshot()
    }

    /// Remove button pressed.
    pub fn on_remove(&mut self, product_id: ProductId) -> CartSnapshot {
        self.cart.remove(product_id);
        self.snapshot()
    }

    pub fn select_customer(&mut self, customer: Option<CustomerId>) {
        self.options.customer = customer;
    }

    pub fn set_tender(&mut self, tender: Option<Tender>) {
        self.options.tender = tender;
    }

    pub fn set_folio(&mut self, folio: Option<String>) {
        self.options.folio = folio;
    }

    /// Reopen a recorded sale for editing.
    ///
    /// # Errors
    ///
    /// See [`CartStore::restore`].
    pub fn load_lines(&mut self, lines: Vec<CartLine>) -> Result<CartSnapshot, CartError> {
        self.cart.restore(lines)?;
        Ok(self.snapshot())
    }

    /// Pay button pressed.
    ///
    /// On success the cart, tender and folio are emptied, the customer goes
    /// back to the one the register started with, and the checkout is reset.
    /// On failure everything is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns the [`CheckoutError`] to show the operator.
    #[instrument(skip_all, fields(lines = self.cart.len()))]
    pub async fn on_submit<G, N>(
        &mut self,
        checkout: &mut Checkout<G, N>,
    ) -> Result<SaleConfirmation, CheckoutError>
    where
        G: SaleGateway,
        N: Navigator,
    {
        let confirmation = checkout
            .submit(&self.cart, &self.options, &self.policy)
            .await?;
        self.cart.clear();
        self.options.customer = self.default_customer;
        self.options.tender = None;
        self.options.folio = None;
        checkout.reset();
        Ok(confirmation)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use forneria_core::{Money, PaymentMethod, SaleId};

    use super::*;
    use crate::gateway::{GatewayError, SaleResponse};
    use crate::sale::{SaleError, SaleRequest};

    struct AlwaysFails;

    impl SaleGateway for AlwaysFails {
        async fn submit(&self, _request: &SaleRequest) -> Result<SaleResponse, GatewayError> {
            Ok(SaleResponse::error("Cliente no encontrado"))
        }
    }

    struct AlwaysSucceeds;

    impl SaleGateway for AlwaysSucceeds {
        async fn submit(&self, _request: &SaleRequest) -> Result<SaleResponse, GatewayError> {
            Ok(SaleResponse::success(SaleId::new(10)))
        }
    }

    fn register() -> Register {
        let catalog = ProductCatalog::from_products(vec![
            Product::new(ProductId::new(1), "Marraqueta", Money::from_units(1000)),
            Product::new(ProductId::new(2), "Kuchen de Manzana", Money::from_units(6500))
                .with_stock(2),
        ])
        .unwrap();
        Register::new(Arc::new(catalog), TaxPolicy::default())
    }

    #[test]
    fn test_handlers_return_fresh_totals() {
        let mut register = register();

        let snapshot = register.on_add(ProductId::new(1)).unwrap();
        assert_eq!(snapshot.totals.total, Money::from_units(1190));

        let snapshot = register.on_quantity_change(ProductId::new(1), "2");
        assert_eq!(snapshot.totals.net, Money::from_units(2000));
        assert_eq!(snapshot.totals.tax, Money::from_units(380));
        assert_eq!(snapshot.totals.total, Money::from_units(2380));

        let snapshot = register.on_discount_change(ProductId::new(1), Decimal::from(50));
        assert_eq!(snapshot.totals.total, Money::from_units(1190));

        let snapshot = register.on_remove(ProductId::new(1));
        assert!(snapshot.lines.is_empty());
        assert_eq!(snapshot.totals, Totals::default());
        assert_eq!(snapshot.item_count, 0);
    }

    #[test]
    fn test_on_add_surfaces_cart_errors() {
        let mut register = register();
        assert_eq!(
            register.on_add(ProductId::new(9)),
            Err(CartError::ProductNotFound(ProductId::new(9)))
        );
        register.on_add(ProductId::new(2)).unwrap();
        register.on_add(ProductId::new(2)).unwrap();
        assert!(matches!(
            register.on_add(ProductId::new(2)),
            Err(CartError::StockExceeded { .. })
        ));
        assert_eq!(register.snapshot().item_count, 2);
    }

    #[test]
    fn test_on_search() {
        let register = register();
        let hits = register.on_search("kuchen");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().unwrap().id, ProductId::new(2));
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_cart_byte_for_byte() {
        let mut register = register();
        register.on_add(ProductId::new(1)).unwrap();
        register.on_add(ProductId::new(2)).unwrap();
        register.on_discount_change(ProductId::new(2), Decimal::new(125, 1));
        let before = serde_json::to_vec(register.cart().lines()).unwrap();

        let mut checkout = Checkout::new(AlwaysFails, |_: &SaleConfirmation| {});
        let err = register.on_submit(&mut checkout).await.unwrap_err();

        assert_eq!(
            err,
            CheckoutError::SubmissionFailed("Cliente no encontrado".to_string())
        );
        assert_eq!(serde_json::to_vec(register.cart().lines()).unwrap(), before);
        assert!(checkout.can_submit());
    }

    #[tokio::test]
    async fn test_successful_submit_clears_cart() {
        let mut register = register();
        register.on_add(ProductId::new(1)).unwrap();
        register.set_tender(Some(Tender::single(
            PaymentMethod::Cash,
            Money::from_units(2000),
        )));

        let mut checkout = Checkout::new(AlwaysSucceeds, |_: &SaleConfirmation| {});
        let confirmation = register.on_submit(&mut checkout).await.unwrap();

        assert_eq!(confirmation.sale_id, Some(SaleId::new(10)));
        assert_eq!(confirmation.total, Money::from_units(1190));
        assert!(register.cart().is_empty());
        assert!(register.options().tender.is_none());
        assert!(checkout.can_submit());
    }

    #[tokio::test]
    async fn test_required_customer_blocks_submit() {
        let catalog = ProductCatalog::from_products(vec![Product::new(
            ProductId::new(1),
            "Marraqueta",
            Money::from_units(1000),
        )])
        .unwrap();
        let options = SaleOptions {
            require_customer: true,
            ..SaleOptions::default()
        };
        let mut register = Register::with_options(Arc::new(catalog), TaxPolicy::default(), options);
        register.on_add(ProductId::new(1)).unwrap();

        let mut checkout = Checkout::new(AlwaysSucceeds, |_: &SaleConfirmation| {});
        assert_eq!(
            register.on_submit(&mut checkout).await,
            Err(CheckoutError::Rejected(SaleError::MissingCustomer))
        );

        register.select_customer(Some(CustomerId::new(4)));
        assert!(register.on_submit(&mut checkout).await.is_ok());
    }

    #[tokio::test]
    async fn test_customer_selection_ends_with_the_sale() {
        let catalog = ProductCatalog::from_products(vec![Product::new(
            ProductId::new(1),
            "Marraqueta",
            Money::from_units(1000),
        )])
        .unwrap();
        let options = SaleOptions {
            require_customer: true,
            ..SaleOptions::default()
        };
        let mut register = Register::with_options(Arc::new(catalog), TaxPolicy::default(), options);
        let mut checkout = Checkout::new(AlwaysSucceeds, |_: &SaleConfirmation| {});

        register.select_customer(Some(CustomerId::new(7)));
        register.on_add(ProductId::new(1)).unwrap();
        register.on_submit(&mut checkout).await.unwrap();
        assert!(register.options().customer.is_none());

        register.on_add(ProductId::new(1)).unwrap();
        assert_eq!(
            register.on_submit(&mut checkout).await,
            Err(CheckoutError::Rejected(SaleError::MissingCustomer))
        );
        assert_eq!(register.cart().len(), 1);
    }

    #[tokio::test]
    async fn test_customer_returns_to_configured_default() {
        let catalog = ProductCatalog::from_products(vec![Product::new(
            ProductId::new(1),
            "Marraqueta",
            Money::from_units(1000),
        )])
        .unwrap();
        let options = SaleOptions {
            customer: Some(CustomerId::WALK_IN),
            ..SaleOptions::default()
        };
        let mut register = Register::with_options(Arc::new(catalog), TaxPolicy::default(), options);
        let mut checkout = Checkout::new(AlwaysSucceeds, |_: &SaleConfirmation| {});

        register.select_customer(Some(CustomerId::new(12)));
        register.on_add(ProductId::new(1)).unwrap();
        register.on_submit(&mut checkout).await.unwrap();

        assert_eq!(register.options().customer, Some(CustomerId::WALK_IN));
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_selected_customer() {
        let mut register = register();
        register.select_customer(Some(CustomerId::new(3)));
        register.on_add(ProductId::new(1)).unwrap();

        let mut checkout = Checkout::new(AlwaysFails, |_: &SaleConfirmation| {});
        assert!(register.on_submit(&mut checkout).await.is_err());
        assert_eq!(register.options().customer, Some(CustomerId::new(3)));
    }
}
