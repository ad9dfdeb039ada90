//! Submission state machine for a single cart.
//!
//! ```text
//!        begin()              complete(Ok success)
//! Idle ----------> Submitting ---------------------> Succeeded
//!   ^                  |
//!   +------------------+  complete(failure): message surfaced, cart intact
//! ```
//!
//! At most one submission is in flight per checkout. A failed attempt drops
//! straight back to `Idle` so the cashier can retry by hand; there is no
//! automatic retry and transient and permanent failures are not told apart.

use forneria_core::{Money, SaleId};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use url::Url;

use crate::cart::CartStore;
use crate::gateway::{GatewayError, SaleGateway, SaleResponse};
use crate::sale::{SaleError, SaleOptions, SaleRequest};
use crate::totals::{TaxPolicy, Totals};

/// Shown when the backend reports a failure without a message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";
/// Shown when the request never produced a usable response.
pub const UNEXPECTED_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Why a checkout attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// A submission for this cart is already in flight.
    #[error("a sale is already being submitted")]
    AlreadySubmitting,

    /// This checkout already recorded a sale; reset it before the next one.
    #[error("the sale was already recorded")]
    AlreadyCompleted,

    /// `complete` was called with no submission in flight.
    #[error("no sale is being submitted")]
    NotSubmitting,

    /// The cart could not be turned into a sale request. Nothing was sent.
    #[error(transparent)]
    Rejected(#[from] SaleError),

    /// The backend did not record the sale.
    #[error("failed to record the sale: {0}")]
    SubmissionFailed(String),
}

/// A recorded sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleConfirmation {
    pub sale_id: Option<SaleId>,
    pub total: Money,
    /// Where the operator should be taken next, if configured.
    pub redirect_to: Option<Url>,
}

/// Where a checkout is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    Idle,
    /// A request is in flight; `total` is what was submitted.
    Submitting { total: Money },
    Succeeded(SaleConfirmation),
}

/// Navigation collaborator invoked once a sale is recorded.
pub trait Navigator {
    fn sale_completed(&self, confirmation: &SaleConfirmation);
}

impl<F> Navigator for F
where
    F: Fn(&SaleConfirmation),
{
    fn sale_completed(&self, confirmation: &SaleConfirmation) {
        self(confirmation);
    }
}

/// Drives one cart through submission.
#[derive(Debug)]
pub struct Checkout<G, N> {
    gateway: G,
    navigator: N,
    redirect_to: Option<Url>,
    state: CheckoutState,
    last_failure: Option<String>,
}

impl<G: SaleGateway, N: Navigator> Checkout<G, N> {
    pub const fn new(gateway: G, navigator: N) -> Self {
        Self {
            gateway,
            navigator,
            redirect_to: None,
            state: CheckoutState::Idle,
            last_failure: None,
        }
    }

    /// Set the page to navigate to after a successful sale.
    #[must_use]
    pub fn with_redirect(mut self, redirect_to: Option<Url>) -> Self {
        self.redirect_to = redirect_to;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &CheckoutState {
        &self.state
    }

    /// Whether the submit action should be enabled.
    #[must_use]
    pub const fn can_submit(&self) -> bool {
        matches!(self.state, CheckoutState::Idle)
    }

    /// Message from the most recent failed attempt.
    #[must_use]
    pub fn last_failure(&self) -> Option<&str> {
        self.last_failure.as_deref()
    }

    #[must_use]
    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Assemble the request and move to `Submitting`.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::AlreadySubmitting` / `AlreadyCompleted` outside `Idle`
    /// - `CheckoutError::Rejected` if the cart cannot be turned into a sale;
    ///   the state stays `Idle`
    pub fn begin(
        &mut self,
        cart: &CartStore,
        options: &SaleOptions,
        policy: &TaxPolicy,
    ) -> Result<SaleRequest, CheckoutError> {
        match self.state {
            CheckoutState::Idle => {}
            CheckoutState::Submitting { .. } => return Err(CheckoutError::AlreadySubmitting),
            CheckoutState::Succeeded(_) => return Err(CheckoutError::AlreadyCompleted),
        }

        let request = SaleRequest::assemble(cart, options, policy).inspect_err(|e| {
            warn!(error = %e, "Sale request rejected before submission");
        })?;

        let total = Totals::compute(cart.lines(), policy).total;
        self.state = CheckoutState::Submitting { total };
        Ok(request)
    }

    /// Record the result of the in-flight submission.
    ///
    /// On success, moves to `Succeeded` and notifies the navigator. On any
    /// failure, returns to `Idle` and surfaces the backend's message or a
    /// generic one.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::NotSubmitting` if nothing is in flight
    /// - `CheckoutError::SubmissionFailed` if the sale was not recorded
    pub fn complete(
        &mut self,
        result: Result<SaleResponse, GatewayError>,
    ) -> Result<SaleConfirmation, CheckoutError> {
        let CheckoutState::Submitting { total } = self.state else {
            return Err(CheckoutError::NotSubmitting);
        };

        let failure = match result {
            Ok(response) if response.is_success() => {
                let confirmation = SaleConfirmation {
                    sale_id: response.sale_id,
                    total,
                    redirect_to: self.redirect_to.clone(),
                };
                info!(sale_id = ?confirmation.sale_id, total = %total, "Sale recorded");
                self.last_failure = None;
                self.state = CheckoutState::Succeeded(confirmation.clone());
                self.navigator.sale_completed(&confirmation);
                return Ok(confirmation);
            }
            Ok(response) => response
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
            Err(e) => {
                error!(error = %e, "Sale submission failed");
                UNEXPECTED_ERROR_MESSAGE.to_string()
            }
        };

        warn!(message = %failure, "Sale not recorded");
        self.last_failure = Some(failure.clone());
        self.state = CheckoutState::Idle;
        Err(CheckoutError::SubmissionFailed(failure))
    }

    /// Assemble, send and record one submission attempt.
    ///
    /// The cart is only read; it is never modified here.
    ///
    /// # Errors
    ///
    /// See [`Checkout::begin`] and [`Checkout::complete`].
    #[instrument(skip_all, fields(lines = cart.len()))]
    pub async fn submit(
        &mut self,
        cart: &CartStore,
        options: &SaleOptions,
        policy: &TaxPolicy,
    ) -> Result<SaleConfirmation, CheckoutError> {
        let request = self.begin(cart, options, policy)?;
        let result = self.gateway.submit(&request).await;
        self.complete(result)
    }

    /// Return to `Idle` after a recorded sale so the next one can start.
    pub fn reset(&mut self) {
        if matches!(self.state, CheckoutState::Succeeded(_)) {
            self.state = CheckoutState::Idle;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use forneria_core::ProductId;

    use super::*;
    use crate::catalog::{Product, ProductCatalog};

    /// Gateway answering every call with a canned response.
    struct CannedGateway {
        response: Mutex<Option<Result<SaleResponse, GatewayError>>>,
        calls: AtomicUsize,
    }

    impl CannedGateway {
        fn new(response: Result<SaleResponse, GatewayError>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SaleGateway for CannedGateway {
        async fn submit(&self, _request: &SaleRequest) -> Result<SaleResponse, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(SaleResponse::error("no more responses")))
        }
    }

    fn cart() -> CartStore {
        let catalog = ProductCatalog::from_products(vec![
            Product::new(ProductId::new(1), "Marraqueta", Money::from_units(1000)).with_stock(4),
        ])
        .unwrap();
        let mut cart = CartStore::new(Arc::new(catalog));
        cart.add_by_identifier(ProductId::new(1)).unwrap();
        cart.add_by_identifier(ProductId::new(1)).unwrap();
        cart
    }

    fn invalid_body_error() -> GatewayError {
        GatewayError::InvalidResponse {
            status: 500,
            source: serde_json::from_str::<SaleResponse>("<html>").unwrap_err(),
        }
    }

    #[tokio::test]
    async fn test_success_navigates() {
        let visited = RefCell::new(Vec::new());
        let navigator = |c: &SaleConfirmation| visited.borrow_mut().push(c.clone());
        let redirect = Url::parse("http://localhost:8000/ventas/").unwrap();
        let mut checkout = Checkout::new(
            CannedGateway::new(Ok(SaleResponse::success(SaleId::new(77)))),
            navigator,
        )
        .with_redirect(Some(redirect.clone()));

        let confirmation = checkout
            .submit(&cart(), &SaleOptions::default(), &TaxPolicy::default())
            .await
            .unwrap();

        assert_eq!(confirmation.sale_id, Some(SaleId::new(77)));
        assert_eq!(confirmation.total, Money::from_units(2380));
        assert_eq!(confirmation.redirect_to, Some(redirect));
        assert!(matches!(checkout.state(), CheckoutState::Succeeded(_)));
        assert!(!checkout.can_submit());
        assert_eq!(visited.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_returns_to_idle_with_message() {
        let navigations = RefCell::new(0_u32);
        let mut checkout = Checkout::new(
            CannedGateway::new(Ok(SaleResponse::error("Stock insuficiente"))),
            |_: &SaleConfirmation| *navigations.borrow_mut() += 1,
        );
        let cart = cart();
        let before = cart.lines().to_vec();

        let err = checkout
            .submit(&cart, &SaleOptions::default(), &TaxPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(err, CheckoutError::SubmissionFailed("Stock insuficiente".to_string()));
        assert_eq!(checkout.state(), &CheckoutState::Idle);
        assert!(checkout.can_submit());
        assert_eq!(checkout.last_failure(), Some("Stock insuficiente"));
        assert_eq!(cart.lines(), before.as_slice());
        assert_eq!(*navigations.borrow(), 0);
    }

    #[tokio::test]
    async fn test_failure_without_message_uses_fallback() {
        let response = SaleResponse {
            status: "error".to_string(),
            message: None,
            sale_id: None,
        };
        let mut checkout =
            Checkout::new(CannedGateway::new(Ok(response)), |_: &SaleConfirmation| {});
        let err = checkout
            .submit(&cart(), &SaleOptions::default(), &TaxPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err, CheckoutError::SubmissionFailed(UNKNOWN_ERROR_MESSAGE.to_string()));
    }

    #[tokio::test]
    async fn test_transport_failure_uses_generic_message() {
        let mut checkout = Checkout::new(
            CannedGateway::new(Err(invalid_body_error())),
            |_: &SaleConfirmation| {},
        );
        let err = checkout
            .submit(&cart(), &SaleOptions::default(), &TaxPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CheckoutError::SubmissionFailed(UNEXPECTED_ERROR_MESSAGE.to_string())
        );
        assert!(checkout.can_submit());
    }

    #[tokio::test]
    async fn test_empty_cart_never_reaches_gateway() {
        let gateway = CannedGateway::new(Ok(SaleResponse::success(SaleId::new(1))));
        let mut checkout = Checkout::new(gateway, |_: &SaleConfirmation| {});
        let empty = CartStore::new(Arc::new(ProductCatalog::default()));

        let err = checkout
            .submit(&empty, &SaleOptions::default(), &TaxPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(err, CheckoutError::Rejected(SaleError::EmptyCart));
        assert_eq!(checkout.gateway().calls.load(Ordering::SeqCst), 0);
        assert_eq!(checkout.state(), &CheckoutState::Idle);
    }

    #[test]
    fn test_begin_blocks_reentry() {
        let mut checkout = Checkout::new(
            CannedGateway::new(Ok(SaleResponse::success(SaleId::new(1)))),
            |_: &SaleConfirmation| {},
        );
        let cart = cart();
        let options = SaleOptions::default();
        let policy = TaxPolicy::default();

        checkout.begin(&cart, &options, &policy).unwrap();
        assert!(matches!(checkout.state(), CheckoutState::Submitting { .. }));
        assert_eq!(
            checkout.begin(&cart, &options, &policy),
            Err(CheckoutError::AlreadySubmitting)
        );
    }

    #[test]
    fn test_complete_without_begin() {
        let mut checkout = Checkout::new(
            CannedGateway::new(Ok(SaleResponse::success(SaleId::new(1)))),
            |_: &SaleConfirmation| {},
        );
        assert_eq!(
            checkout.complete(Ok(SaleResponse::success(SaleId::new(1)))),
            Err(CheckoutError::NotSubmitting)
        );
    }

    #[test]
    fn test_reset_after_success() {
        let mut checkout = Checkout::new(
            CannedGateway::new(Ok(SaleResponse::success(SaleId::new(1)))),
            |_: &SaleConfirmation| {},
        );
        let cart = cart();
        let options = SaleOptions::default();
        let policy = TaxPolicy::default();

        checkout.begin(&cart, &options, &policy).unwrap();
        checkout
            .complete(Ok(SaleResponse::success(SaleId::new(3))))
            .unwrap();
        assert_eq!(
            checkout.begin(&cart, &options, &policy),
            Err(CheckoutError::AlreadyCompleted)
        );

        checkout.reset();
        assert!(checkout.can_submit());
        assert!(checkout.begin(&cart, &options, &policy).is_ok());
    }
}
