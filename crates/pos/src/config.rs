//! Register configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required for submission
//! - `POS_SALE_URL` - Sales backend endpoint receiving the sale JSON
//!
//! ## Optional
//! - `POS_SALES_LIST_URL` - Page to navigate to after a recorded sale
//! - `POS_CSRF_TOKEN` - Value sent in the `X-CSRFToken` header
//! - `POS_TAX_RATE` - Tax rate as a fraction (default: 0.19)
//! - `POS_TAX_BASE` - `rounded` or `unrounded` net as tax base (default: rounded)
//! - `POS_SALES_CHANNEL` - `TIENDA` or `ONLINE` (default: TIENDA)
//! - `POS_DEFAULT_CUSTOMER_ID` - Customer used when none is selected (default: 1)
//! - `POS_REQUIRE_CUSTOMER` - Refuse sales without a selected customer (default: false)
//! - `POS_REQUEST_TIMEOUT_SECS` - Sale request timeout (default: 30)

use std::time::Duration;

use forneria_core::{CustomerId, SalesChannel};
use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::sale::SaleOptions;
use crate::totals::{TaxBase, TaxPolicy};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Register configuration.
///
/// Implements `Debug` manually to redact the CSRF token.
#[derive(Clone)]
pub struct PosConfig {
    /// Sales backend endpoint
    pub sale_url: Option<Url>,
    /// Redirect target after a recorded sale
    pub sales_list_url: Option<Url>,
    /// CSRF token forwarded to the sales backend
    pub csrf_token: Option<SecretString>,
    /// Tax rate and base
    pub tax: TaxPolicy,
    /// Channel recorded on every sale
    pub channel: SalesChannel,
    /// Customer used when the cashier selects none
    pub default_customer: CustomerId,
    /// Whether a customer must be selected explicitly
    pub require_customer: bool,
    /// Timeout for the sale request
    pub request_timeout: Duration,
}

impl std::fmt::Debug for PosConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosConfig")
            .field("sale_url", &self.sale_url.as_ref().map(Url::as_str))
            .field("sales_list_url", &self.sales_list_url.as_ref().map(Url::as_str))
            .field("csrf_token", &self.csrf_token.as_ref().map(|_| "[REDACTED]"))
            .field("tax", &self.tax)
            .field("channel", &self.channel)
            .field("default_customer", &self.default_customer)
            .field("require_customer", &self.require_customer)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for PosConfig {
    fn default() -> Self {
        Self {
            sale_url: None,
            sales_list_url: None,
            csrf_token: None,
            tax: TaxPolicy::default(),
            channel: SalesChannel::default(),
            default_customer: CustomerId::WALK_IN,
            require_customer: false,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

impl PosConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable is present but
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a variable cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Lookup(lookup);

        let rate = env.parse_or("POS_TAX_RATE", TaxPolicy::DEFAULT_RATE)?;
        if rate.is_sign_negative() || rate > Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "POS_TAX_RATE".to_string(),
                format!("must be between 0 and 1 (got {rate})"),
            ));
        }
        let base = env.parse_or("POS_TAX_BASE", TaxBase::default())?;

        Ok(Self {
            sale_url: env.parse_optional("POS_SALE_URL")?,
            sales_list_url: env.parse_optional("POS_SALES_LIST_URL")?,
            csrf_token: env.get("POS_CSRF_TOKEN").map(SecretString::from),
            tax: TaxPolicy::new(rate, base),
            channel: env.parse_or("POS_SALES_CHANNEL", SalesChannel::default())?,
            default_customer: env.parse_or("POS_DEFAULT_CUSTOMER_ID", CustomerId::WALK_IN)?,
            require_customer: env.parse_or("POS_REQUIRE_CUSTOMER", false)?,
            request_timeout: Duration::from_secs(
                env.parse_or("POS_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            ),
        })
    }

    /// The sales endpoint, required before anything can be submitted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `POS_SALE_URL` was not set.
    pub fn require_sale_url(&self) -> Result<&Url, ConfigError> {
        self.sale_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("POS_SALE_URL".to_string()))
    }

    /// Sale options seeded from configuration.
    ///
    /// When a customer is required no default is filled in, so the cashier
    /// has to pick one.
    #[must_use]
    pub fn sale_options(&self) -> SaleOptions {
        SaleOptions {
            customer: (!self.require_customer).then_some(self.default_customer),
            require_customer: self.require_customer,
            channel: self.channel,
            ..SaleOptions::default()
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Lookup<F>(F);

impl<F: Fn(&str) -> Option<String>> Lookup<F> {
    /// Get a variable, treating blank values as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Parse a variable, or fall back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_optional(key)?.unwrap_or(default))
    }

    /// Parse a variable if present.
    fn parse_optional<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value
                    .trim()
                    .parse::<T>()
                    .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
            })
            .transpose()
    }
}
