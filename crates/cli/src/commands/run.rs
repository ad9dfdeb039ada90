//! Scripted register session.
//!
//! Replays cashier actions from a text file, one per line. Blank lines are
//! ignored, and a `#` at the start of a word begins a comment, so `folio B#12`
//! keeps its `#`.
//!
//! ```text
//! add 1                      # one unit of product 1
//! qty 1 3                    # quantity field typed "3"
//! discount 1 10              # 10% off the line
//! remove 1
//! customer 7                 # or `customer none`
//! tender efectivo 5000       # single method
//! tender mixto 1000 2000 0   # cash, debit, credit
//! folio B-00123              # or `folio none`
//! show
//! submit
//! ```
//!
//! Without `--submit`, `submit` logs the sale request instead of sending it.
//! A rejected action is logged and the session carries on, the same way the
//! register shows an alert and keeps the cart.
//!
//! # Environment Variables
//!
//! See [`forneria_pos::config`]; `POS_SALE_URL` is required with `--submit`.

use std::path::Path;
use std::sync::Arc;

use forneria_core::{CustomerId, Money, PaymentMethod, ProductId};
use forneria_pos::catalog::{CatalogError, ProductCatalog};
use forneria_pos::checkout::{Checkout, Navigator, SaleConfirmation};
use forneria_pos::config::{ConfigError, PosConfig};
use forneria_pos::gateway::{GatewayError, HttpSaleGateway, SaleGateway, SaleResponse};
use forneria_pos::register::{CartSnapshot, Register};
use forneria_pos::sale::{SaleRequest, Tender};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that stop a session.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to set up sales gateway: {0}")]
    Gateway(#[from] GatewayError),
}

/// A script line that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct ScriptError {
    pub line: usize,
    pub reason: String,
}

/// One cashier action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(ProductId),
    Quantity(ProductId, String),
    Discount(ProductId, Decimal),
    Remove(ProductId),
    Customer(Option<CustomerId>),
    Tender(Option<Tender>),
    Folio(Option<String>),
    Show,
    Submit,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let verb = words.next().ok_or("empty command")?;
        let args: Vec<&str> = words.collect();

        match (verb.to_lowercase().as_str(), args.as_slice()) {
            ("add", [id]) => Ok(Self::Add(parse_id(id)?)),
            // The raw text goes through the same sanitizer as the quantity field.
            ("qty", [id, raw]) => Ok(Self::Quantity(parse_id(id)?, (*raw).to_string())),
            ("discount", [id, pct]) => Ok(Self::Discount(parse_id(id)?, parse_decimal(pct)?)),
            ("remove", [id]) => Ok(Self::Remove(parse_id(id)?)),
            ("customer", [value]) if is_none(value) => Ok(Self::Customer(None)),
            ("customer", [id]) => id
                .parse::<CustomerId>()
                .map(|customer| Self::Customer(Some(customer)))
                .map_err(|e| format!("invalid customer id {id:?}: {e}")),
            ("tender", [value]) if is_none(value) => Ok(Self::Tender(None)),
            ("tender", [method, amounts @ ..]) => parse_tender(method, amounts).map(Self::Tender),
            ("folio", []) => Err("usage: folio TEXT".to_string()),
            ("folio", [value]) if is_none(value) => Ok(Self::Folio(None)),
            ("folio", text) => Ok(Self::Folio(Some(text.join(" ")))),
            ("show", []) => Ok(Self::Show),
            ("submit", []) => Ok(Self::Submit),
            (
                "add" | "qty" | "discount" | "remove" | "customer" | "tender" | "show" | "submit",
                _,
            ) => Err(format!("wrong number of arguments for {verb:?}")),
            _ => Err(format!("unknown command {verb:?}")),
        }
    }
}

/// Parse a whole script, skipping blank lines and `#` comments.
///
/// # Errors
///
/// Returns the first line that does not parse, with its 1-based number.
pub fn parse_script(script: &str) -> Result<Vec<Command>, ScriptError> {
    script
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = strip_comment(line).trim();
            (!line.is_empty()).then_some((index + 1, line))
        })
        .map(|(line, text)| {
            text.parse::<Command>().map_err(|reason| ScriptError { line, reason })
        })
        .collect()
}

/// Run a script against a catalog.
///
/// # Errors
///
/// Returns `RunError` if the catalog or script cannot be loaded, or if
/// `submit` is requested without a usable sales endpoint.
pub async fn run(catalog_path: &Path, script_path: &Path, submit: bool) -> Result<(), RunError> {
    let catalog = Arc::new(ProductCatalog::load(catalog_path)?);
    let commands = parse_script(&std::fs::read_to_string(script_path)?)?;
    let config = PosConfig::from_env()?;

    info!(
        products = catalog.len(),
        commands = commands.len(),
        "Starting register session"
    );

    let mut register = Register::with_options(catalog, config.tax, config.sale_options());
    let navigator = |confirmation: &SaleConfirmation| {
        if let Some(url) = &confirmation.redirect_to {
            info!("Continue at {url}");
        }
    };

    if submit {
        let endpoint = config.require_sale_url()?.clone();
        let gateway = HttpSaleGateway::from_config(&config, endpoint)?;
        let mut checkout =
            Checkout::new(gateway, navigator).with_redirect(config.sales_list_url.clone());
        execute(&mut register, &mut checkout, commands).await;
    } else {
        let mut checkout = Checkout::new(DryRunGateway, navigator);
        execute(&mut register, &mut checkout, commands).await;
    }

    Ok(())
}

/// Apply every command in order.
async fn execute<G, N>(
    register: &mut Register,
    checkout: &mut Checkout<G, N>,
    commands: Vec<Command>,
) where
    G: SaleGateway,
    N: Navigator,
{
    for command in commands {
        match command {
            Command::Add(id) => match register.on_add(id) {
                Ok(snapshot) => info!("Added {id}: total {}", snapshot.totals.total),
                Err(e) => warn!("{e}"),
            },
            Command::Quantity(id, raw) => {
                let snapshot = register.on_quantity_change(id, &raw);
                info!("Quantity of {id} set: total {}", snapshot.totals.total);
            }
            Command::Discount(id, pct) => {
                let snapshot = register.on_discount_change(id, pct);
                info!("Discount on {id} set: total {}", snapshot.totals.total);
            }
            Command::Remove(id) => {
                let snapshot = register.on_remove(id);
                info!("Removed {id}: {} lines left", snapshot.lines.len());
            }
            Command::Customer(customer) => register.select_customer(customer),
            Command::Tender(tender) => register.set_tender(tender),
            Command::Folio(folio) => register.set_folio(folio),
            Command::Show => show(&register.snapshot(), register.options().tender.as_ref()),
            Command::Submit => match register.on_submit(checkout).await {
                Ok(confirmation) => match confirmation.sale_id {
                    Some(id) => info!("Sale #{id} recorded, total {}", confirmation.total),
                    None => info!("Sale recorded, total {}", confirmation.total),
                },
                Err(e) => warn!("{e}"),
            },
        }
    }
}

/// Log the cart the way the register table shows it.
fn show(snapshot: &CartSnapshot, tender: Option<&Tender>) {
    if snapshot.lines.is_empty() {
        info!("Cart is empty");
        return;
    }

    for line in &snapshot.lines {
        info!(
            "[{}] {} x{} @ {} -{} = {}",
            line.product_id,
            line.name,
            line.quantity,
            line.unit_price,
            line.discount,
            line.subtotal()
        );
    }
    info!(
        "{} items | net {} | tax {} | total {}",
        snapshot.item_count, snapshot.totals.net, snapshot.totals.tax, snapshot.totals.total
    );

    if let Some(tender) = tender {
        let total = snapshot.totals.total;
        info!(
            "{} tendered {} | change {} | balance due {}",
            tender.method,
            tender.tendered(),
            tender.change(total),
            tender.balance_due(total)
        );
    }
}

/// Stands in for the sales backend when not submitting.
struct DryRunGateway;

impl SaleGateway for DryRunGateway {
    async fn submit(&self, request: &SaleRequest) -> Result<SaleResponse, GatewayError> {
        match serde_json::to_string_pretty(request) {
            Ok(json) => info!("Dry run, would send:\n{json}"),
            Err(e) => warn!("Could not render sale request: {e}"),
        }
        Ok(SaleResponse {
            status: SaleResponse::SUCCESS.to_string(),
            message: None,
            sale_id: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Cut `line` at the first `#` that starts a word.
fn strip_comment(line: &str) -> &str {
    let mut previous = ' ';
    for (index, c) in line.char_indices() {
        if c == '#' && previous.is_whitespace() {
            return line.get(..index).unwrap_or(line);
        }
        previous = c;
    }
    line
}

fn is_none(value: &str) -> bool {
    value.eq_ignore_ascii_case("none")
}

fn parse_id(value: &str) -> Result<ProductId, String> {
    value
        .parse()
        .map_err(|e| format!("invalid product id {value:?}: {e}"))
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    value
        .parse()
        .map_err(|e| format!("invalid number {value:?}: {e}"))
}

fn parse_amount(value: &str) -> Result<Money, String> {
    parse_decimal(value).map(Money::new)
}

fn parse_tender(method: &str, amounts: &[&str]) -> Result<Option<Tender>, String> {
    let method: PaymentMethod = method.parse()?;
    let tender = match (method, amounts) {
        (PaymentMethod::Mixed, [cash, debit, credit]) => Tender::mixed(
            parse_amount(cash)?,
            parse_amount(debit)?,
            parse_amount(credit)?,
        ),
        (PaymentMethod::Mixed, _) => {
            return Err("usage: tender mixto CASH DEBIT CREDIT".to_string());
        }
        (_, [amount]) => Tender::single(method, parse_amount(amount)?),
        _ => return Err(format!("usage: tender {method} AMOUNT")),
    };
    Ok(Some(tender))
}
