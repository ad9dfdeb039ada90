//! Enums describing how a sale was made and paid.

use serde::{Deserialize, Serialize};

/// Sales channel recorded on every sale.
///
/// Maps to the backend's `canal_venta` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesChannel {
    /// Walk-in sale at the shop counter.
    #[default]
    #[serde(rename = "TIENDA")]
    Store,
    Online,
}

impl std::fmt::Display for SalesChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store => write!(f, "TIENDA"),
            Self::Online => write!(f, "ONLINE"),
        }
    }
}

impl std::str::FromStr for SalesChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TIENDA" | "STORE" => Ok(Self::Store),
            "ONLINE" => Ok(Self::Online),
            _ => Err(format!("invalid sales channel: {s}")),
        }
    }
}

/// Payment method chosen at the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(rename = "efectivo")]
    Cash,
    #[serde(rename = "debito")]
    Debit,
    #[serde(rename = "credito")]
    Credit,
    /// Split across cash, debit and credit.
    #[serde(rename = "mixto")]
    Mixed,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "efectivo"),
            Self::Debit => write!(f, "debito"),
            Self::Credit => write!(f, "credito"),
            Self::Mixed => write!(f, "mixto"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "efectivo" | "cash" => Ok(Self::Cash),
            "debito" | "debit" => Ok(Self::Debit),
            "credito" | "credit" => Ok(Self::Credit),
            "mixto" | "mixed" => Ok(Self::Mixed),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_channel_wire_names() {
        assert_eq!(serde_json::to_string(&SalesChannel::Store).unwrap(), "\"TIENDA\"");
        assert_eq!(serde_json::to_string(&SalesChannel::Online).unwrap(), "\"ONLINE\"");
    }

    #[test]
    fn test_sales_channel_from_str() {
        assert_eq!("tienda".parse::<SalesChannel>().unwrap(), SalesChannel::Store);
        assert_eq!("ONLINE".parse::<SalesChannel>().unwrap(), SalesChannel::Online);
        assert!("phone".parse::<SalesChannel>().is_err());
    }

    #[test]
    fn test_payment_method_from_str_accepts_both_languages() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!("Debito".parse::<PaymentMethod>().unwrap(), PaymentMethod::Debit);
        assert_eq!("mixto".parse::<PaymentMethod>().unwrap(), PaymentMethod::Mixed);
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_payment_method_display_matches_wire() {
        for method in [
            PaymentMethod::Cash,
            PaymentMethod::Debit,
            PaymentMethod::Credit,
            PaymentMethod::Mixed,
        ] {
            let json = serde_json::to_string(&method).unwrap();
            assert_eq!(json, format!("\"{method}\""));
        }
    }
}
