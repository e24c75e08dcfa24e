use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use strum_macros::{Display, EnumString};

pub type ModelId = i64;

pub type GenericError = Box<dyn Error + Send + Sync>;

/// Lifecycle states a payment can be recorded in.
///
/// `Complete` keeps the shop's historical wire name `publish`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    #[serde(rename = "publish", alias = "complete")]
    #[strum(to_string = "publish", serialize = "complete")]
    Complete,
    Refunded,
    Failed,
    Abandoned,
    Revoked,
    Preapproval,
    Processing,
}

impl PaymentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Complete => "Complete",
            PaymentStatus::Refunded => "Refunded",
            PaymentStatus::Failed => "Failed",
            PaymentStatus::Abandoned => "Abandoned",
            PaymentStatus::Revoked => "Revoked",
            PaymentStatus::Preapproval => "Preapproved",
            PaymentStatus::Processing => "Processing",
        }
    }
}

/// One named price point of a download, e.g. "Personal License".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceOption {
    pub index: ModelId,
    pub name: String,
    pub amount: Decimal,
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    pub id: ModelId,
    pub name: String,
    pub price: Decimal,
    pub prices: Vec<PriceOption>,
    pub default_price_id: Option<ModelId>,
}

impl Download {
    pub fn has_variable_prices(&self) -> bool {
        !self.prices.is_empty()
    }

    pub fn price_option(&self, price_id: ModelId) -> Option<&PriceOption> {
        self.prices.iter().find(|option| option.index == price_id)
    }

    /// The configured default tier, or the first tier when none is configured
    /// (or the configured one no longer exists).
    pub fn default_price_option(&self) -> Option<&PriceOption> {
        self.default_price_id
            .and_then(|id| self.price_option(id))
            .or_else(|| self.prices.first())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: ModelId,
    pub name: String,
    pub email: String,
    pub user_id: Option<ModelId>,
}

impl Customer {
    /// Splits the display name into first and last name at the first space.
    pub fn split_name(&self) -> (String, String) {
        let name = self.name.trim();
        match name.split_once(char::is_whitespace) {
            Some((first, last)) => (first.to_string(), last.trim().to_string()),
            None => (name.to_string(), String::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub user_id: Option<ModelId>,
}

/// A site login that may be linked to a customer record.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: ModelId,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gateway {
    pub id: String,
    pub admin_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub download_id: ModelId,
    pub name: String,
    pub price_id: Option<ModelId>,
    pub item_price: Decimal,
    pub quantity: u32,
    /// Tax for the whole line, already multiplied by quantity.
    pub tax: Decimal,
}

impl LineItem {
    /// `None` when the product does not fit in a `Decimal`.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.item_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Everything the order store needs to persist a payment. Stores always
/// create it as [`PaymentStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: ModelId,
    pub user_id: Option<ModelId>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub gateway: String,
    pub transaction_id: Option<String>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: ModelId,
    pub status: PaymentStatus,
    pub shipped: bool,
    #[serde(flatten)]
    pub details: NewOrder,
}

impl Order {
    pub fn new(id: ModelId, details: NewOrder) -> Self {
        Self {
            id,
            status: PaymentStatus::Pending,
            shipped: false,
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn theme() -> Download {
        Download {
            id: 11,
            name: "Theme".to_string(),
            price: Decimal::new(4900, 2),
            prices: vec![
                PriceOption { index: 1, name: "Personal".to_string(), amount: Decimal::new(4900, 2) },
                PriceOption { index: 2, name: "Business".to_string(), amount: Decimal::new(9900, 2) },
            ],
            default_price_id: Some(2),
        }
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(PaymentStatus::Complete.to_string(), "publish");
        assert_eq!(PaymentStatus::Preapproval.to_string(), "preapproval");
        assert_eq!(PaymentStatus::from_str("publish").unwrap(), PaymentStatus::Complete);
        assert_eq!(PaymentStatus::from_str("complete").unwrap(), PaymentStatus::Complete);
        assert_eq!(PaymentStatus::from_str("refunded").unwrap(), PaymentStatus::Refunded);
        assert!(PaymentStatus::from_str("shipped").is_err());
        assert_eq!(serde_json::to_string(&PaymentStatus::Complete).unwrap(), "\"publish\"");
    }

    #[test]
    fn test_default_price_option_prefers_configured_tier() {
        let download = theme();
        assert_eq!(download.default_price_option().map(|o| o.index), Some(2));

        let mut stale = theme();
        stale.default_price_id = Some(7);
        assert_eq!(stale.default_price_option().map(|o| o.index), Some(1));
    }

    #[test]
    fn test_split_name() {
        let customer = Customer {
            id: 1,
            name: "Ada King Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            user_id: None,
        };
        assert_eq!(customer.split_name(), ("Ada".to_string(), "King Lovelace".to_string()));

        let single = Customer { name: "Prince".to_string(), ..customer };
        assert_eq!(single.split_name(), ("Prince".to_string(), String::new()));
    }

    #[test]
    fn test_line_subtotal() {
        let item = LineItem {
            download_id: 10,
            name: "Ebook".to_string(),
            price_id: None,
            item_price: Decimal::new(1000, 2),
            quantity: 3,
            tax: Decimal::ZERO,
        };
        assert_eq!(item.subtotal(), Some(Decimal::new(3000, 2)));

        let huge = LineItem { item_price: Decimal::MAX, ..item };
        assert_eq!(huge.subtotal(), None);
    }
}
