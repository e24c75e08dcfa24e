use rust_decimal::Decimal;
use serde::Deserialize;
use std::{collections::BTreeMap, error::Error, fs};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BackendConfig {
    pub server_address: String,
    pub log_level: String,
}

/// Shop-wide settings the order assembler reads instead of global options.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub currency: String,
    #[serde(default = "default_decimals")]
    pub decimals: u32,
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: char,
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,
    #[serde(default)]
    pub use_taxes: bool,
    #[serde(default = "default_true")]
    pub item_quantities_enabled: bool,
    /// Where the operator lands after a payment is created. May carry its own query string.
    #[serde(default = "default_payment_history_path")]
    pub payment_history_path: String,
    /// Payment method recorded when the form does not name one.
    #[serde(default = "default_gateway")]
    pub default_gateway: String,
}

fn default_decimals() -> u32 {
    2
}

fn default_thousands_separator() -> char {
    ','
}

fn default_decimal_separator() -> char {
    '.'
}

fn default_true() -> bool {
    true
}

fn default_payment_history_path() -> String {
    "/payments".to_string()
}

fn default_gateway() -> String {
    "manual_purchases".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            decimals: default_decimals(),
            thousands_separator: default_thousands_separator(),
            decimal_separator: default_decimal_separator(),
            use_taxes: false,
            item_quantities_enabled: default_true(),
            payment_history_path: default_payment_history_path(),
            default_gateway: default_gateway(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceOptionConfig {
    pub index: i64,
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownloadConfig {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub price: Decimal,
    #[serde(default)]
    pub prices: Vec<PriceOptionConfig>,
    #[serde(default)]
    pub default_price_id: Option<i64>,
}

/// Seed data for the in-memory catalog the backend binary runs against.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub downloads: Vec<DownloadConfig>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub common: CommonConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Registered payment gateways, id -> admin label.
    #[serde(default)]
    pub gateways: BTreeMap<String, String>,
}

impl Config {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let contents = fs::read_to_string(config_path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let config = serde_yml::from_str(contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const FULL_CONFIG: &str = r#"
common:
  project_name: manual_purchases
backend:
  server_address: 127.0.0.1:8090
  log_level: debug
store:
  currency: EUR
  decimals: 2
  thousands_separator: "."
  decimal_separator: ","
  use_taxes: true
  item_quantities_enabled: false
  payment_history_path: /admin/payments?view=all
catalog:
  downloads:
    - id: 10
      name: Ebook
      price: "10.00"
    - id: 11
      name: Theme
      price: "49.00"
      default_price_id: 2
      prices:
        - index: 1
          name: Personal License
          amount: "49.00"
        - index: 2
          name: Business License
          amount: "99.00"
gateways:
  paypal: PayPal Standard
  stripe: Stripe
"#;

    #[test]
    fn test_full_config_parses() {
        let config = Config::from_yaml_str(FULL_CONFIG).unwrap();

        assert_eq!(config.common.project_name, "manual_purchases");
        assert_eq!(config.backend.server_address, "127.0.0.1:8090");
        assert_eq!(config.store.currency, "EUR");
        assert_eq!(config.store.thousands_separator, '.');
        assert_eq!(config.store.decimal_separator, ',');
        assert!(config.store.use_taxes);
        assert!(!config.store.item_quantities_enabled);
        assert_eq!(config.store.payment_history_path, "/admin/payments?view=all");
        assert_eq!(config.store.default_gateway, "manual_purchases");

        assert_eq!(config.catalog.downloads.len(), 2);
        let theme = &config.catalog.downloads[1];
        assert_eq!(theme.default_price_id, Some(2));
        assert_eq!(theme.prices[1].amount, Decimal::from_str("99.00").unwrap());

        assert_eq!(config.gateways.get("stripe").map(String::as_str), Some("Stripe"));
    }

    #[test]
    fn test_store_section_defaults() {
        let config = Config::from_yaml_str(
            "common:\n  project_name: p\nbackend:\n  server_address: a\n  log_level: info\n",
        )
        .unwrap();

        assert_eq!(config.store.currency, "USD");
        assert_eq!(config.store.decimals, 2);
        assert!(config.store.item_quantities_enabled);
        assert!(!config.store.use_taxes);
        assert_eq!(config.store.payment_history_path, "/payments");
        assert!(config.catalog.downloads.is_empty());
        assert!(config.gateways.is_empty());
    }

    #[test]
    fn test_missing_backend_section_is_an_error() {
        assert!(Config::from_yaml_str("common:\n  project_name: p\n").is_err());
    }
}
