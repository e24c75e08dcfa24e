//! In-memory collaborators backing the standalone backend and the test suites.

use async_trait::async_trait;
use common::config::{CatalogConfig, Config};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::model::{
    Customer, Download, Gateway, GenericError, ModelId, NewCustomer, NewOrder, Order, PaymentStatus, PriceOption,
    UserAccount,
};
use crate::storage::{
    CommissionRecorder, CustomerStore, DownloadCatalog, GatewayRegistry, OrderStore, ReceiptTrigger, ShippingTracker,
    UserDirectory, WalletProvider,
};

pub const MANUAL_GATEWAY_LABEL: &str = "Manual Payment";

#[derive(Default)]
struct CustomerTable {
    rows: Vec<Customer>,
    next_id: ModelId,
}

#[derive(Clone, Default)]
pub struct InMemoryCustomerStore {
    table: Arc<Mutex<CustomerTable>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customers(customers: Vec<Customer>) -> Self {
        let next_id = customers.iter().map(|c| c.id).max().unwrap_or(0);
        Self {
            table: Arc::new(Mutex::new(CustomerTable { rows: customers, next_id })),
        }
    }

    pub async fn all(&self) -> Vec<Customer> {
        self.table.lock().await.rows.clone()
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn find_by_id(&self, customer_id: ModelId) -> Result<Option<Customer>, GenericError> {
        let table = self.table.lock().await;
        Ok(table.rows.iter().find(|c| c.id == customer_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, GenericError> {
        let table = self.table.lock().await;
        Ok(table.rows.iter().find(|c| c.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn create(&self, customer: NewCustomer) -> Result<Customer, GenericError> {
        let mut table = self.table.lock().await;
        if table.rows.iter().any(|c| c.email.eq_ignore_ascii_case(&customer.email)) {
            return Err(format!("Customer with email {} already exists", customer.email).into());
        }
        table.next_id += 1;
        let created = Customer {
            id: table.next_id,
            name: customer.name,
            email: customer.email,
            user_id: customer.user_id,
        };
        table.rows.push(created.clone());
        Ok(created)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryUserDirectory {
    users: Arc<Vec<UserAccount>>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<UserAccount>) -> Self {
        Self { users: Arc::new(users) }
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, GenericError> {
        Ok(self.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    downloads: Arc<BTreeMap<ModelId, Download>>,
}

impl InMemoryCatalog {
    pub fn new(downloads: Vec<Download>) -> Self {
        Self {
            downloads: Arc::new(downloads.into_iter().map(|d| (d.id, d)).collect()),
        }
    }

    pub fn from_config(catalog: &CatalogConfig) -> Self {
        let downloads = catalog
            .downloads
            .iter()
            .map(|d| Download {
                id: d.id,
                name: d.name.clone(),
                price: d.price,
                prices: d
                    .prices
                    .iter()
                    .map(|p| PriceOption {
                        index: p.index,
                        name: p.name.clone(),
                        amount: p.amount,
                    })
                    .collect(),
                default_price_id: d.default_price_id,
            })
            .collect();
        Self::new(downloads)
    }
}

#[async_trait]
impl DownloadCatalog for InMemoryCatalog {
    async fn get_download(&self, download_id: ModelId) -> Result<Option<Download>, GenericError> {
        Ok(self.downloads.get(&download_id).cloned())
    }
}

#[derive(Default)]
struct OrderTable {
    rows: BTreeMap<ModelId, Order>,
    next_id: ModelId,
}

/// Orders kept in insertion order. Also tracks the shipped flag.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    table: Arc<Mutex<OrderTable>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Order> {
        self.table.lock().await.rows.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.table.lock().await.rows.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &NewOrder) -> Result<ModelId, GenericError> {
        let mut table = self.table.lock().await;
        table.next_id += 1;
        let id = table.next_id;
        table.rows.insert(id, Order::new(id, order.clone()));
        Ok(id)
    }

    async fn update_status(&self, order_id: ModelId, status: PaymentStatus) -> Result<(), GenericError> {
        let mut table = self.table.lock().await;
        let order = table
            .rows
            .get_mut(&order_id)
            .ok_or_else(|| format!("Order {} not found", order_id))?;
        order.status = status;
        Ok(())
    }

    async fn get(&self, order_id: ModelId) -> Result<Option<Order>, GenericError> {
        Ok(self.table.lock().await.rows.get(&order_id).cloned())
    }
}

#[async_trait]
impl ShippingTracker for InMemoryOrderStore {
    async fn mark_shipped(&self, order_id: ModelId) -> Result<(), GenericError> {
        let mut table = self.table.lock().await;
        let order = table
            .rows
            .get_mut(&order_id)
            .ok_or_else(|| format!("Order {} not found", order_id))?;
        order.shipped = true;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Withdrawal {
    pub user_id: ModelId,
    pub amount: Decimal,
    pub order_id: ModelId,
}

#[derive(Default)]
struct WalletLedger {
    balances: HashMap<ModelId, Decimal>,
    withdrawals: Vec<Withdrawal>,
}

#[derive(Clone, Default)]
pub struct InMemoryWallet {
    ledger: Arc<Mutex<WalletLedger>>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn deposit(&self, user_id: ModelId, amount: Decimal) {
        let mut ledger = self.ledger.lock().await;
        *ledger.balances.entry(user_id).or_default() += amount;
    }

    pub async fn withdrawals(&self) -> Vec<Withdrawal> {
        self.ledger.lock().await.withdrawals.clone()
    }
}

#[async_trait]
impl WalletProvider for InMemoryWallet {
    async fn balance(&self, user_id: ModelId) -> Result<Decimal, GenericError> {
        let ledger = self.ledger.lock().await;
        Ok(ledger.balances.get(&user_id).copied().unwrap_or_default())
    }

    async fn withdraw(&self, user_id: ModelId, amount: Decimal, order_id: ModelId) -> Result<(), GenericError> {
        let mut ledger = self.ledger.lock().await;
        let balance = ledger.balances.entry(user_id).or_default();
        if *balance < amount {
            return Err(format!("Wallet of user {} holds {} but {} was requested", user_id, balance, amount).into());
        }
        *balance -= amount;
        ledger.withdrawals.push(Withdrawal { user_id, amount, order_id });
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCommissions {
    recorded: Arc<Mutex<Vec<ModelId>>>,
}

impl InMemoryCommissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded_orders(&self) -> Vec<ModelId> {
        self.recorded.lock().await.clone()
    }
}

#[async_trait]
impl CommissionRecorder for InMemoryCommissions {
    async fn record_commissions(&self, order: &Order) -> Result<(), GenericError> {
        self.recorded.lock().await.push(order.id);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryReceipts {
    suppressed: Arc<Mutex<HashSet<ModelId>>>,
}

impl InMemoryReceipts {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_suppressed(&self, order_id: ModelId) -> bool {
        self.suppressed.lock().await.contains(&order_id)
    }
}

#[async_trait]
impl ReceiptTrigger for InMemoryReceipts {
    async fn suppress_receipt(&self, order_id: ModelId) -> Result<(), GenericError> {
        self.suppressed.lock().await.insert(order_id);
        Ok(())
    }
}

/// Gateways known at startup. The store's default gateway is always present.
#[derive(Clone, Debug)]
pub struct StaticGatewayRegistry {
    gateways: Vec<Gateway>,
}

impl StaticGatewayRegistry {
    pub fn new(default_gateway: &str, registered: &BTreeMap<String, String>) -> Self {
        let mut gateways = vec![Gateway {
            id: default_gateway.to_string(),
            admin_label: MANUAL_GATEWAY_LABEL.to_string(),
        }];
        gateways.extend(
            registered
                .iter()
                .filter(|(id, _)| id.as_str() != default_gateway)
                .map(|(id, label)| Gateway {
                    id: id.clone(),
                    admin_label: label.clone(),
                }),
        );
        Self { gateways }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.store.default_gateway, &config.gateways)
    }
}

impl GatewayRegistry for StaticGatewayRegistry {
    fn gateways(&self) -> Vec<Gateway> {
        self.gateways.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::{DownloadConfig, PriceOptionConfig};

    #[tokio::test]
    async fn test_customer_store_assigns_ids_after_seed() {
        let store = InMemoryCustomerStore::with_customers(vec![Customer {
            id: 7,
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            user_id: None,
        }]);

        let created = store
            .create(NewCustomer {
                name: "Grace Hopper".to_string(),
                email: "grace@example.com".to_string(),
                user_id: Some(3),
            })
            .await
            .unwrap();

        assert_eq!(created.id, 8);
        assert_eq!(store.find_by_email("GRACE@example.com").await.unwrap(), Some(created));
        assert!(store.find_by_id(7).await.unwrap().is_some());
        assert!(store.find_by_id(9).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_customer_store_rejects_duplicate_email() {
        let store = InMemoryCustomerStore::new();
        let new = NewCustomer {
            name: String::new(),
            email: "dup@example.com".to_string(),
            user_id: None,
        };
        store.create(new.clone()).await.unwrap();
        assert!(store.create(new).await.is_err());
    }

    #[tokio::test]
    async fn test_catalog_from_config() {
        let catalog = InMemoryCatalog::from_config(&CatalogConfig {
            downloads: vec![DownloadConfig {
                id: 11,
                name: "Theme".to_string(),
                price: Decimal::new(4900, 2),
                prices: vec![PriceOptionConfig {
                    index: 2,
                    name: "Business".to_string(),
                    amount: Decimal::new(9900, 2),
                }],
                default_price_id: Some(2),
            }],
        });

        let download = catalog.get_download(11).await.unwrap().unwrap();
        assert_eq!(download.price_option(2).map(|p| p.amount), Some(Decimal::new(9900, 2)));
        assert!(catalog.get_download(12).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wallet_refuses_overdraft() {
        let wallet = InMemoryWallet::new();
        wallet.deposit(1, Decimal::new(1000, 2)).await;

        assert!(wallet.withdraw(1, Decimal::new(1500, 2), 99).await.is_err());
        wallet.withdraw(1, Decimal::new(400, 2), 99).await.unwrap();

        assert_eq!(wallet.balance(1).await.unwrap(), Decimal::new(600, 2));
        assert_eq!(wallet.balance(2).await.unwrap(), Decimal::ZERO);
        assert_eq!(wallet.withdrawals().await.len(), 1);
    }

    #[test]
    fn test_gateway_registry_always_has_default() {
        let mut registered = BTreeMap::new();
        registered.insert("paypal".to_string(), "PayPal Standard".to_string());
        let registry = StaticGatewayRegistry::new("manual_purchases", &registered);

        assert!(registry.is_registered("manual_purchases"));
        assert!(registry.is_registered("paypal"));
        assert!(!registry.is_registered("stripe"));
        assert_eq!(registry.gateways()[0].admin_label, MANUAL_GATEWAY_LABEL);
    }
}
