#![allow(dead_code)]

use std::sync::Arc;

use common::config::StoreConfig;
use manual_purchases::{
    assembler::OrderAssembler,
    model::{Customer, Download, ModelId, PriceOption, UserAccount},
    storage::memory::{
        InMemoryCatalog, InMemoryCommissions, InMemoryCustomerStore, InMemoryOrderStore, InMemoryReceipts,
        InMemoryUserDirectory, InMemoryWallet, StaticGatewayRegistry,
    },
};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

pub const EBOOK_ID: ModelId = 10;
pub const THEME_ID: ModelId = 11;
pub const COURSE_ID: ModelId = 13;

pub const THEME_TIER_A: ModelId = 1;
pub const THEME_TIER_B: ModelId = 2;

pub fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).expect("valid decimal literal")
}

pub fn test_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new(vec![
        Download {
            id: EBOOK_ID,
            name: "Field Guide".to_string(),
            price: dec("10.00"),
            prices: vec![],
            default_price_id: None,
        },
        Download {
            id: THEME_ID,
            name: "Storefront Theme".to_string(),
            price: dec("49.00"),
            prices: vec![
                PriceOption { index: THEME_TIER_A, name: "Personal".to_string(), amount: dec("12.00") },
                PriceOption { index: THEME_TIER_B, name: "Business".to_string(), amount: dec("7.50") },
            ],
            default_price_id: Some(THEME_TIER_A),
        },
        Download {
            id: COURSE_ID,
            name: "Video Course".to_string(),
            price: dec("20.00"),
            prices: vec![],
            default_price_id: None,
        },
    ])
}

pub fn test_store() -> StoreConfig {
    StoreConfig {
        use_taxes: true,
        ..StoreConfig::default()
    }
}

pub fn test_gateways() -> StaticGatewayRegistry {
    let mut registered = BTreeMap::new();
    registered.insert("paypal".to_string(), "PayPal Standard".to_string());
    StaticGatewayRegistry::new("manual_purchases", &registered)
}

/// Every in-memory collaborator wired into one assembler. The handles share
/// state with the assembler, so tests can inspect what it wrote.
pub struct Fixture {
    pub assembler: Arc<OrderAssembler>,
    pub customers: InMemoryCustomerStore,
    pub orders: InMemoryOrderStore,
    pub wallet: InMemoryWallet,
    pub receipts: InMemoryReceipts,
    pub commissions: InMemoryCommissions,
}

pub struct FixtureBuilder {
    store: StoreConfig,
    customers: Vec<Customer>,
    users: Vec<UserAccount>,
    with_capabilities: bool,
}

impl FixtureBuilder {
    pub fn new() -> Self {
        Self {
            store: test_store(),
            customers: Vec::new(),
            users: Vec::new(),
            with_capabilities: true,
        }
    }

    pub fn store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn customer(mut self, customer: Customer) -> Self {
        self.customers.push(customer);
        self
    }

    pub fn user(mut self, user: UserAccount) -> Self {
        self.users.push(user);
        self
    }

    pub fn without_capabilities(mut self) -> Self {
        self.with_capabilities = false;
        self
    }

    pub fn build(self) -> Fixture {
        let customers = InMemoryCustomerStore::with_customers(self.customers);
        let orders = InMemoryOrderStore::new();
        let wallet = InMemoryWallet::new();
        let receipts = InMemoryReceipts::new();
        let commissions = InMemoryCommissions::new();

        let mut assembler = OrderAssembler::new(
            self.store,
            Arc::new(customers.clone()),
            Arc::new(InMemoryUserDirectory::new(self.users)),
            Arc::new(test_catalog()),
            Arc::new(orders.clone()),
            Arc::new(receipts.clone()),
            Arc::new(test_gateways()),
        );
        if self.with_capabilities {
            assembler = assembler
                .with_wallet(Arc::new(wallet.clone()))
                .with_commissions(Arc::new(commissions.clone()))
                .with_shipping(Arc::new(orders.clone()));
        }

        Fixture {
            assembler: Arc::new(assembler),
            customers,
            orders,
            wallet,
            receipts,
            commissions,
        }
    }
}

pub fn fixture() -> Fixture {
    FixtureBuilder::new().build()
}

pub fn existing_customer(id: ModelId, user_id: Option<ModelId>) -> Customer {
    Customer {
        id,
        name: "Grace Hopper".to_string(),
        email: "grace@example.com".to_string(),
        user_id,
    }
}
