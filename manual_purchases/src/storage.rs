use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::model::{Customer, Download, Gateway, GenericError, ModelId, NewCustomer, NewOrder, Order, PaymentStatus, UserAccount};

pub mod memory;

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_by_id(&self, customer_id: ModelId) -> Result<Option<Customer>, GenericError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, GenericError>;
    async fn create(&self, customer: NewCustomer) -> Result<Customer, GenericError>;
}

/// Site logins, used to link a new customer to an existing account.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, GenericError>;
}

#[async_trait]
pub trait DownloadCatalog: Send + Sync {
    async fn get_download(&self, download_id: ModelId) -> Result<Option<Download>, GenericError>;
}

/// Order persistence. `create` always stores the order as pending.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create(&self, order: &NewOrder) -> Result<ModelId, GenericError>;
    async fn update_status(&self, order_id: ModelId, status: PaymentStatus) -> Result<(), GenericError>;
    async fn get(&self, order_id: ModelId) -> Result<Option<Order>, GenericError>;
}

/// Store credit attached to a user account.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn balance(&self, user_id: ModelId) -> Result<Decimal, GenericError>;
    async fn withdraw(&self, user_id: ModelId, amount: Decimal, order_id: ModelId) -> Result<(), GenericError>;
}

#[async_trait]
pub trait CommissionRecorder: Send + Sync {
    async fn record_commissions(&self, order: &Order) -> Result<(), GenericError>;
}

#[async_trait]
pub trait ShippingTracker: Send + Sync {
    async fn mark_shipped(&self, order_id: ModelId) -> Result<(), GenericError>;
}

/// Hook that emails the purchase receipt when an order completes.
#[async_trait]
pub trait ReceiptTrigger: Send + Sync {
    async fn suppress_receipt(&self, order_id: ModelId) -> Result<(), GenericError>;
}

pub trait GatewayRegistry: Send + Sync {
    fn gateways(&self) -> Vec<Gateway>;

    fn is_registered(&self, gateway_id: &str) -> bool {
        self.gateways().iter().any(|gateway| gateway.id == gateway_id)
    }
}
