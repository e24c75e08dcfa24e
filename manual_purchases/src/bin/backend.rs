use manual_purchases::{
    assembler::OrderAssembler,
    executable_utils::{AppState, initialize_executable, initialize_tracing, run_backend},
    storage::memory::{
        InMemoryCatalog, InMemoryCommissions, InMemoryCustomerStore, InMemoryOrderStore, InMemoryReceipts,
        InMemoryUserDirectory, InMemoryWallet, StaticGatewayRegistry,
    },
};
use std::{error::Error, sync::Arc};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting backend...");
    let config = initialize_executable()?;
    initialize_tracing(&config.backend.log_level);
    tracing::info!(project = %config.common.project_name, "Starting backend");

    let orders = Arc::new(InMemoryOrderStore::new());
    let assembler = OrderAssembler::new(
        config.store.clone(),
        Arc::new(InMemoryCustomerStore::new()),
        Arc::new(InMemoryUserDirectory::default()),
        Arc::new(InMemoryCatalog::from_config(&config.catalog)),
        orders.clone(),
        Arc::new(InMemoryReceipts::new()),
        Arc::new(StaticGatewayRegistry::from_config(&config)),
    )
    .with_wallet(Arc::new(InMemoryWallet::new()))
    .with_commissions(Arc::new(InMemoryCommissions::new()))
    .with_shipping(orders);

    run_backend(config.backend.clone(), AppState::new(Arc::new(assembler))).await
}
