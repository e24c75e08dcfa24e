use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use common::config::StoreConfig;
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use std::{sync::Arc, time::Instant};
#[cfg(not(test))]
use tracing::{debug, info, warn};
#[cfg(test)]
use {println as debug, println as info, println as warn};

use crate::{
    error::PaymentError,
    form::{CustomerIdentity, LineItemRequest, PaymentRequest},
    model::{Customer, LineItem, ModelId, NewCustomer, NewOrder, Order, PaymentStatus},
    money::{CurrencyFormat, InvalidAmount},
    storage::{
        CommissionRecorder, CustomerStore, DownloadCatalog, GatewayRegistry, OrderStore, ReceiptTrigger,
        ShippingTracker, UserDirectory, WalletProvider,
    },
};

const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Picks the purchase date for a submission.
///
/// Accepts RFC 3339, `yyyy-mm-dd HH:MM:SS`, `yyyy-mm-dd` and the datepicker's
/// `mm/dd/yyyy`. Date-only values mean midnight UTC. Anything unparseable or
/// later than `now` resolves to `now`.
pub fn resolve_purchase_date(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return now;
    };

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|d| d.and_utc())
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
        });

    match parsed {
        Some(date) if date <= now => date,
        _ => now,
    }
}

struct PricedItems {
    items: Vec<LineItem>,
    subtotal: Decimal,
    tax: Decimal,
}

fn too_large(field: impl Into<String>, value: impl ToString) -> PaymentError {
    PaymentError::invalid_amount(field, InvalidAmount(value.to_string()))
}

/// Turns a decoded payment submission into a persisted order.
pub struct OrderAssembler {
    store: StoreConfig,
    format: CurrencyFormat,
    customers: Arc<dyn CustomerStore>,
    users: Arc<dyn UserDirectory>,
    catalog: Arc<dyn DownloadCatalog>,
    orders: Arc<dyn OrderStore>,
    receipts: Arc<dyn ReceiptTrigger>,
    gateways: Arc<dyn GatewayRegistry>,
    wallet: Option<Arc<dyn WalletProvider>>,
    commissions: Option<Arc<dyn CommissionRecorder>>,
    shipping: Option<Arc<dyn ShippingTracker>>,
}

impl OrderAssembler {
    pub fn new(
        store: StoreConfig,
        customers: Arc<dyn CustomerStore>,
        users: Arc<dyn UserDirectory>,
        catalog: Arc<dyn DownloadCatalog>,
        orders: Arc<dyn OrderStore>,
        receipts: Arc<dyn ReceiptTrigger>,
        gateways: Arc<dyn GatewayRegistry>,
    ) -> Self {
        info!("Initializing order assembler for currency {}", store.currency);
        Self {
            format: CurrencyFormat::from_store(&store),
            store,
            customers,
            users,
            catalog,
            orders,
            receipts,
            gateways,
            wallet: None,
            commissions: None,
            shipping: None,
        }
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn WalletProvider>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn with_commissions(mut self, commissions: Arc<dyn CommissionRecorder>) -> Self {
        self.commissions = Some(commissions);
        self
    }

    pub fn with_shipping(mut self, shipping: Arc<dyn ShippingTracker>) -> Self {
        self.shipping = Some(shipping);
        self
    }

    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    pub fn catalog(&self) -> Arc<dyn DownloadCatalog> {
        self.catalog.clone()
    }

    /// Validates, prices and persists one payment.
    ///
    /// Every failure ends the request. Nothing is rolled back: once the order
    /// is created, later side-effect failures leave it in place.
    pub async fn create_payment(&self, request: PaymentRequest) -> Result<Order, PaymentError> {
        let started = Instant::now();
        let result = self.assemble(request).await;
        histogram!("manual_purchases_create_payment_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                counter!("manual_purchases_payments_created_total", "status" => order.status.to_string()).increment(1);
            }
            Err(e) => debug!("Payment was not created: {}", e),
        }
        result
    }

    async fn assemble(&self, request: PaymentRequest) -> Result<Order, PaymentError> {
        let line_requests: Vec<&LineItemRequest> = request
            .downloads
            .iter()
            .filter(|item| matches!(item.download_id, Some(id) if id > 0))
            .collect();
        if line_requests.is_empty() {
            return Err(PaymentError::MissingDownloads);
        }

        let identity = match &request.customer {
            Some(CustomerIdentity::New { email, .. }) if email.trim().is_empty() => {
                return Err(PaymentError::MissingCustomer);
            }
            Some(identity) => identity,
            None => return Err(PaymentError::MissingCustomer),
        };

        let status = request.parse_status()?;
        let gateway = self.resolve_gateway(request.gateway.as_deref())?;
        let priced = self.price_items(&line_requests).await?;

        let override_total = match request.amount.as_deref() {
            Some(raw) => self
                .format
                .sanitize_amount(raw)
                .map_err(|e| PaymentError::invalid_amount("amount", e))?,
            None => None,
        };
        let total = match override_total {
            Some(total) => total,
            None => priced
                .subtotal
                .checked_add(priced.tax)
                .ok_or_else(|| too_large("total", priced.subtotal))?,
        };

        let (customer, first_name, last_name) = self.resolve_customer(identity).await?;

        if request.pay_from_wallet {
            self.check_wallet(&customer, total).await?;
        }

        let details = NewOrder {
            customer_id: customer.id,
            user_id: customer.user_id,
            email: customer.email.clone(),
            first_name,
            last_name,
            items: priced.items,
            subtotal: priced.subtotal,
            tax: priced.tax,
            total,
            currency: self.store.currency.clone(),
            gateway,
            transaction_id: request.transaction_id.clone(),
            date: resolve_purchase_date(request.date.as_deref(), Utc::now()),
        };

        let order_id = self.orders.create(&details).await?;
        info!("Created pending order {} for customer {} with total {}", order_id, customer.id, total);

        let mut order = Order::new(order_id, details);
        self.apply_side_effects(&mut order, &customer, status, &request).await?;

        Ok(order)
    }

    fn resolve_gateway(&self, requested: Option<&str>) -> Result<String, PaymentError> {
        let gateway = requested
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(self.store.default_gateway.as_str());

        if !self.gateways.is_registered(gateway) {
            return Err(PaymentError::UnknownGateway(gateway.to_string()));
        }
        Ok(gateway.to_string())
    }

    async fn price_items(&self, requests: &[&LineItemRequest]) -> Result<PricedItems, PaymentError> {
        let mut priced = PricedItems {
            items: Vec::with_capacity(requests.len()),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
        };

        for request in requests {
            let Some(download_id) = request.download_id else {
                continue;
            };
            let download = self
                .catalog
                .get_download(download_id)
                .await?
                .ok_or(PaymentError::UnknownDownload(download_id))?;

            let quantity = if self.store.item_quantities_enabled {
                request.quantity.unwrap_or(1).max(1)
            } else {
                1
            };

            let (catalog_price, name) = match request.price_id {
                Some(price_id) => {
                    let option = download.price_option(price_id).ok_or(PaymentError::UnknownPriceOption {
                        download_id,
                        price_id,
                    })?;
                    (option.amount, format!("{} - {}", download.name, option.name))
                }
                None => (download.price, download.name.clone()),
            };

            let explicit_price = match request.amount.as_deref() {
                Some(raw) => self
                    .format
                    .sanitize_amount(raw)
                    .map_err(|e| PaymentError::invalid_amount(format!("amount of download {}", download_id), e))?,
                None => None,
            };
            let item_price = explicit_price.unwrap_or_else(|| self.format.round(catalog_price));

            let unit_tax = match request.tax.as_deref() {
                Some(raw) if self.store.use_taxes => self
                    .format
                    .sanitize_amount(raw)
                    .map_err(|e| PaymentError::invalid_amount(format!("tax of download {}", download_id), e))?
                    .unwrap_or_default(),
                Some(_) => {
                    debug!("Taxes are disabled, ignoring tax on download {}", download_id);
                    Decimal::ZERO
                }
                None => Decimal::ZERO,
            };

            let line_tax = unit_tax
                .checked_mul(Decimal::from(quantity))
                .ok_or_else(|| too_large(format!("tax of download {}", download_id), unit_tax))?;
            let item = LineItem {
                download_id,
                name,
                price_id: request.price_id,
                item_price,
                quantity,
                tax: self.format.round(line_tax),
            };
            debug!(
                "Priced download {} at {} x {} with tax {}",
                download_id, item.item_price, item.quantity, item.tax
            );

            let line_subtotal = item
                .subtotal()
                .ok_or_else(|| too_large(format!("amount of download {}", download_id), item.item_price))?;
            priced.subtotal = priced
                .subtotal
                .checked_add(line_subtotal)
                .ok_or_else(|| too_large("subtotal", line_subtotal))?;
            priced.tax = priced
                .tax
                .checked_add(item.tax)
                .ok_or_else(|| too_large("tax", item.tax))?;
            priced.items.push(item);
        }

        Ok(priced)
    }

    /// Finds or creates the buyer and returns the first and last name to put
    /// on the order.
    async fn resolve_customer(&self, identity: &CustomerIdentity) -> Result<(Customer, String, String), PaymentError> {
        match identity {
            CustomerIdentity::Existing(customer_id) => {
                let customer = self
                    .customers
                    .find_by_id(*customer_id)
                    .await?
                    .ok_or(PaymentError::MissingCustomer)?;
                let (first, last) = customer.split_name();
                Ok((customer, first, last))
            }
            CustomerIdentity::New {
                email,
                first_name,
                last_name,
            } => {
                let email = email.trim();
                if let Some(customer) = self.customers.find_by_email(email).await? {
                    debug!("Reusing customer {} for {}", customer.id, email);
                    let (stored_first, stored_last) = customer.split_name();
                    let first = if first_name.is_empty() { stored_first } else { first_name.clone() };
                    let last = if last_name.is_empty() { stored_last } else { last_name.clone() };
                    return Ok((customer, first, last));
                }

                let user = self.users.find_user_by_email(email).await?;
                let customer = self
                    .customers
                    .create(NewCustomer {
                        name: format!("{} {}", first_name, last_name).trim().to_string(),
                        email: email.to_string(),
                        user_id: user.map(|u| u.id),
                    })
                    .await?;
                info!("Created customer {} for {}", customer.id, customer.email);
                Ok((customer, first_name.clone(), last_name.clone()))
            }
        }
    }

    async fn check_wallet(&self, customer: &Customer, total: Decimal) -> Result<(), PaymentError> {
        let Some(wallet) = &self.wallet else {
            warn!("Wallet payment requested but no wallet provider is configured");
            return Ok(());
        };

        let balance = match customer.user_id {
            Some(user_id) => wallet.balance(user_id).await?,
            None => Decimal::ZERO,
        };
        if balance < total {
            return Err(PaymentError::InsufficientFunds { balance, total });
        }
        Ok(())
    }

    async fn apply_side_effects(
        &self,
        order: &mut Order,
        customer: &Customer,
        status: PaymentStatus,
        request: &PaymentRequest,
    ) -> Result<(), PaymentError> {
        let order_id: ModelId = order.id;

        if !request.send_receipt {
            self.receipts.suppress_receipt(order_id).await?;
        }

        if status != PaymentStatus::Pending {
            self.orders.update_status(order_id, status).await?;
            order.status = status;
            info!("Order {} moved to status {}", order_id, status);
        }

        if request.pay_from_wallet {
            match (&self.wallet, customer.user_id) {
                (Some(wallet), Some(user_id)) => {
                    wallet.withdraw(user_id, order.details.total, order_id).await?;
                    info!("Debited {} from wallet of user {}", order.details.total, user_id);
                }
                (Some(_), None) => warn!("Customer {} has no user account, wallet not debited", customer.id),
                (None, _) => {}
            }
        }

        if request.shipped {
            match &self.shipping {
                Some(shipping) => {
                    shipping.mark_shipped(order_id).await?;
                    order.shipped = true;
                }
                None => warn!("Shipping requested for order {} but no shipping tracker is configured", order_id),
            }
        }

        if request.record_commission {
            match &self.commissions {
                Some(commissions) => commissions.record_commissions(order).await?,
                None => warn!("Commission requested for order {} but no recorder is configured", order_id),
            }
        }

        Ok(())
    }
}
