//! Price option lookups used by the payment form while a row is being filled in.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    error::PaymentError,
    model::{Download, ModelId, PriceOption},
    storage::DownloadCatalog,
};

/// What the form needs to render the price cell of one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceOptions {
    pub download_id: ModelId,
    pub has_variable_prices: bool,
    pub options: Vec<PriceOption>,
    /// Default tier for variable products, `None` otherwise.
    pub default_price_id: Option<ModelId>,
    /// Default tier's amount, or the fixed price.
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceOptionAmount {
    pub download_id: ModelId,
    pub price_id: ModelId,
    pub amount: Decimal,
}

pub struct PriceOptionLookup {
    catalog: Arc<dyn DownloadCatalog>,
}

impl PriceOptionLookup {
    pub fn new(catalog: Arc<dyn DownloadCatalog>) -> Self {
        Self { catalog }
    }

    async fn download(&self, download_id: ModelId) -> Result<Download, PaymentError> {
        self.catalog
            .get_download(download_id)
            .await?
            .ok_or(PaymentError::UnknownDownload(download_id))
    }

    pub async fn price_options(&self, download_id: ModelId) -> Result<PriceOptions, PaymentError> {
        let download = self.download(download_id).await?;

        let (default_price_id, amount) = match download.default_price_option() {
            Some(option) => (Some(option.index), option.amount),
            None => (None, download.price),
        };

        Ok(PriceOptions {
            download_id,
            has_variable_prices: download.has_variable_prices(),
            default_price_id,
            amount,
            options: download.prices,
        })
    }

    pub async fn price_option_amount(
        &self,
        download_id: ModelId,
        price_id: ModelId,
    ) -> Result<PriceOptionAmount, PaymentError> {
        let download = self.download(download_id).await?;
        let option = download
            .price_option(price_id)
            .ok_or(PaymentError::UnknownPriceOption { download_id, price_id })?;

        Ok(PriceOptionAmount {
            download_id,
            price_id,
            amount: option.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryCatalog;

    fn lookup() -> PriceOptionLookup {
        let catalog = InMemoryCatalog::new(vec![
            Download {
                id: 10,
                name: "Ebook".to_string(),
                price: Decimal::new(1000, 2),
                prices: vec![],
                default_price_id: None,
            },
            Download {
                id: 11,
                name: "Theme".to_string(),
                price: Decimal::ZERO,
                prices: vec![
                    PriceOption { index: 1, name: "Personal".to_string(), amount: Decimal::new(4900, 2) },
                    PriceOption { index: 2, name: "Business".to_string(), amount: Decimal::new(750, 2) },
                ],
                default_price_id: Some(2),
            },
        ]);
        PriceOptionLookup::new(Arc::new(catalog))
    }

    #[tokio::test]
    async fn test_fixed_price_download() {
        let options = lookup().price_options(10).await.unwrap();
        assert!(!options.has_variable_prices);
        assert!(options.options.is_empty());
        assert_eq!(options.default_price_id, None);
        assert_eq!(options.amount, Decimal::new(1000, 2));
    }

    #[tokio::test]
    async fn test_variable_price_download_uses_default_tier() {
        let options = lookup().price_options(11).await.unwrap();
        assert!(options.has_variable_prices);
        assert_eq!(options.options.len(), 2);
        assert_eq!(options.default_price_id, Some(2));
        assert_eq!(options.amount, Decimal::new(750, 2));
    }

    #[tokio::test]
    async fn test_tier_amount() {
        let amount = lookup().price_option_amount(11, 1).await.unwrap();
        assert_eq!(amount.amount, Decimal::new(4900, 2));

        assert!(matches!(
            lookup().price_option_amount(11, 5).await,
            Err(PaymentError::UnknownPriceOption { download_id: 11, price_id: 5 })
        ));
        assert!(matches!(lookup().price_options(99).await, Err(PaymentError::UnknownDownload(99))));
    }
}
