use http::StatusCode;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::model::{GenericError, ModelId};
use crate::money::InvalidAmount;

/// Everything that halts a payment submission.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Please select at least one download to add to the payment.")]
    MissingDownloads,

    #[error("Please select a customer or enter the email address of a new customer.")]
    MissingCustomer,

    #[error(
        "The customer does not have sufficient funds in their wallet to pay for this purchase \
         (balance {balance}, total {total})."
    )]
    InsufficientFunds { balance: Decimal, total: Decimal },

    #[error("Invalid {field}: {source}")]
    InvalidAmount {
        field: String,
        #[source]
        source: InvalidAmount,
    },

    #[error("Download {0} does not exist.")]
    UnknownDownload(ModelId),

    #[error("Download {download_id} has no price option {price_id}.")]
    UnknownPriceOption { download_id: ModelId, price_id: ModelId },

    #[error("Payment method '{0}' is not registered.")]
    UnknownGateway(String),

    #[error("'{0}' is not a valid payment status.")]
    InvalidStatus(String),

    #[error("{0}")]
    Collaborator(#[from] GenericError),
}

impl PaymentError {
    pub fn invalid_amount(field: impl Into<String>, source: InvalidAmount) -> Self {
        Self::InvalidAmount {
            field: field.into(),
            source,
        }
    }

    /// Whether the operator can fix this by changing the submission.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, PaymentError::Collaborator(_))
    }

    pub fn status_code(&self) -> StatusCode {
        if self.is_user_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
