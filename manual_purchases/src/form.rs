//! Decoding of the "Create Payment" form submission.
//!
//! The body is `application/x-www-form-urlencoded` with one repeated row per
//! line item (`downloads[1][id]`, `downloads[1][amount]`, ...). Amounts stay raw
//! strings here; the assembler sanitizes them against the store currency.

use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use crate::error::PaymentError;
use crate::model::{ModelId, PaymentStatus};

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

static DOWNLOAD_FIELD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^downloads\[([^\]]+)\]\[([a-z_]+)\]$").expect("valid row pattern"));

/// Strips markup and surrounding whitespace from a free-text field and
/// collapses internal runs of whitespace.
pub fn sanitize_text_field(raw: &str) -> String {
    let stripped = TAG_PATTERN.replace_all(raw, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lenient non-negative integer parsing; blank or malformed input is `None`.
fn parse_id(raw: &str) -> Option<ModelId> {
    sanitize_text_field(raw).parse::<ModelId>().ok().filter(|id| *id > 0)
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        sanitize_text_field(raw).to_ascii_lowercase().as_str(),
        "1" | "on" | "yes" | "true"
    )
}

fn non_empty(raw: &str) -> Option<String> {
    let cleaned = sanitize_text_field(raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// One submitted row of the downloads table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemRequest {
    /// `None` for the empty placeholder row.
    pub download_id: Option<ModelId>,
    pub price_id: Option<ModelId>,
    pub amount: Option<String>,
    pub tax: Option<String>,
    pub quantity: Option<u32>,
}

impl LineItemRequest {
    pub fn new(download_id: ModelId) -> Self {
        Self {
            download_id: Some(download_id),
            ..Self::default()
        }
    }

    pub fn with_price_id(mut self, price_id: ModelId) -> Self {
        self.price_id = Some(price_id);
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_tax(mut self, tax: impl Into<String>) -> Self {
        self.tax = Some(tax.into());
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    fn set_field(&mut self, field: &str, value: &str) {
        match field {
            "id" => self.download_id = parse_id(value),
            "price_id" => self.price_id = sanitize_text_field(value).parse().ok(),
            "amount" => self.amount = non_empty(value),
            "tax" => self.tax = non_empty(value),
            "quantity" => self.quantity = sanitize_text_field(value).parse().ok(),
            _ => {}
        }
    }
}

/// Who the payment is for.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerIdentity {
    Existing(ModelId),
    New {
        email: String,
        first_name: String,
        last_name: String,
    },
}

/// A decoded payment submission, ready for the order assembler.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub downloads: Vec<LineItemRequest>,
    pub customer: Option<CustomerIdentity>,
    /// Explicit total overriding the computed one.
    pub amount: Option<String>,
    /// Raw status as submitted; `None` means pending.
    pub status: Option<String>,
    pub gateway: Option<String>,
    pub transaction_id: Option<String>,
    pub date: Option<String>,
    pub send_receipt: bool,
    pub shipped: bool,
    pub pay_from_wallet: bool,
    pub record_commission: bool,
}

impl PaymentRequest {
    pub fn new(downloads: Vec<LineItemRequest>, customer: CustomerIdentity) -> Self {
        Self {
            downloads,
            customer: Some(customer),
            amount: None,
            status: Some(PaymentStatus::Complete.to_string()),
            gateway: None,
            transaction_id: None,
            date: None,
            send_receipt: true,
            shipped: false,
            pay_from_wallet: false,
            record_commission: false,
        }
    }

    /// The status to move the order to once it exists. A missing status
    /// means pending; an unrecognised one is rejected.
    pub fn parse_status(&self) -> Result<PaymentStatus, PaymentError> {
        match self.status.as_deref() {
            Some(raw) => PaymentStatus::from_str(raw).map_err(|_| PaymentError::InvalidStatus(raw.to_string())),
            None => Ok(PaymentStatus::Pending),
        }
    }

    /// Decodes a urlencoded form body.
    ///
    /// Rows keep the order in which their keys first appear. Unchecked
    /// checkboxes are simply absent from the body, so every flag defaults to off.
    pub fn from_form_body(body: &str) -> Result<Self, PaymentError> {
        let mut rows: Vec<(String, LineItemRequest)> = Vec::new();
        let mut customer_id = None;
        let mut email = String::new();
        let mut first_name = String::new();
        let mut last_name = String::new();

        let mut request = Self {
            downloads: Vec::new(),
            customer: None,
            amount: None,
            status: None,
            gateway: None,
            transaction_id: None,
            date: None,
            send_receipt: false,
            shipped: false,
            pay_from_wallet: false,
            record_commission: false,
        };

        for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
            if let Some(captures) = DOWNLOAD_FIELD_PATTERN.captures(&key) {
                let row_key = captures[1].to_string();
                let position = match rows.iter().position(|(k, _)| *k == row_key) {
                    Some(position) => position,
                    None => {
                        rows.push((row_key, LineItemRequest::default()));
                        rows.len() - 1
                    }
                };
                rows[position].1.set_field(&captures[2], &value);
                continue;
            }

            match key.as_ref() {
                "customer" => customer_id = parse_id(&value),
                "email" => email = sanitize_text_field(&value),
                "first" => first_name = sanitize_text_field(&value),
                "last" => last_name = sanitize_text_field(&value),
                "amount" => request.amount = non_empty(&value),
                "status" => request.status = non_empty(&value),
                "gateway" => request.gateway = non_empty(&value),
                "transaction_id" => request.transaction_id = non_empty(&value),
                "date" => request.date = non_empty(&value),
                "receipt" => request.send_receipt = parse_flag(&value),
                "shipped" => request.shipped = parse_flag(&value),
                "wallet" => request.pay_from_wallet = parse_flag(&value),
                "commission" => request.record_commission = parse_flag(&value),
                _ => {}
            }
        }

        request.downloads = rows.into_iter().map(|(_, row)| row).collect();
        request.customer = match customer_id {
            Some(id) => Some(CustomerIdentity::Existing(id)),
            None if !email.is_empty() => Some(CustomerIdentity::New {
                email,
                first_name,
                last_name,
            }),
            None => None,
        };

        Ok(request)
    }
}
