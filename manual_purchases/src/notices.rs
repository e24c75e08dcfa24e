use serde::Serialize;

pub const MESSAGE_QUERY_KEY: &str = "edd-message";
pub const PAYMENT_CREATED_MESSAGE: &str = "payment_created";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub id: &'static str,
    pub class: &'static str,
    pub text: &'static str,
}

/// The notice to render for the `edd-message` query value, if any.
pub fn payment_created_notice(message: Option<&str>) -> Option<Notice> {
    match message {
        Some(PAYMENT_CREATED_MESSAGE) => Some(Notice {
            id: "edd-payment-created",
            class: "updated",
            text: "The payment has been created.",
        }),
        _ => None,
    }
}

/// Payment history location carrying the success flag.
pub fn payment_created_redirect(history_path: &str) -> String {
    let separator = if history_path.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", history_path, separator, MESSAGE_QUERY_KEY, PAYMENT_CREATED_MESSAGE)
}
