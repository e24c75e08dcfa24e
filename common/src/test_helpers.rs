//! Shared Test Helpers for Cross-Crate Use
//!
//! This module provides centralized test utilities used by the `common` and
//! `manual_purchases` test suites.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// Global counter for truly unique test identifiers across parallel tests
static GLOBAL_TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

fn millis_since_epoch() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Generate globally unique test identifiers that won't conflict across parallel tests
///
/// # Arguments
/// * `prefix` - A string prefix to identify the test type (e.g., "CUSTOMER", "YAML")
///
/// # Returns
/// A unique string in the format: "{prefix}-{timestamp}-{counter}"
pub fn generate_unique_id(prefix: &str) -> String {
    let counter = GLOBAL_TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", prefix, millis_since_epoch(), counter)
}

/// Generate a unique, well-formed customer email address.
pub fn generate_unique_email(local_prefix: &str) -> String {
    format!("{}@example.com", generate_unique_id(local_prefix).to_lowercase())
}

// =============================================================================
// UNIFIED TEST ERROR HANDLING
// =============================================================================

/// Unified error type for all test failures
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("Mock failure: {message}")]
    MockFailure { message: String },

    #[error("Assertion failed: {message}")]
    AssertionFailure { message: String },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("HTTP error: {source}")]
    HttpError {
        #[from]
        source: http::Error,
    },

    #[error("Generic test error: {message}")]
    Generic { message: String },
}

impl TestError {
    pub fn mock_failure(message: impl Into<String>) -> Self {
        Self::MockFailure { message: message.into() }
    }

    pub fn assertion_failure(message: impl Into<String>) -> Self {
        Self::AssertionFailure { message: message.into() }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic { message: message.into() }
    }
}

/// Alias for the standard test result type
pub type TestResult<T = ()> = Result<T, TestError>;

/// Helper macro for test assertions that return TestError instead of panicking
#[macro_export]
macro_rules! test_assert {
    ($condition:expr) => {
        if !($condition) {
            return Err($crate::test_helpers::TestError::assertion_failure(
                format!("assertion failed: {}", stringify!($condition))
            ));
        }
    };
    ($condition:expr, $message:expr $(, $arg:expr)*) => {
        if !($condition) {
            return Err($crate::test_helpers::TestError::assertion_failure(
                format!($message $(, $arg)*)
            ));
        }
    };
}

/// Helper macro for test assertions with equality
#[macro_export]
macro_rules! test_assert_eq {
    ($left:expr, $right:expr) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    return Err($crate::test_helpers::TestError::assertion_failure(
                        format!("assertion failed: `(left == right)`\n  left: `{:?}`,\n right: `{:?}`",
                                left_val, right_val)
                    ));
                }
            }
        }
    };
    ($left:expr, $right:expr, $message:expr $(, $arg:expr)*) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    return Err($crate::test_helpers::TestError::assertion_failure(
                        format!($message $(, $arg)*)
                    ));
                }
            }
        }
    };
}

/// Utility functions for common test operations
pub mod test_utils {
    use super::*;

    pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

    /// Request builder for `application/x-www-form-urlencoded` submissions.
    ///
    /// Pairs are percent-encoded in the order given, so repeated row keys such as
    /// `downloads[1][id]` keep their submission order.
    pub fn build_form_request(uri: &str, fields: &[(&str, &str)]) -> TestResult<http::Request<String>> {
        let body = encode_form(fields);
        let request = http::Request::builder()
            .uri(uri)
            .method("POST")
            .header(http::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .map_err(TestError::from)?;
        Ok(request)
    }

    /// Plain GET request builder
    pub fn build_get_request(uri: &str) -> TestResult<http::Request<String>> {
        http::Request::builder()
            .uri(uri)
            .method("GET")
            .body(String::new())
            .map_err(TestError::from)
    }

    /// Encode pairs the way a browser submits a form.
    pub fn encode_form(fields: &[(&str, &str)]) -> String {
        fields
            .iter()
            .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn percent_encode(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for byte in raw.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'*' => {
                    out.push(byte as char)
                }
                b' ' => out.push('+'),
                other => out.push_str(&format!("%{:02X}", other)),
            }
        }
        out
    }

    /// Safe response status check
    pub fn check_status_code(actual: http::StatusCode, expected: http::StatusCode) -> TestResult<()> {
        if actual != expected {
            return Err(TestError::assertion_failure(format!(
                "Status code mismatch: expected {}, got {}",
                expected, actual
            )));
        }
        Ok(())
    }

    /// Safe error containment check
    pub fn check_error_contains(error: &dyn std::error::Error, expected_substring: &str) -> TestResult<()> {
        let error_msg = error.to_string();
        if !error_msg.contains(expected_substring) {
            return Err(TestError::assertion_failure(format!(
                "Error message '{}' does not contain '{}'",
                error_msg, expected_substring
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::*;
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_unique_id() {
        let mut ids = HashSet::new();
        for i in 0..1000 {
            let id = generate_unique_id(&format!("TEST-{}", i));
            assert!(ids.insert(id.clone()), "Duplicate ID generated: {}", id);
        }
    }

    #[test]
    fn test_generate_unique_email_is_lowercase_and_distinct() {
        let first = generate_unique_email("Buyer");
        let second = generate_unique_email("Buyer");
        assert_ne!(first, second);
        assert!(first.ends_with("@example.com"));
        assert_eq!(first, first.to_lowercase());
    }

    #[test]
    fn test_encode_form_escapes_brackets_and_spaces() {
        let body = encode_form(&[("downloads[1][id]", "10"), ("first", "Ada Lovelace")]);
        assert_eq!(body, "downloads%5B1%5D%5Bid%5D=10&first=Ada+Lovelace");
    }

    #[test]
    fn test_build_form_request_sets_content_type() -> TestResult {
        let request = build_form_request("/payments/create", &[("email", "a@b.c")])?;
        test_assert_eq!(request.method().as_str(), "POST");
        test_assert_eq!(
            request.headers().get(http::header::CONTENT_TYPE).map(|v| v.as_bytes()),
            Some(FORM_CONTENT_TYPE.as_bytes())
        );
        test_assert_eq!(request.body().as_str(), "email=a%40b.c");
        Ok(())
    }

    #[test]
    fn test_check_status_code_reports_mismatch() {
        let err = check_status_code(http::StatusCode::OK, http::StatusCode::SEE_OTHER).unwrap_err();
        assert!(err.to_string().contains("expected 303 See Other, got 200 OK"));
    }
}
