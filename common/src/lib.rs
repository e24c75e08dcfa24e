//! Shared pieces of the manual purchases workspace
//!
//! - Configuration loading (store settings, backend settings, seed catalog)
//! - YAML `!include` resolution used by the build scripts
//! - Test errors, assertion macros and request builders

pub mod config;
pub mod yaml_include;

// Test helpers module - available for both development and test builds
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(any(test, feature = "test-helpers"))]
pub use test_helpers::{generate_unique_email, generate_unique_id, TestError, TestResult};
