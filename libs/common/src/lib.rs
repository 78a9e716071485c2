//! `PharmStock` basic library
//!
//! Provides basic functions shared by all services, including:
//! - logging functions
//! - header/label validation

pub mod logging;
pub mod validation;

// Re-export commonly used validation types at crate root for convenience
pub use validation::{validate_header_labels, ValidationReport};

// Re-export common dependencies
pub use anyhow;
pub use serde;
pub use tracing;
