//! Header and label validation utilities
//!
//! Compares the labels actually present in a sheet header row against the
//! labels a schema expects, reporting missing labels as errors and unknown
//! extras as warnings.

use std::collections::HashSet;

use errors::{StockError, StockResult};
use serde::Serialize;

/// Result of a header validation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
            warnings: vec![],
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
        self.is_valid = false;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Render errors and warnings as a single human-readable block
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for e in &self.errors {
            lines.push(format!("error: {}", e));
        }
        for w in &self.warnings {
            lines.push(format!("warning: {}", w));
        }
        lines.join("\n")
    }

    /// Convert into a `Validation` error when any errors were recorded
    ///
    /// Warnings never fail the result; callers log them separately.
    pub fn into_result(self, context: &str) -> StockResult<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(StockError::Validation(format!(
                "{context}: {}",
                self.errors.join("; ")
            )))
        }
    }
}

/// Validate actual header labels against the expected set
///
/// Missing expected labels are errors; labels present in the header but not
/// expected are warnings only, since sheets often carry extra columns that
/// the importer simply ignores.
pub fn validate_header_labels(actual: &[String], expected: &[String]) -> ValidationReport {
    let mut report = ValidationReport::valid();

    let actual_set: HashSet<&str> = actual.iter().map(|s| s.as_str()).collect();
    let expected_set: HashSet<&str> = expected.iter().map(|s| s.as_str()).collect();

    for label in expected {
        if !actual_set.contains(label.as_str()) {
            report.add_error(format!("missing expected column '{}'", label));
        }
    }

    for label in actual {
        if label.is_empty() {
            continue;
        }
        if !expected_set.contains(label.as_str()) {
            report.add_warning(format!("unexpected column '{}'", label));
        }
    }

    report
}
