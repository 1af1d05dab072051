//! Validation of collected test records

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::FieldRegistry;
use crate::error::CaseportError;
use crate::fields::{map_steps, ordered_list_items};
use crate::types::{Collection, TestRecord};

/// Result of validating one or more test records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether no issue has error severity
    pub valid: bool,
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            valid: !issues.iter().any(|i| i.severity == Severity::Error),
            issues,
        }
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// A single validation issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Error/warning code (e.g., "E005", "W001")
    pub code: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Test module the issue was found in
    pub path: Option<PathBuf>,
    /// Qualified id of the offending test
    pub qualified_id: Option<String>,
    /// Field the issue is about
    pub field: Option<String>,
}

impl ValidationIssue {
    fn for_record(
        record: &TestRecord,
        code: &str,
        severity: Severity,
        field: Option<&str>,
        message: String,
    ) -> Self {
        Self {
            code: code.to_string(),
            severity,
            message,
            path: Some(record.source_location.path.clone()),
            qualified_id: Some(record.qualified_id.clone()),
            field: field.map(str::to_string),
        }
    }
}

impl From<&CaseportError> for ValidationIssue {
    fn from(err: &CaseportError) -> Self {
        Self {
            code: err.code().to_string(),
            severity: Severity::Error,
            message: err.to_string(),
            path: err.path().map(PathBuf::from),
            qualified_id: err.qualified_id().map(str::to_string),
            field: None,
        }
    }
}

/// Severity level for validation issues
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must fix
    Error,
    /// Should fix
    Warning,
}

/// Validate one defaulted test record
///
/// - E005: a required field is absent or empty
/// - W001: only one of `steps` and `expectedresults` is set
/// - W002: both are lists but could not be paired item by item
pub fn validate_record(record: &TestRecord, registry: &FieldRegistry) -> ValidationResult {
    let mut issues = Vec::new();

    for field in record.missing_fields(registry.required_fields()) {
        let err = CaseportError::MissingRequiredField {
            path: record.source_location.path.clone(),
            qualified_id: record.qualified_id.clone(),
            field: field.to_string(),
        };
        issues.push(ValidationIssue::for_record(
            record,
            err.code(),
            Severity::Error,
            Some(field),
            err.to_string(),
        ));
    }

    let steps = record.field("steps").filter(|v| !v.is_empty());
    let expected = record.field("expectedresults").filter(|v| !v.is_empty());
    match (steps, expected) {
        (Some(_), None) | (None, Some(_)) => {
            let (present, absent) = if steps.is_some() {
                ("steps", "expectedresults")
            } else {
                ("expectedresults", "steps")
            };
            issues.push(ValidationIssue::for_record(
                record,
                "W001",
                Severity::Warning,
                Some(absent),
                format!(
                    "{}: '{}' is set but '{}' is not",
                    record.qualified_id, present, absent
                ),
            ));
        }
        (Some(steps), Some(expected)) => {
            if let (Some(step_items), Some(expected_items)) =
                (ordered_list_items(steps), ordered_list_items(expected))
            {
                let pairs = map_steps(steps, expected);
                if pairs.len() != step_items.len() || step_items.len() != expected_items.len() {
                    issues.push(ValidationIssue::for_record(
                        record,
                        "W002",
                        Severity::Warning,
                        Some("steps"),
                        format!(
                            "{}: {} steps but {} expected results; kept as a single pair",
                            record.qualified_id,
                            step_items.len(),
                            expected_items.len()
                        ),
                    ));
                }
            }
        }
        (None, None) => {}
    }

    ValidationResult::from_issues(issues)
}

/// Validate every record of a collection, plus its per-file errors
pub fn validate_collection(collection: &Collection, registry: &FieldRegistry) -> ValidationResult {
    let mut issues: Vec<ValidationIssue> =
        collection.errors.iter().map(ValidationIssue::from).collect();
    for record in collection.iter_records() {
        issues.extend(validate_record(record, registry).issues);
    }
    ValidationResult::from_issues(issues)
}
