//! JSON output formatting

use std::collections::BTreeMap;

use caseport_core::{CaseportError, Requirement, Severity, TestRecord, ValidationIssue};
use serde::{Deserialize, Serialize};

const SCHEMA_VERSION: &str = "1";

/// JSON response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    /// Schema version for forward compatibility
    pub schema_version: String,
    /// Command that generated this response
    pub command: String,
    /// Status: "ok" or "error"
    pub status: String,
    /// Command-specific payload
    pub data: T,
    /// Validation issues, per-file failures, etc.
    pub issues: Vec<JsonIssue>,
}

impl<T> JsonResponse<T> {
    /// Create a successful response with issues
    pub fn ok_with_issues(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "ok".to_string(),
            data,
            issues,
        }
    }

    /// Create an error response
    pub fn error(command: &str, data: T, issues: Vec<JsonIssue>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            command: command.to_string(),
            status: "error".to_string(),
            data,
            issues,
        }
    }
}

/// Issue object structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonIssue {
    /// Error/warning code (e.g., "E001")
    pub code: String,
    /// Severity level
    pub severity: String,
    /// Human-readable message
    pub message: String,
    /// File path using forward slashes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Line number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Qualified id of the offending test
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualified_id: Option<String>,
    /// Field the issue is about
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

fn slash_path(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl From<&ValidationIssue> for JsonIssue {
    fn from(issue: &ValidationIssue) -> Self {
        let severity = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        Self {
            code: issue.code.clone(),
            severity: severity.to_string(),
            message: issue.message.clone(),
            file: issue.path.as_deref().map(slash_path),
            line: None,
            qualified_id: issue.qualified_id.clone(),
            field: issue.field.clone(),
        }
    }
}

impl From<&CaseportError> for JsonIssue {
    fn from(err: &CaseportError) -> Self {
        Self {
            code: err.code().to_string(),
            severity: "error".to_string(),
            message: err.to_string(),
            file: err.path().map(slash_path),
            line: err.line(),
            qualified_id: err.qualified_id().map(str::to_string),
            field: None,
        }
    }
}

/// Data payload for collect command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectData {
    /// Collected test modules in discovery order
    pub modules: Vec<CollectedModule>,
    /// Total number of tests
    pub test_count: usize,
}

/// A test module and its tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedModule {
    /// Module file path
    pub path: String,
    pub tests: Vec<CollectedTest>,
}

/// One collected test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedTest {
    pub qualified_id: String,
    pub name: String,
    /// Line of the `def` keyword
    pub line: usize,
    pub fields: BTreeMap<String, String>,
    pub markers: Vec<String>,
    /// Paired steps and expected results, when both are set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_steps: Option<Vec<TestStep>>,
}

/// A step with its expected result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestStep {
    pub step: String,
    pub expected_result: String,
}

impl From<&TestRecord> for CollectedTest {
    fn from(record: &TestRecord) -> Self {
        Self {
            qualified_id: record.qualified_id.clone(),
            name: record.name.clone(),
            line: record.source_location.line,
            fields: record.fields.clone(),
            markers: record.markers.clone(),
            test_steps: record.test_steps().map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(step, expected_result)| TestStep {
                        step,
                        expected_result,
                    })
                    .collect()
            }),
        }
    }
}

/// Data payload for validate command
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidateData {
    /// Whether no errors were found
    pub valid: bool,
    /// Number of tests checked
    pub test_count: usize,
    /// Number of errors
    pub error_count: usize,
    /// Number of warnings
    pub warning_count: usize,
}

/// Data payload for requirements command
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequirementsData {
    pub requirements: Vec<Requirement>,
}

/// Data payload for version command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionData {
    pub version: String,
}
