//! caseport-core: Core library for test metadata collection and field resolution
//!
//! This crate walks Python test trees, extracts `:field: value` metadata
//! from docstrings, resolves it across package, module, class and function
//! scopes, and applies configured defaults and transforms.

/// Core error types for caseport operations
pub mod error;

/// Core data types (TestRecord, ScopeChain, Collection, etc.)
pub mod types;

/// Structured text parsing
pub mod markup;

/// HTML rendering of structured text
pub mod html;

/// Docstring field extraction and step pairing
pub mod fields;

/// Python source parsing
pub mod python;

/// Rendering of Python expressions back to source
pub mod source_gen;

/// Marker derivation
pub mod markers;

/// Scope-chain field resolution
pub mod resolver;

/// Field registry, defaults and transforms
pub mod config;

/// Test discovery
pub mod collector;

/// Requirements derived from tests
pub mod requirement;

/// Validation logic and rules
pub mod validator;

// Re-exports for convenience
pub use collector::{collect_tests, is_test_module, CollectOptions, Collector};
pub use config::{ComputedProvider, DefaultProvider, FieldRegistry, FieldRegistryBuilder, ValueTransform};
pub use error::CaseportError;
pub use fields::{map_steps, parse_docstring};
pub use html::{parse_rst, HtmlTranslator, TableFieldListTranslator, Translator};
pub use requirement::{collect_requirements, Requirement};
pub use resolver::{resolve, Resolved};
pub use types::{Collection, Scope, ScopeChain, ScopeKind, SourceLocation, TestRecord};
pub use validator::{
    validate_collection, validate_record, Severity, ValidationIssue, ValidationResult,
};
