//! Requirements referenced by collected tests

use serde::Serialize;

use crate::config::{FieldRegistry, RequirementFields};
use crate::types::Collection;

/// A requirement work item named by one or more tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub title: String,
    pub fields: RequirementFields,
    /// Qualified ids of the tests that verify this requirement
    pub verified_by: Vec<String>,
}

/// One requirement per distinct `requirement` field value, first seen first
///
/// Tests with an empty `requirement` field name no requirement.
pub fn collect_requirements(collection: &Collection, registry: &FieldRegistry) -> Vec<Requirement> {
    let mut requirements: Vec<Requirement> = Vec::new();

    for record in collection.iter_records() {
        let Some(title) = record.field("requirement").map(str::trim).filter(|t| !t.is_empty())
        else {
            continue;
        };

        if let Some(existing) = requirements.iter_mut().find(|r| r.title == title) {
            existing.verified_by.push(record.qualified_id.clone());
            continue;
        }

        let mut fields = RequirementFields::new();
        registry.apply_requirement(&mut fields);
        requirements.push(Requirement {
            title: title.to_string(),
            fields,
            verified_by: vec![record.qualified_id.clone()],
        });
    }

    tracing::debug!("derived {} requirements", requirements.len());
    requirements
}
