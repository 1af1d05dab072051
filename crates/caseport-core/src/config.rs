//! Field vocabulary, default values and value transforms
//!
//! A [`FieldRegistry`] declares which fields a test case (and a requirement)
//! carries, how absent fields get a default value and how values are
//! normalized. Registries are built once and never mutated afterwards;
//! a user configuration is another registry layered on top of
//! [`FieldRegistry::builtin`].
//!
//! Configuration files are TOML with upper-case top-level keys:
//!
//! ```toml
//! TESTCASE_CUSTOM_FIELDS = ["arch", "component"]
//! MARKERS_IGNORE_LIST = ["parametrize", "skipif"]
//! DEFAULT_COMPONENT_VALUE = "core"
//! DEFAULT_TITLE_VALUE = { computed = "qualified-id" }
//! TRANSFORM_COMPONENT_VALUE = "upper"
//! DEFAULT_REQUIREMENT_PRIORITY_VALUE = "medium"
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CaseportError;
use crate::html::{parse_rst, HtmlTranslator};
use crate::markers::DEFAULT_IGNORE_LIST;
use crate::types::TestRecord;

/// Default `automation_script` format
pub const DEFAULT_AUTOMATION_SCRIPT_FORMAT: &str = "{path}#{line_number}";

const TESTCASE_FIELDS: &[&str] = &[
    "approvers",
    "assignee",
    "description",
    "duedate",
    "expectedresults",
    "id",
    "initialestimate",
    "parametrized",
    "requirement",
    "status",
    "steps",
    "title",
];

const TESTCASE_CUSTOM_FIELDS: &[&str] = &[
    "arch",
    "automation_script",
    "caseautomation",
    "casecomponent",
    "caseimportance",
    "caselevel",
    "caseposneg",
    "setup",
    "subcomponent",
    "subtype1",
    "subtype2",
    "tags",
    "tcmsarguments",
    "tcmsbug",
    "tcmscaseid",
    "tcmscategory",
    "tcmscomponent",
    "tcmsnotes",
    "tcmsplan",
    "tcmsreference",
    "tcmsrequirement",
    "tcmsscript",
    "tcmstag",
    "teardown",
    "testtier",
    "testtype",
    "upstream",
    "variant",
];

const REQUIREMENT_FIELDS: &[&str] = &[
    "approvers",
    "assignee",
    "categories",
    "description",
    "duedate",
    "id",
    "initialestimate",
    "plannedin",
    "priority",
    "severity",
    "status",
    "title",
];

const REQUIREMENT_CUSTOM_FIELDS: &[&str] = &["reqtype"];

/// Computes a default value from a test record
pub type ComputedDefault = Arc<dyn Fn(&TestRecord) -> Option<String> + Send + Sync>;

/// Rewrites a field value
pub type Transform = Arc<dyn Fn(&str, &TestRecord) -> String + Send + Sync>;

/// Built-in computed defaults, selectable from configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComputedProvider {
    /// The test function name
    Name,
    /// The dotted qualified id
    QualifiedId,
    /// The test docstring rendered as HTML
    Description,
    /// "negative" when the test name mentions it, else "positive"
    CasePosneg,
    /// The source location, per the registry's automation script format
    AutomationScript,
    /// The dotted module path
    ModulePath,
}

impl ComputedProvider {
    fn compute(self, record: &TestRecord, registry: &FieldRegistry) -> String {
        match self {
            ComputedProvider::Name => record.name.clone(),
            ComputedProvider::QualifiedId => record.qualified_id.clone(),
            ComputedProvider::Description => {
                parse_rst(record.doc_text.as_deref(), &HtmlTranslator).html
            }
            ComputedProvider::CasePosneg => {
                if record.name.to_lowercase().contains("negative") {
                    "negative".to_string()
                } else {
                    "positive".to_string()
                }
            }
            ComputedProvider::AutomationScript => registry
                .automation_script_format()
                .replace("{path}", &record.source_location.path.display().to_string())
                .replace("{line_number}", &record.source_location.line.to_string())
                .replace("{qualified_id}", &record.qualified_id)
                .replace("{name}", &record.name),
            ComputedProvider::ModulePath => record.module_path.clone(),
        }
    }
}

/// Where the default value of an absent field comes from
#[derive(Clone)]
pub enum DefaultProvider {
    Constant(String),
    Builtin(ComputedProvider),
    Computed(ComputedDefault),
}

impl fmt::Debug for DefaultProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultProvider::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            DefaultProvider::Builtin(provider) => f.debug_tuple("Builtin").field(provider).finish(),
            DefaultProvider::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Named value transforms, selectable from configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueTransform {
    Lower,
    Upper,
    Strip,
    Identity,
}

impl ValueTransform {
    pub fn apply(self, value: &str) -> String {
        match self {
            ValueTransform::Lower => value.to_lowercase(),
            ValueTransform::Upper => value.to_uppercase(),
            ValueTransform::Strip => value.trim().to_string(),
            ValueTransform::Identity => value.to_string(),
        }
    }

    fn into_transform(self) -> Transform {
        Arc::new(move |value: &str, _: &TestRecord| self.apply(value))
    }
}

/// A requirement work item's default and transformed fields
pub type RequirementFields = IndexMap<String, String>;

/// Declared fields, defaults and transforms
///
/// Settings left undeclared fall back to the registry underneath when
/// layered, and to empty values otherwise.
#[derive(Clone, Default)]
pub struct FieldRegistry {
    testcase_fields: Option<Vec<String>>,
    testcase_custom_fields: Option<Vec<String>>,
    requirement_fields: Option<Vec<String>>,
    requirement_custom_fields: Option<Vec<String>>,
    marker_ignore_list: Option<Vec<String>>,
    required_fields: Option<Vec<String>>,
    automation_script_format: Option<String>,
    defaults: IndexMap<String, DefaultProvider>,
    transforms: IndexMap<String, Transform>,
    requirement_defaults: IndexMap<String, String>,
    requirement_transforms: IndexMap<String, ValueTransform>,
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("testcase_fields", &self.testcase_fields())
            .field("testcase_custom_fields", &self.testcase_custom_fields())
            .field("marker_ignore_list", &self.marker_ignore_list())
            .field("required_fields", &self.required_fields())
            .field("defaults", &self.defaults)
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .field("requirement_defaults", &self.requirement_defaults)
            .field("requirement_transforms", &self.requirement_transforms)
            .finish()
    }
}

fn to_lower_vec<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_lowercase())
        .collect()
}

impl FieldRegistry {
    /// Start an empty registry
    pub fn builder() -> FieldRegistryBuilder {
        FieldRegistryBuilder {
            registry: FieldRegistry::default(),
        }
    }

    /// Start from the built-in registry
    pub fn builtin_builder() -> FieldRegistryBuilder {
        FieldRegistry::builder()
            .testcase_fields(TESTCASE_FIELDS)
            .custom_fields(TESTCASE_CUSTOM_FIELDS)
            .requirement_fields(REQUIREMENT_FIELDS)
            .requirement_custom_fields(REQUIREMENT_CUSTOM_FIELDS)
            .marker_ignore_list(DEFAULT_IGNORE_LIST)
            .required_fields(["id"])
            .automation_script_format(DEFAULT_AUTOMATION_SCRIPT_FORMAT)
            .builtin_default("automation_script", ComputedProvider::AutomationScript)
            .default_value("caseautomation", "automated")
            .default_value("casecomponent", "-")
            .default_value("caseimportance", "medium")
            .default_value("caselevel", "component")
            .builtin_default("caseposneg", ComputedProvider::CasePosneg)
            .builtin_default("description", ComputedProvider::Description)
            .default_value("parametrized", "no")
            .default_value("subtype1", "-")
            .default_value("testtype", "functional")
            .builtin_default("title", ComputedProvider::Name)
            .default_value("upstream", "no")
            .value_transform("caseautomation", ValueTransform::Lower)
            .value_transform("casecomponent", ValueTransform::Lower)
            .value_transform("caseimportance", ValueTransform::Lower)
            .value_transform("caselevel", ValueTransform::Lower)
            .value_transform("caseposneg", ValueTransform::Lower)
            .value_transform("parametrized", ValueTransform::Lower)
            .value_transform("subtype1", ValueTransform::Lower)
            .value_transform("testtype", ValueTransform::Lower)
            .value_transform("upstream", ValueTransform::Lower)
            .requirement_default("priority", "high")
            .requirement_default("severity", "should_have")
            .requirement_default("status", "approved")
            .requirement_default("reqtype", "functional")
            .requirement_transform("priority", ValueTransform::Lower)
            .requirement_transform("severity", ValueTransform::Lower)
            .requirement_transform("status", ValueTransform::Lower)
            .requirement_transform("reqtype", ValueTransform::Lower)
    }

    /// The built-in registry
    pub fn builtin() -> FieldRegistry {
        FieldRegistry::builtin_builder().build()
    }

    pub fn testcase_fields(&self) -> &[String] {
        self.testcase_fields.as_deref().unwrap_or_default()
    }

    pub fn testcase_custom_fields(&self) -> &[String] {
        self.testcase_custom_fields.as_deref().unwrap_or_default()
    }

    pub fn requirement_fields(&self) -> &[String] {
        self.requirement_fields.as_deref().unwrap_or_default()
    }

    pub fn requirement_custom_fields(&self) -> &[String] {
        self.requirement_custom_fields.as_deref().unwrap_or_default()
    }

    /// Marker names left out of the `markers` field
    pub fn marker_ignore_list(&self) -> &[String] {
        self.marker_ignore_list.as_deref().unwrap_or_default()
    }

    /// Fields every test case must end up with
    pub fn required_fields(&self) -> &[String] {
        self.required_fields.as_deref().unwrap_or_default()
    }

    pub fn automation_script_format(&self) -> &str {
        self.automation_script_format
            .as_deref()
            .unwrap_or(DEFAULT_AUTOMATION_SCRIPT_FORMAT)
    }

    pub fn default_for(&self, field: &str) -> Option<&DefaultProvider> {
        self.defaults.get(&field.to_lowercase())
    }

    pub fn has_transform(&self, field: &str) -> bool {
        self.transforms.contains_key(&field.to_lowercase())
    }

    /// Whether a field is part of the declared test case vocabulary
    pub fn is_known_field(&self, field: &str) -> bool {
        let field = field.to_lowercase();
        self.testcase_fields().contains(&field) || self.testcase_custom_fields().contains(&field)
    }

    /// Apply another registry's declarations on top of this one
    ///
    /// Each setting and each field's default or transform declared by
    /// `overrides` replaces this registry's.
    pub fn layer(&self, overrides: &FieldRegistry) -> FieldRegistry {
        let mut merged = self.clone();
        let pick = |over: &Option<Vec<String>>, base: &Option<Vec<String>>| {
            over.clone().or_else(|| base.clone())
        };
        merged.testcase_fields = pick(&overrides.testcase_fields, &self.testcase_fields);
        merged.testcase_custom_fields =
            pick(&overrides.testcase_custom_fields, &self.testcase_custom_fields);
        merged.requirement_fields = pick(&overrides.requirement_fields, &self.requirement_fields);
        merged.requirement_custom_fields = pick(
            &overrides.requirement_custom_fields,
            &self.requirement_custom_fields,
        );
        merged.marker_ignore_list = pick(&overrides.marker_ignore_list, &self.marker_ignore_list);
        merged.required_fields = pick(&overrides.required_fields, &self.required_fields);
        if overrides.automation_script_format.is_some() {
            merged.automation_script_format = overrides.automation_script_format.clone();
        }

        for (field, provider) in &overrides.defaults {
            merged.defaults.insert(field.clone(), provider.clone());
        }
        for (field, transform) in &overrides.transforms {
            merged.transforms.insert(field.clone(), transform.clone());
        }
        for (field, value) in &overrides.requirement_defaults {
            merged.requirement_defaults.insert(field.clone(), value.clone());
        }
        for (field, transform) in &overrides.requirement_transforms {
            merged.requirement_transforms.insert(field.clone(), *transform);
        }
        merged
    }

    /// Fill absent fields with defaults, then transform every present field
    ///
    /// Only fields of the declared test case vocabulary are defaulted.
    /// Defaults never replace a resolved value, including an empty one.
    /// Computed defaults see the record as it was before any default was
    /// applied.
    pub fn apply(&self, record: &mut TestRecord) {
        let snapshot = record.clone();
        let vocabulary = self
            .testcase_fields()
            .iter()
            .chain(self.testcase_custom_fields());
        for field in vocabulary {
            if record.fields.contains_key(field) {
                continue;
            }
            let Some(provider) = self.defaults.get(field) else {
                continue;
            };
            let value = match provider {
                DefaultProvider::Constant(value) => Some(value.clone()),
                DefaultProvider::Builtin(builtin) => Some(builtin.compute(&snapshot, self)),
                DefaultProvider::Computed(compute) => compute(&snapshot),
            };
            if let Some(value) = value {
                record.fields.insert(field.clone(), value);
            }
        }

        let snapshot = record.clone();
        for (field, transform) in &self.transforms {
            if let Some(value) = record.fields.get_mut(field) {
                *value = transform(value, &snapshot);
            }
        }
    }

    /// Default and transform the fields of a requirement
    ///
    /// Defaults fill absent fields of the requirement vocabulary;
    /// transforms apply to every present field that has one.
    pub fn apply_requirement(&self, fields: &mut RequirementFields) {
        let vocabulary = self
            .requirement_fields()
            .iter()
            .chain(self.requirement_custom_fields());
        for field in vocabulary {
            if fields.contains_key(field) {
                continue;
            }
            if let Some(value) = self.requirement_defaults.get(field) {
                fields.insert(field.clone(), value.clone());
            }
        }
        for (field, transform) in &self.requirement_transforms {
            if let Some(value) = fields.get_mut(field) {
                *value = transform.apply(value);
            }
        }
    }

    /// Load a TOML configuration file and layer it over the built-in registry
    pub fn load(path: &Path) -> Result<FieldRegistry, CaseportError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CaseportError::config(Some(path), format!("cannot read file: {}", e)))?;
        let overrides = FieldRegistry::from_toml(&text, Some(path))?;
        Ok(FieldRegistry::builtin().layer(&overrides))
    }

    /// Parse TOML configuration text into a registry of its declarations only
    pub fn from_toml(text: &str, path: Option<&Path>) -> Result<FieldRegistry, CaseportError> {
        let table: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| CaseportError::config(path, e.message().to_string()))?;

        let mut builder = FieldRegistry::builder();
        for (key, value) in table {
            builder = apply_setting(builder, &key, value)
                .map_err(|message| CaseportError::config(path, format!("{}: {}", key, message)))?;
        }
        Ok(builder.build())
    }
}

/// Default value as written in a configuration file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DefaultSpec {
    Constant(String),
    Computed { computed: ComputedProvider },
}

fn string_list(value: toml::Value) -> Result<Vec<String>, String> {
    value
        .try_into::<Vec<String>>()
        .map_err(|_| "expected an array of strings".to_string())
}

fn convention_field<'k>(key: &'k str, prefix: &str) -> Option<&'k str> {
    key.strip_prefix(prefix)?
        .strip_suffix("_VALUE")
        .filter(|field| !field.is_empty())
}

fn apply_setting(
    builder: FieldRegistryBuilder,
    key: &str,
    value: toml::Value,
) -> Result<FieldRegistryBuilder, String> {
    let builder = match key {
        "TESTCASE_FIELDS" => builder.testcase_fields(string_list(value)?),
        "TESTCASE_CUSTOM_FIELDS" => builder.custom_fields(string_list(value)?),
        "REQUIREMENT_FIELDS" => builder.requirement_fields(string_list(value)?),
        "REQUIREMENT_CUSTOM_FIELDS" => builder.requirement_custom_fields(string_list(value)?),
        "MARKERS_IGNORE_LIST" => builder.marker_ignore_list(string_list(value)?),
        "REQUIRED_FIELDS" => builder.required_fields(string_list(value)?),
        "AUTOMATION_SCRIPT_FORMAT" => match value {
            toml::Value::String(format) => builder.automation_script_format(format),
            _ => return Err("expected a string".to_string()),
        },
        _ => {
            if let Some(field) = convention_field(key, "DEFAULT_REQUIREMENT_") {
                match value {
                    toml::Value::String(default) => builder.requirement_default(field, default),
                    _ => return Err("requirement defaults must be strings".to_string()),
                }
            } else if let Some(field) = convention_field(key, "TRANSFORM_REQUIREMENT_") {
                let transform: ValueTransform = value.try_into().map_err(|e| e.to_string())?;
                builder.requirement_transform(field, transform)
            } else if let Some(field) = convention_field(key, "DEFAULT_") {
                let spec: DefaultSpec = value.try_into().map_err(|_| {
                    "expected a string or a table like { computed = \"name\" } naming one of \
                     name, qualified-id, description, case-posneg, automation-script, module-path"
                        .to_string()
                })?;
                match spec {
                    DefaultSpec::Constant(default) => builder.default_value(field, default),
                    DefaultSpec::Computed { computed } => builder.builtin_default(field, computed),
                }
            } else if let Some(field) = convention_field(key, "TRANSFORM_") {
                let transform: ValueTransform = value.try_into().map_err(|e| e.to_string())?;
                builder.value_transform(field, transform)
            } else if key.chars().any(|c| c.is_ascii_lowercase()) {
                tracing::debug!("ignoring configuration key {}", key);
                builder
            } else {
                return Err("unrecognized setting".to_string());
            }
        }
    };
    Ok(builder)
}

/// Builder for [`FieldRegistry`]
///
/// Field names are lower-cased on registration.
#[derive(Clone)]
pub struct FieldRegistryBuilder {
    registry: FieldRegistry,
}

impl FieldRegistryBuilder {
    pub fn testcase_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.testcase_fields = Some(to_lower_vec(fields));
        self
    }

    pub fn custom_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.testcase_custom_fields = Some(to_lower_vec(fields));
        self
    }

    pub fn requirement_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.requirement_fields = Some(to_lower_vec(fields));
        self
    }

    pub fn requirement_custom_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.requirement_custom_fields = Some(to_lower_vec(fields));
        self
    }

    pub fn marker_ignore_list<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.marker_ignore_list =
            Some(names.into_iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    pub fn required_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.required_fields = Some(to_lower_vec(fields));
        self
    }

    pub fn automation_script_format(mut self, format: impl Into<String>) -> Self {
        self.registry.automation_script_format = Some(format.into());
        self
    }

    pub fn default_value(mut self, field: &str, value: impl Into<String>) -> Self {
        self.registry
            .defaults
            .insert(field.to_lowercase(), DefaultProvider::Constant(value.into()));
        self
    }

    pub fn builtin_default(mut self, field: &str, provider: ComputedProvider) -> Self {
        self.registry
            .defaults
            .insert(field.to_lowercase(), DefaultProvider::Builtin(provider));
        self
    }

    pub fn computed_default<F>(mut self, field: &str, compute: F) -> Self
    where
        F: Fn(&TestRecord) -> Option<String> + Send + Sync + 'static,
    {
        self.registry
            .defaults
            .insert(field.to_lowercase(), DefaultProvider::Computed(Arc::new(compute)));
        self
    }

    pub fn transform<F>(mut self, field: &str, transform: F) -> Self
    where
        F: Fn(&str, &TestRecord) -> String + Send + Sync + 'static,
    {
        self.registry
            .transforms
            .insert(field.to_lowercase(), Arc::new(transform));
        self
    }

    pub fn value_transform(mut self, field: &str, transform: ValueTransform) -> Self {
        self.registry
            .transforms
            .insert(field.to_lowercase(), transform.into_transform());
        self
    }

    pub fn requirement_default(mut self, field: &str, value: impl Into<String>) -> Self {
        self.registry
            .requirement_defaults
            .insert(field.to_lowercase(), value.into());
        self
    }

    pub fn requirement_transform(mut self, field: &str, transform: ValueTransform) -> Self {
        self.registry
            .requirement_transforms
            .insert(field.to_lowercase(), transform);
        self
    }

    pub fn build(self) -> FieldRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceLocation;
    use std::collections::BTreeMap;

    fn record(name: &str, fields: &[(&str, &str)]) -> TestRecord {
        TestRecord {
            name: name.to_string(),
            qualified_id: format!("tests.test_login.{}", name),
            module_path: "tests.test_login".to_string(),
            parent_class: None,
            doc_text: Some("Check login.\n\n:id: 1".to_string()),
            source_location: SourceLocation::new("tests/test_login.py", 12),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            markers: vec![],
            decorators: vec![],
            class_decorators: vec![],
            module_marks: vec![],
        }
    }

    #[test]
    fn test_builtin_vocabulary() {
        let registry = FieldRegistry::builtin();
        assert_eq!(registry.testcase_fields().len(), 12);
        assert_eq!(registry.testcase_custom_fields().len(), 28);
        assert_eq!(
            registry.marker_ignore_list(),
            &["parametrize", "skipif", "usefixtures"]
        );
        assert_eq!(registry.required_fields(), &["id"]);
        assert!(registry.is_known_field("CaseImportance"));
        assert!(!registry.is_known_field("nonsense"));
    }

    #[test]
    fn test_defaults_fill_absent_fields_only() {
        let registry = FieldRegistry::builtin();
        let mut r = record("test_negative_login", &[("caseimportance", ""), ("id", "1")]);
        registry.apply(&mut r);

        assert_eq!(r.field("caseimportance"), Some(""));
        assert_eq!(r.field("caseautomation"), Some("automated"));
        assert_eq!(r.field("caseposneg"), Some("negative"));
        assert_eq!(r.field("title"), Some("test_negative_login"));
        assert_eq!(r.field("automation_script"), Some("tests/test_login.py#12"));
        assert_eq!(
            r.field("description"),
            Some("<div class=\"document\">\n<p>Check login.</p>\n<dl class=\"field-list simple\">\n<dt>id<span class=\"colon\">:</span></dt>\n<dd><p>1</p>\n</dd>\n</dl>\n</div>\n")
        );
        assert_eq!(r.field("setup"), None);
    }

    #[test]
    fn test_transforms_apply_to_present_fields() {
        let registry = FieldRegistry::builtin();
        let mut r = record("test_login", &[("caselevel", "Integration"), ("title", "Mixed Case")]);
        registry.apply(&mut r);
        assert_eq!(r.field("caselevel"), Some("integration"));
        assert_eq!(r.field("title"), Some("Mixed Case"));
        assert_eq!(r.field("caseposneg"), Some("positive"));
    }

    #[test]
    fn test_computed_defaults_see_pre_default_record() {
        let registry = FieldRegistry::builder()
            .custom_fields(["component", "summary", "skipped"])
            .default_value("component", "core")
            .computed_default("summary", |r| {
                Some(r.field("component").unwrap_or("none").to_string())
            })
            .computed_default("skipped", |_| None)
            .build();
        let mut r = record("test_x", &[]);
        registry.apply(&mut r);
        assert_eq!(r.field("summary"), Some("none"));
        assert_eq!(r.field("skipped"), None);
    }

    #[test]
    fn test_layer_replaces_declarations() {
        let overrides = FieldRegistry::builder()
            .default_value("caseimportance", "critical")
            .transform("title", |v, _| v.to_uppercase())
            .marker_ignore_list(["tier1"])
            .build();
        let registry = FieldRegistry::builtin().layer(&overrides);

        let mut r = record("test_login", &[]);
        registry.apply(&mut r);
        assert_eq!(r.field("caseimportance"), Some("critical"));
        assert_eq!(r.field("title"), Some("TEST_LOGIN"));
        assert_eq!(r.field("casecomponent"), Some("-"));
        assert_eq!(registry.marker_ignore_list(), &["tier1"]);
        assert_eq!(registry.testcase_fields().len(), 12);
    }

    #[test]
    fn test_narrowed_vocabulary_limits_defaults() {
        let overrides = FieldRegistry::from_toml("TESTCASE_CUSTOM_FIELDS = [\"arch\"]", None).unwrap();
        let registry = FieldRegistry::builtin().layer(&overrides);

        let mut r = record("test_login", &[("caselevel", "Integration")]);
        registry.apply(&mut r);
        assert_eq!(r.field("upstream"), None);
        assert_eq!(r.field("caseautomation"), None);
        assert_eq!(r.field("automation_script"), None);
        assert_eq!(r.field("title"), Some("test_login"));
        assert_eq!(r.field("caselevel"), Some("integration"));
        assert!(!registry.is_known_field("upstream"));
    }

    #[test]
    fn test_undeclared_field_is_not_defaulted() {
        let registry = FieldRegistry::builder()
            .custom_fields(["component"])
            .default_value("component", "core")
            .default_value("owner", "qa")
            .build();
        let mut r = record("test_x", &[]);
        registry.apply(&mut r);
        assert_eq!(r.field("component"), Some("core"));
        assert_eq!(r.field("owner"), None);
    }

    #[test]
    fn test_from_toml() {
        let text = r#"
TESTCASE_CUSTOM_FIELDS = ["Arch", "automation_script", "component"]
MARKERS_IGNORE_LIST = []
AUTOMATION_SCRIPT_FORMAT = "{qualified_id}"
DEFAULT_COMPONENT_VALUE = "core"
DEFAULT_TITLE_VALUE = { computed = "qualified-id" }
DEFAULT_REQUIREMENT_VALUE = "Shared"
TRANSFORM_COMPONENT_VALUE = "upper"
DEFAULT_REQUIREMENT_PRIORITY_VALUE = "Medium"
TRANSFORM_REQUIREMENT_STATUS_VALUE = "upper"
"#;
        let overrides = FieldRegistry::from_toml(text, None).unwrap();
        assert_eq!(
            overrides.testcase_custom_fields(),
            &["arch", "automation_script", "component"]
        );

        let registry = FieldRegistry::builtin().layer(&overrides);
        assert!(registry.marker_ignore_list().is_empty());

        let mut r = record("test_login", &[]);
        registry.apply(&mut r);
        assert_eq!(r.field("component"), Some("CORE"));
        assert_eq!(r.field("title"), Some("tests.test_login.test_login"));
        assert_eq!(r.field("requirement"), Some("Shared"));
        assert_eq!(r.field("automation_script"), Some("tests.test_login.test_login"));

        let mut requirement = RequirementFields::new();
        requirement.insert("status".to_string(), "draft".to_string());
        registry.apply_requirement(&mut requirement);
        assert_eq!(requirement.get("priority").map(String::as_str), Some("medium"));
        assert_eq!(requirement.get("status").map(String::as_str), Some("DRAFT"));
        assert_eq!(requirement.get("reqtype").map(String::as_str), Some("functional"));
    }

    #[test]
    fn test_from_toml_rejects_bad_values() {
        for text in [
            "DEFAULT_TITLE_VALUE = 3",
            "DEFAULT_TITLE_VALUE = { computed = \"random\" }",
            "TRANSFORM_TITLE_VALUE = \"title\"",
            "TESTCASE_FIELDS = \"id\"",
            "SOMETHING_ELSE = 1",
            "not toml at all = = =",
        ] {
            let err = FieldRegistry::from_toml(text, Some(Path::new("caseport.toml"))).unwrap_err();
            assert_eq!(err.code(), "E004", "{}", text);
            assert_eq!(err.path(), Some(Path::new("caseport.toml")));
        }
    }

    #[test]
    fn test_lowercase_keys_ignored() {
        let registry = FieldRegistry::from_toml("note = \"free form\"", None).unwrap();
        assert!(registry.testcase_fields().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = FieldRegistry::load(Path::new("/nonexistent/caseport.toml")).unwrap_err();
        assert_eq!(err.code(), "E004");
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FieldRegistry>();
    }
}
