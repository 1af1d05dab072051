//! Core data types for caseport

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CaseportError;
use crate::fields::map_steps;

/// Where a test function is defined
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Path of the test module
    pub path: PathBuf,
    /// 1-indexed line of the `def` keyword
    pub line: usize,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.path.display(), self.line)
    }
}

/// A collected test function or method with its resolved fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    /// Test function name
    pub name: String,
    /// Dotted module path, optional class name, and function name
    pub qualified_id: String,
    /// Dotted module path (e.g., "tests.api.test_login")
    pub module_path: String,
    /// Name of the enclosing class, for test methods
    pub parent_class: Option<String>,
    /// Cleaned docstring of the test function
    pub doc_text: Option<String>,
    /// Where the test is defined
    pub source_location: SourceLocation,
    /// Lower-cased field name to value
    pub fields: BTreeMap<String, String>,
    /// Normalized marker names, outermost scope first
    pub markers: Vec<String>,
    /// Rendered decorators of the test function
    pub decorators: Vec<String>,
    /// Rendered decorators of the enclosing class
    pub class_decorators: Vec<String>,
    /// Rendered module-level marks
    pub module_marks: Vec<String>,
}

impl TestRecord {
    /// Look up a field value
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(&name.to_lowercase()).map(String::as_str)
    }

    /// The `(classname, name)` pair a jUnit report uses for this test
    pub fn junit_key(&self) -> (String, String) {
        let classname = match &self.parent_class {
            Some(class) => format!("{}.{}", self.module_path, class),
            None => self.module_path.clone(),
        };
        (classname, self.name.clone())
    }

    /// Pair each step with its expected result, when both fields are set
    pub fn test_steps(&self) -> Option<Vec<(String, String)>> {
        let steps = self.field("steps").filter(|s| !s.is_empty())?;
        let expected = self.field("expectedresults").filter(|s| !s.is_empty())?;
        Some(map_steps(steps, expected))
    }

    /// Fields that are absent or empty among `required`
    pub fn missing_fields<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        required
            .iter()
            .filter(|field| self.field(field).is_none_or(|v| v.trim().is_empty()))
            .map(String::as_str)
            .collect()
    }
}

/// Build the dotted qualified id of a test
pub fn qualified_id(module_path: &str, parent_class: Option<&str>, name: &str) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if !module_path.is_empty() {
        parts.push(module_path);
    }
    if let Some(class) = parent_class {
        parts.push(class);
    }
    parts.push(name);
    parts.join(".")
}

/// Derive the dotted module path of a test module
///
/// The path is made relative to `base_dir` when it lies beneath it. Current
/// directory and root components are dropped and the `.py` extension is
/// removed, so `./tests/api/test_login.py` becomes `tests.api.test_login`.
pub fn module_path_from(path: &Path, base_dir: Option<&Path>) -> String {
    let relative = base_dir
        .and_then(|base| path.strip_prefix(base).ok())
        .unwrap_or(path);

    let mut parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(last) = parts.last_mut() {
        if let Some(stem) = last.strip_suffix(".py") {
            *last = stem.to_string();
        }
    }

    parts.join(".")
}

/// Which level of the source hierarchy a scope comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    /// The package `__init__.py` next to the test module
    Package,
    /// The test module itself
    Module,
    /// The class enclosing a test method
    Class,
    /// The test function or method
    Function,
}

/// Documentation and annotations contributed by one scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Cleaned docstring, if the scope has one
    pub doc: Option<String>,
    /// Rendered annotations (decorators or module marks)
    pub annotations: Vec<String>,
}

impl Scope {
    pub fn new(kind: ScopeKind, doc: Option<String>, annotations: Vec<String>) -> Self {
        Self {
            kind,
            doc,
            annotations,
        }
    }
}

/// Scopes for one test, ordered outermost to innermost
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeChain {
    scopes: Vec<Scope>,
}

impl ScopeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a scope nested inside all previously pushed scopes
    pub fn push(&mut self, scope: Scope) {
        self.scopes.push(scope);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl FromIterator<Scope> for ScopeChain {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        Self {
            scopes: iter.into_iter().collect(),
        }
    }
}

/// Result of walking a source tree
#[derive(Debug, Default)]
pub struct Collection {
    /// Test module path to the tests it defines, in discovery order
    pub modules: IndexMap<PathBuf, Vec<TestRecord>>,
    /// Per-file failures; sibling files were still collected
    pub errors: Vec<CaseportError>,
}

impl Collection {
    /// All records across modules, in discovery order
    pub fn iter_records(&self) -> impl Iterator<Item = &TestRecord> {
        self.modules.values().flatten()
    }

    /// Find a record by its qualified id
    pub fn find(&self, qualified_id: &str) -> Option<&TestRecord> {
        self.iter_records().find(|r| r.qualified_id == qualified_id)
    }

    /// Find the record a jUnit `(classname, name)` pair refers to
    pub fn find_junit(&self, classname: &str, name: &str) -> Option<&TestRecord> {
        self.iter_records().find(|r| {
            let (record_class, record_name) = r.junit_key();
            record_class == classname && record_name == name
        })
    }

    /// Total number of collected tests
    pub fn test_count(&self) -> usize {
        self.modules.values().map(Vec::len).sum()
    }
}
