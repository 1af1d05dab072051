//! Marker derivation from rendered annotations

use std::sync::LazyLock;

use regex::Regex;

/// `mark.<name>` or `pytest.mark.<name>` at the start of an annotation
static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:pytest\.)?mark\.([A-Za-z_]\w*)").unwrap());

/// Marker names ignored unless configured otherwise
pub const DEFAULT_IGNORE_LIST: &[&str] = &["parametrize", "skipif", "usefixtures"];

/// Extract the marker name from a rendered annotation
///
/// `pytest.mark.tier1` and `mark.parametrize('a', [1])` name markers;
/// other annotations do not.
pub fn marker_name(annotation: &str) -> Option<&str> {
    MARKER
        .captures(annotation)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Accumulates marker names across scopes, outermost first
#[derive(Debug, Clone, Default)]
pub struct MarkerSet<'a> {
    ignore: &'a [String],
    names: Vec<String>,
}

impl<'a> MarkerSet<'a> {
    pub fn new(ignore: &'a [String]) -> Self {
        Self {
            ignore,
            names: Vec::new(),
        }
    }

    /// Add the markers named by one scope's annotations
    pub fn extend<S: AsRef<str>>(&mut self, annotations: &[S]) {
        for annotation in annotations {
            if let Some(name) = marker_name(annotation.as_ref()) {
                self.insert(name);
            }
        }
    }

    /// Add the markers of a documented `markers` field
    ///
    /// The value is a comma-separated list of marker names.
    pub fn extend_documented(&mut self, value: &str) {
        for name in value.split(',').map(str::trim) {
            if !name.is_empty() {
                self.insert(name);
            }
        }
    }

    fn insert(&mut self, name: &str) {
        if self.ignore.iter().any(|ignored| ignored == name) {
            return;
        }
        if !self.names.iter().any(|seen| seen == name) {
            self.names.push(name.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The `markers` field value, or `None` when no markers were found
    pub fn field_value(&self) -> Option<String> {
        (!self.names.is_empty()).then(|| self.names.join(", "))
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}
