//! Field resolution across nested scopes

use std::collections::BTreeMap;

use crate::fields::parse_docstring;
use crate::markers::MarkerSet;
use crate::types::ScopeChain;

/// Effective fields and markers of one test
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub fields: BTreeMap<String, String>,
    /// Marker names, outermost scope first
    pub markers: Vec<String>,
}

/// Resolve the fields of a scope chain
///
/// Scopes are applied outermost first. Every field a scope declares
/// replaces the value from enclosing scopes, even when the new value is
/// empty; fields it does not declare are left alone. Markers accumulate
/// instead: those named by a scope's annotations and those listed in its
/// documented `markers` field join one ordered set, and when it is not
/// empty it becomes the `markers` field.
pub fn resolve(chain: &ScopeChain, marker_ignore_list: &[String]) -> Resolved {
    let mut fields = BTreeMap::new();
    let mut markers = MarkerSet::new(marker_ignore_list);

    for scope in chain.iter() {
        let declared = parse_docstring(scope.doc.as_deref());
        markers.extend(&scope.annotations);
        if let Some(documented) = declared.get("markers") {
            markers.extend_documented(documented);
        }
        fields.extend(declared);
    }

    if let Some(value) = markers.field_value() {
        fields.insert("markers".to_string(), value);
    }

    Resolved {
        fields,
        markers: markers.into_names(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Scope, ScopeKind};
    use pretty_assertions::assert_eq;

    fn scope(kind: ScopeKind, doc: &str, annotations: &[&str]) -> Scope {
        Scope::new(
            kind,
            Some(doc.to_string()),
            annotations.iter().map(|a| a.to_string()).collect(),
        )
    }

    fn ignore_list() -> Vec<String> {
        vec!["parametrize".to_string(), "usefixtures".to_string()]
    }

    #[test]
    fn test_inner_scope_overrides_declared_keys_only() {
        let chain: ScopeChain = [
            scope(ScopeKind::Module, ":a: 1\n:b: 2", &[]),
            scope(ScopeKind::Function, ":b: 3", &[]),
        ]
        .into_iter()
        .collect();

        let resolved = resolve(&chain, &ignore_list());
        let expected: BTreeMap<String, String> = [("a", "1"), ("b", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(resolved.fields, expected);
    }

    #[test]
    fn test_explicit_empty_value_overrides() {
        let chain: ScopeChain = [
            scope(ScopeKind::Package, ":requirement: Global", &[]),
            scope(ScopeKind::Function, ":requirement:", &[]),
        ]
        .into_iter()
        .collect();

        let resolved = resolve(&chain, &ignore_list());
        assert_eq!(resolved.fields.get("requirement").map(String::as_str), Some(""));
    }

    #[test]
    fn test_missing_docs_and_empty_chain() {
        let chain: ScopeChain = [
            Scope::new(ScopeKind::Package, None, vec![]),
            scope(ScopeKind::Module, ":id: 1", &[]),
            Scope::new(ScopeKind::Class, None, vec![]),
            Scope::new(ScopeKind::Function, None, vec![]),
        ]
        .into_iter()
        .collect();
        assert_eq!(resolve(&chain, &[]).fields.get("id").map(String::as_str), Some("1"));

        let resolved = resolve(&ScopeChain::new(), &[]);
        assert!(resolved.fields.is_empty());
        assert!(resolved.markers.is_empty());
    }

    #[test]
    fn test_markers_union_outer_to_inner() {
        let chain: ScopeChain = [
            scope(
                ScopeKind::Module,
                "",
                &["pytest.mark.e2e", "pytest.mark.destructive"],
            ),
            scope(
                ScopeKind::Class,
                "",
                &["pytest.mark.on_prem", "pytest.mark.usefixtures('x')"],
            ),
            scope(ScopeKind::Function, "", &["pytest.mark.tier1"]),
        ]
        .into_iter()
        .collect();

        let resolved = resolve(&chain, &ignore_list());
        assert_eq!(resolved.markers, vec!["e2e", "destructive", "on_prem", "tier1"]);
        assert_eq!(
            resolved.fields.get("markers").map(String::as_str),
            Some("e2e, destructive, on_prem, tier1")
        );
    }

    #[test]
    fn test_documented_markers_accumulate() {
        let chain: ScopeChain = [
            scope(ScopeKind::Package, ":markers: slow", &[]),
            scope(ScopeKind::Module, ":markers: e2e, slow", &["pytest.mark.tier1"]),
            scope(ScopeKind::Function, ":markers: usefixtures, smoke", &[]),
        ]
        .into_iter()
        .collect();

        let resolved = resolve(&chain, &ignore_list());
        assert_eq!(resolved.markers, vec!["slow", "tier1", "e2e", "smoke"]);
        assert_eq!(
            resolved.fields.get("markers").map(String::as_str),
            Some("slow, tier1, e2e, smoke")
        );
    }

    #[test]
    fn test_empty_documented_markers_field_kept() {
        let chain: ScopeChain = [scope(ScopeKind::Function, ":id: 1\n:markers:", &[])]
            .into_iter()
            .collect();
        let resolved = resolve(&chain, &ignore_list());
        assert!(resolved.markers.is_empty());
        assert_eq!(resolved.fields.get("markers").map(String::as_str), Some(""));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let chain: ScopeChain = [
            scope(ScopeKind::Module, ":a: 1", &["pytest.mark.b", "pytest.mark.a"]),
            scope(ScopeKind::Function, ":c: 2", &["pytest.mark.a"]),
        ]
        .into_iter()
        .collect();
        assert_eq!(resolve(&chain, &[]), resolve(&chain, &[]));
    }
}
