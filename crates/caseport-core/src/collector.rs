//! Test discovery across a source tree

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::config::FieldRegistry;
use crate::error::CaseportError;
use crate::python::{self, ClassDef, Definition, FunctionDef, ModuleSource};
use crate::resolver::resolve;
use crate::types::{
    module_path_from, qualified_id, Collection, Scope, ScopeChain, ScopeKind, SourceLocation,
    TestRecord,
};

const PACKAGE_INIT: &str = "__init__.py";

/// Whether a file name matches `test_*.py` or `*_test.py`
pub fn is_test_module(file_name: &str) -> bool {
    match file_name.strip_suffix(".py") {
        Some(stem) => stem.starts_with("test_") || stem.ends_with("_test"),
        None => false,
    }
}

fn is_test_function(name: &str) -> bool {
    name.starts_with("test_")
}

/// Drop `.` components so `./tests/x.py` and `tests/x.py` compare equal
fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Options for a collection run
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// Files or directories to skip, with everything beneath them
    pub ignore_paths: Vec<PathBuf>,
    /// Root that module paths are made relative to
    pub base_dir: Option<PathBuf>,
}

impl CollectOptions {
    fn is_ignored(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.ignore_paths
            .iter()
            .any(|ignored| path.starts_with(normalize(ignored)))
    }
}

/// Collects test records from test modules
///
/// A collector lives for one run. It remembers the docstring of every
/// package `__init__.py` it has read, so sibling modules share one read.
pub struct Collector<'r> {
    registry: &'r FieldRegistry,
    options: CollectOptions,
    package_docs: HashMap<PathBuf, Option<String>>,
}

impl<'r> Collector<'r> {
    pub fn new(registry: &'r FieldRegistry, options: CollectOptions) -> Self {
        Self {
            registry,
            options,
            package_docs: HashMap::new(),
        }
    }

    /// Walk a file or directory and collect every test module found
    ///
    /// Fails only when `root` does not exist. Files that cannot be read or
    /// parsed are reported in [`Collection::errors`] and their siblings
    /// are still collected.
    pub fn collect(&mut self, root: &Path) -> Result<Collection, CaseportError> {
        if !root.exists() {
            return Err(CaseportError::PathNotFound {
                path: root.to_path_buf(),
            });
        }

        let mut collection = Collection::default();

        if root.is_file() {
            let is_module = root
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_test_module);
            if is_module && !self.options.is_ignored(root) {
                self.collect_into(&mut collection, root);
            }
            return Ok(collection);
        }

        let options = self.options.clone();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !options.is_ignored(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    tracing::warn!("cannot walk {}: {}", path.display(), err);
                    collection.errors.push(CaseportError::Walk {
                        path,
                        message: err.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let is_module = entry.file_name().to_str().is_some_and(is_test_module);
            if is_module {
                self.collect_into(&mut collection, entry.path());
            }
        }

        tracing::debug!(
            "collected {} tests from {} modules under {}",
            collection.test_count(),
            collection.modules.len(),
            root.display()
        );
        Ok(collection)
    }

    fn collect_into(&mut self, collection: &mut Collection, path: &Path) {
        let path = normalize(path);
        match self.collect_module(&path) {
            Ok(records) => {
                tracing::debug!("{}: {} tests", path.display(), records.len());
                collection.modules.insert(path, records);
            }
            Err(err) => {
                tracing::warn!("skipping {}: {}", path.display(), err);
                collection.errors.push(err);
            }
        }
    }

    /// Collect the tests defined in one module, in source order
    pub fn collect_module(&mut self, path: &Path) -> Result<Vec<TestRecord>, CaseportError> {
        let source = std::fs::read_to_string(path).map_err(|e| CaseportError::io(path, e))?;
        let module = python::parse_module(path, &source)?;

        let package_doc = match path.parent() {
            Some(dir) => self.package_doc(dir)?,
            None => None,
        };
        let module_path = module_path_from(path, self.options.base_dir.as_deref());

        let context = ModuleContext {
            path,
            module_path: &module_path,
            package_doc: package_doc.as_deref(),
            module: &module,
        };

        let mut records = Vec::new();
        for definition in &module.definitions {
            match definition {
                Definition::Function(function) if is_test_function(&function.name) => {
                    records.push(self.build_record(&context, None, function));
                }
                Definition::Class(class) => {
                    for method in class.methods.iter().filter(|m| is_test_function(&m.name)) {
                        records.push(self.build_record(&context, Some(class), method));
                    }
                }
                Definition::Function(_) => {}
            }
        }
        Ok(records)
    }

    /// Docstring of the `__init__.py` in `dir`, if there is one
    fn package_doc(&mut self, dir: &Path) -> Result<Option<String>, CaseportError> {
        if let Some(doc) = self.package_docs.get(dir) {
            return Ok(doc.clone());
        }

        let init = dir.join(PACKAGE_INIT);
        let doc = if init.is_file() {
            let source = std::fs::read_to_string(&init).map_err(|e| CaseportError::io(&init, e))?;
            python::parse_module(&init, &source)?.docstring
        } else {
            None
        };

        self.package_docs.insert(dir.to_path_buf(), doc.clone());
        Ok(doc)
    }

    fn build_record(
        &self,
        context: &ModuleContext<'_>,
        class: Option<&ClassDef>,
        function: &FunctionDef,
    ) -> TestRecord {
        let mut chain = ScopeChain::new();
        chain.push(Scope::new(
            ScopeKind::Package,
            context.package_doc.map(str::to_string),
            Vec::new(),
        ));
        chain.push(Scope::new(
            ScopeKind::Module,
            context.module.docstring.clone(),
            context.module.marks.clone(),
        ));
        if let Some(class) = class {
            chain.push(Scope::new(
                ScopeKind::Class,
                class.docstring.clone(),
                class.decorators.clone(),
            ));
        }
        chain.push(Scope::new(
            ScopeKind::Function,
            function.docstring.clone(),
            function.decorators.clone(),
        ));

        let resolved = resolve(&chain, self.registry.marker_ignore_list());
        let parent_class = class.map(|c| c.name.clone());

        let mut record = TestRecord {
            name: function.name.clone(),
            qualified_id: qualified_id(
                context.module_path,
                parent_class.as_deref(),
                &function.name,
            ),
            module_path: context.module_path.to_string(),
            parent_class,
            doc_text: function.docstring.clone(),
            source_location: SourceLocation::new(context.path, function.line),
            fields: resolved.fields,
            markers: resolved.markers,
            decorators: function.decorators.clone(),
            class_decorators: class.map(|c| c.decorators.clone()).unwrap_or_default(),
            module_marks: context.module.marks.clone(),
        };
        self.registry.apply(&mut record);
        record
    }
}

struct ModuleContext<'a> {
    path: &'a Path,
    module_path: &'a str,
    package_doc: Option<&'a str>,
    module: &'a ModuleSource,
}

/// Walk `path` and collect its test modules
///
/// Convenience wrapper over a one-shot [`Collector`].
pub fn collect_tests(
    path: &Path,
    options: &CollectOptions,
    registry: &FieldRegistry,
) -> Result<Collection, CaseportError> {
    Collector::new(registry, options.clone()).collect(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_is_test_module() {
        assert!(is_test_module("test_module.py"));
        assert!(is_test_module("module_test.py"));
        assert!(!is_test_module("test_module.py.txt"));
        assert!(!is_test_module("not_test_module.py"));
        assert!(!is_test_module("module.py"));
        assert!(!is_test_module("test_module.pyc"));
        assert!(!is_test_module("Test_module.py"));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("./tests/./data")), PathBuf::from("tests/data"));
        assert_eq!(normalize(Path::new(".")), PathBuf::from("."));
    }

    #[test]
    fn test_ignore_paths_cover_descendants() {
        let options = CollectOptions {
            ignore_paths: vec![PathBuf::from("./tests/data/ignore_dir")],
            base_dir: None,
        };
        assert!(options.is_ignored(Path::new("tests/data/ignore_dir")));
        assert!(options.is_ignored(Path::new("tests/data/ignore_dir/test_x.py")));
        assert!(!options.is_ignored(Path::new("tests/data/ignore_dir_2/test_x.py")));
        assert!(!options.is_ignored(Path::new("tests/data/test_sample.py")));
    }

    #[test]
    fn test_package_doc_is_cached() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("__init__.py"), "\"\"\":requirement: Global\"\"\"\n").unwrap();

        let registry = FieldRegistry::builtin();
        let mut collector = Collector::new(&registry, CollectOptions::default());
        assert_eq!(
            collector.package_doc(dir.path()).unwrap().as_deref(),
            Some(":requirement: Global")
        );

        fs::remove_file(dir.path().join("__init__.py")).unwrap();
        assert_eq!(
            collector.package_doc(dir.path()).unwrap().as_deref(),
            Some(":requirement: Global")
        );
    }

    #[test]
    fn test_collect_module_order_and_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test_order.py");
        fs::write(
            &path,
            concat!(
                "def test_b():\n    pass\n\n",
                "def helper():\n    pass\n\n",
                "class Suite:\n",
                "    def test_z(self):\n        pass\n\n",
                "    def setup(self):\n        pass\n\n",
                "    async def test_a(self):\n        pass\n\n",
                "def test_a():\n    pass\n",
            ),
        )
        .unwrap();

        let registry = FieldRegistry::builtin();
        let options = CollectOptions {
            ignore_paths: vec![],
            base_dir: Some(dir.path().to_path_buf()),
        };
        let mut collector = Collector::new(&registry, options);
        let records = collector.collect_module(&path).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.qualified_id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "test_order.test_b",
                "test_order.Suite.test_z",
                "test_order.Suite.test_a",
                "test_order.test_a",
            ]
        );
        assert_eq!(records[1].source_location.line, 8);
        assert_eq!(records[1].parent_class.as_deref(), Some("Suite"));
    }
}
