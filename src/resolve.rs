//! Name resolution for type and static-member references.
//!
//! Resolution is deliberately shallow: it sees the unit's package, its
//! imports and the types it declares, plus an optional [`TypeIndex`] built
//! from source directories on the classpath. Names it cannot place resolve
//! to nothing, which the matcher treats as "not an owner".

use crate::errors::Result;
use crate::io::walker::find_java_files;
use crate::syntax::{parse, CompilationUnit};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::debug;

/// Set of fully-qualified type names known to exist.
#[derive(Debug, Clone, Default)]
pub struct TypeIndex {
    types: HashSet<String>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, qualified_name: impl Into<String>) {
        self.types.insert(qualified_name.into());
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.types.contains(qualified_name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Index the top-level types of every `.java` file under `roots`.
    ///
    /// Jar archives are not read; files that fail to parse are skipped.
    pub fn from_classpath(roots: &[PathBuf]) -> Result<Self> {
        let (jars, dirs): (Vec<&PathBuf>, Vec<&PathBuf>) = roots
            .iter()
            .partition(|p| p.extension().is_some_and(|e| e == "jar"));
        for jar in jars {
            debug!(path = %jar.display(), "Skipping jar on classpath");
        }

        let dirs: Vec<PathBuf> = dirs.into_iter().cloned().collect();
        let files = find_java_files(&dirs, &[])?;
        let types: HashSet<String> = files
            .par_iter()
            .flat_map_iter(|path| {
                let declared = std::fs::read_to_string(path)
                    .ok()
                    .and_then(|source| parse(&source).ok())
                    .map(|unit| declared_types(&unit))
                    .unwrap_or_else(|| {
                        debug!(path = %path.display(), "Classpath source not indexed");
                        Vec::new()
                    });
                declared.into_iter()
            })
            .collect();

        debug!(types = types.len(), "Built classpath type index");
        Ok(Self { types })
    }
}

fn qualify(package: Option<&str>, simple: &str) -> String {
    match package {
        Some(pkg) if !pkg.is_empty() => format!("{}.{}", pkg, simple),
        _ => simple.to_string(),
    }
}

/// Qualified names of the unit's top-level types.
pub fn declared_types(unit: &CompilationUnit) -> Vec<String> {
    let package = unit.package_name();
    unit.type_declarations()
        .iter()
        .map(|t| qualify(package.as_deref(), &t.name()))
        .collect()
}

/// Split `a.b.C` into (`a.b`, `C`).
pub fn split_qualified(name: &str) -> (&str, &str) {
    name.rsplit_once('.').unwrap_or(("", name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportStatus {
    /// The simple name already denotes the type.
    Present,
    /// An import has to be added.
    Missing,
    /// The simple name is bound to another type.
    Conflict(String),
}

/// What names mean inside one compilation unit.
#[derive(Debug, Clone)]
pub struct ImportScope<'a> {
    package: Option<String>,
    single: HashMap<String, String>,
    on_demand: Vec<String>,
    static_single: HashMap<String, Vec<String>>,
    static_on_demand: Vec<String>,
    declared: HashSet<String>,
    index: Option<&'a TypeIndex>,
}

impl<'a> ImportScope<'a> {
    pub fn new(unit: &CompilationUnit, index: Option<&'a TypeIndex>) -> Self {
        let mut scope = Self {
            package: unit.package_name(),
            single: HashMap::new(),
            on_demand: Vec::new(),
            static_single: HashMap::new(),
            static_on_demand: Vec::new(),
            declared: HashSet::new(),
            index,
        };

        for import in unit.imports() {
            let path = import.path();
            match (import.is_static(), import.is_wildcard()) {
                (false, false) => {
                    scope.single.insert(import.simple_name(), path);
                }
                (false, true) => scope.on_demand.push(path),
                (true, false) => {
                    let (owner, member) = split_qualified(&path);
                    scope
                        .static_single
                        .entry(member.to_string())
                        .or_default()
                        .push(owner.to_string());
                }
                (true, true) => scope.static_on_demand.push(path),
            }
        }
        for (decl, _) in unit.all_type_declarations() {
            scope.declared.insert(decl.name());
        }
        scope
    }

    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    fn known(&self, qualified: &str, candidates: &[String]) -> bool {
        self.index.is_some_and(|idx| idx.contains(qualified))
            || candidates.iter().any(|c| c == qualified)
    }

    /// Resolve a simple type name. `candidates` are qualified names known to
    /// exist even without an index (the rule owners).
    pub fn resolve_simple(&self, name: &str, candidates: &[String]) -> Option<String> {
        if self.declared.contains(name) {
            return Some(qualify(self.package(), name));
        }
        if let Some(qualified) = self.single.get(name) {
            return Some(qualified.clone());
        }
        let same_package = qualify(self.package(), name);
        if self.known(&same_package, candidates) {
            return Some(same_package);
        }
        self.on_demand
            .iter()
            .map(|pkg| format!("{}.{}", pkg, name))
            .find(|qualified| self.known(qualified, candidates))
    }

    /// Resolve the qualifier of a call: simple names go through
    /// [`resolve_simple`](Self::resolve_simple), dotted names are taken as
    /// fully qualified unless their first segment is itself a known type.
    pub fn resolve_qualifier(&self, qualifier: &str, candidates: &[String]) -> Option<String> {
        match qualifier.split_once('.') {
            None => self.resolve_simple(qualifier, candidates),
            Some((first, rest)) => {
                if self.declared.contains(first) || self.single.contains_key(first) {
                    self.resolve_simple(first, candidates)
                        .map(|outer| format!("{}.{}", outer, rest))
                } else {
                    Some(qualifier.to_string())
                }
            }
        }
    }

    /// Owners an unqualified call to `method` may refer to through static
    /// imports. Single static imports shadow on-demand ones.
    pub fn resolve_static_member(&self, method: &str) -> Vec<String> {
        match self.static_single.get(method) {
            Some(owners) => owners.clone(),
            None => self.static_on_demand.clone(),
        }
    }

    /// Whether `qualified_name` is visible by its simple name.
    pub fn import_status(&self, qualified_name: &str) -> ImportStatus {
        let (pkg, simple) = split_qualified(qualified_name);

        if let Some(existing) = self.single.get(simple) {
            return if existing == qualified_name {
                ImportStatus::Present
            } else {
                ImportStatus::Conflict(existing.clone())
            };
        }

        let local = qualify(self.package(), simple);
        if self.declared.contains(simple) {
            return if local == qualified_name {
                ImportStatus::Present
            } else {
                ImportStatus::Conflict(local)
            };
        }

        if self.package().unwrap_or("") == pkg {
            return ImportStatus::Present;
        }
        // Same-package types shadow on-demand imports.
        if self.index.is_some_and(|idx| idx.contains(&local)) {
            return ImportStatus::Conflict(local);
        }
        if pkg == "java.lang" || self.on_demand.iter().any(|p| p == pkg) {
            return ImportStatus::Present;
        }
        ImportStatus::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    const OWNER: &str = "org.apache.commons.lang3.RandomStringUtils";

    fn owners() -> Vec<String> {
        vec![OWNER.to_string()]
    }

    #[test]
    fn test_resolve_through_single_import() {
        let unit = parse("import org.apache.commons.lang3.RandomStringUtils;\nclass A {}").unwrap();
        let scope = ImportScope::new(&unit, None);
        assert_eq!(
            scope.resolve_simple("RandomStringUtils", &owners()).as_deref(),
            Some(OWNER)
        );
    }

    #[test]
    fn test_resolve_through_wildcard_import() {
        let unit = parse("import org.apache.commons.lang3.*;\nclass A {}").unwrap();
        let scope = ImportScope::new(&unit, None);
        assert_eq!(
            scope.resolve_simple("RandomStringUtils", &owners()).as_deref(),
            Some(OWNER)
        );
        assert_eq!(scope.resolve_simple("Unrelated", &owners()), None);
    }

    #[test]
    fn test_local_type_shadows_owner() {
        let unit = parse(indoc! {"
            package com.example;
            import org.apache.commons.lang3.*;
            class RandomStringUtils {}
        "})
        .unwrap();
        let scope = ImportScope::new(&unit, None);
        assert_eq!(
            scope.resolve_simple("RandomStringUtils", &owners()).as_deref(),
            Some("com.example.RandomStringUtils")
        );
    }

    #[test]
    fn test_dotted_qualifier_is_fully_qualified() {
        let unit = parse("class A {}").unwrap();
        let scope = ImportScope::new(&unit, None);
        assert_eq!(scope.resolve_qualifier(OWNER, &owners()).as_deref(), Some(OWNER));
    }

    #[test]
    fn test_static_imports() {
        let unit = parse(indoc! {"
            import static org.apache.commons.lang3.RandomStringUtils.randomNumeric;
            import static org.apache.commons.lang.RandomStringUtils.*;
            class A {}
        "})
        .unwrap();
        let scope = ImportScope::new(&unit, None);
        assert_eq!(scope.resolve_static_member("randomNumeric"), vec![OWNER.to_string()]);
        assert_eq!(
            scope.resolve_static_member("random"),
            vec!["org.apache.commons.lang.RandomStringUtils".to_string()]
        );
    }

    #[test]
    fn test_import_status() {
        let unit = parse(indoc! {"
            package com.example;
            import java.util.*;
            import my.crypto.SecureRandom;
            class A {}
        "})
        .unwrap();
        let scope = ImportScope::new(&unit, None);
        assert_eq!(
            scope.import_status("java.security.SecureRandom"),
            ImportStatus::Conflict("my.crypto.SecureRandom".into())
        );
        assert_eq!(scope.import_status("java.util.List"), ImportStatus::Present);
        assert_eq!(scope.import_status("java.lang.String"), ImportStatus::Present);
        assert_eq!(scope.import_status("com.example.Other"), ImportStatus::Present);
        assert_eq!(scope.import_status(OWNER), ImportStatus::Missing);
    }

    #[test]
    fn test_declared_type_conflicts_with_import() {
        let unit = parse("package p;\nclass SecureRandom {}\n").unwrap();
        let scope = ImportScope::new(&unit, None);
        assert_eq!(
            scope.import_status("java.security.SecureRandom"),
            ImportStatus::Conflict("p.SecureRandom".into())
        );
    }

    #[test]
    fn test_type_index_from_sources() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(
            dir.path().join("lib/Tokens.java"),
            "package com.acme;\npublic class Tokens {}\nclass Helper {}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("lib/Broken.java"), "class {").unwrap();

        let index = TypeIndex::from_classpath(&[dir.path().to_path_buf()]).unwrap();
        assert!(index.contains("com.acme.Tokens"));
        assert!(index.contains("com.acme.Helper"));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_index_drives_wildcard_resolution() {
        let mut index = TypeIndex::new();
        index.insert("com.acme.Tokens");
        let unit = parse("import com.acme.*;\nclass A {}").unwrap();
        let scope = ImportScope::new(&unit, Some(&index));
        assert_eq!(
            scope.resolve_simple("Tokens", &[]).as_deref(),
            Some("com.acme.Tokens")
        );
    }
}
