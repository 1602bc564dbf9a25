use crate::errors::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Extension of the files the engine rewrites.
pub const JAVA_EXTENSION: &str = "java";

/// Discovers Java sources below a root, honouring `.gitignore` and the
/// configured ignore globs.
pub struct FileWalker {
    root: PathBuf,
    extensions: Vec<String>,
    ignore_patterns: Vec<glob::Pattern>,
}

impl FileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            extensions: vec![JAVA_EXTENSION.to_string()],
            ignore_patterns: vec![],
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Invalid globs are rejected up front instead of silently never matching.
    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Result<Self> {
        self.ignore_patterns = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    /// Matching files in a stable (sorted) order.
    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        if self.root.is_file() {
            return Ok(if self.should_process(&self.root) {
                vec![self.root.clone()]
            } else {
                vec![]
            });
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(true)
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| Error::FileSystem {
                message: e.to_string(),
                path: Some(self.root.clone()),
                source: None,
            })?;
            let path = entry.path();

            if path.is_file() && self.should_process(path) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let ext_str = ext.to_string_lossy();
        if !self.extensions.iter().any(|e| *e == ext_str) {
            return false;
        }

        let path_str = path.to_string_lossy();
        !self.ignore_patterns.iter().any(|p| p.matches(&path_str))
    }
}

/// Java sources under every root, deduplicated.
pub fn find_java_files(roots: &[PathBuf], ignore_patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for root in roots {
        let found = FileWalker::new(root.clone())
            .with_ignore_patterns(ignore_patterns)?
            .walk()?;
        files.extend(found);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_walk_finds_java_files_only() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src/util")).unwrap();
        std::fs::write(dir.path().join("src/util/A.java"), "class A {}").unwrap();
        std::fs::write(dir.path().join("src/util/notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("B.java"), "class B {}").unwrap();

        let files = FileWalker::new(dir.path().to_path_buf()).walk().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["B.java", "A.java"]);
    }

    #[test]
    fn test_ignore_patterns() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("generated")).unwrap();
        std::fs::write(dir.path().join("generated/G.java"), "class G {}").unwrap();
        std::fs::write(dir.path().join("A.java"), "class A {}").unwrap();

        let files = find_java_files(
            &[dir.path().to_path_buf()],
            &["**/generated/**".to_string()],
        )
        .unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("A.java"));
    }

    #[test]
    fn test_single_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("A.java");
        std::fs::write(&file, "class A {}").unwrap();
        assert_eq!(FileWalker::new(file.clone()).walk().unwrap(), vec![file]);
    }

    #[test]
    fn test_invalid_glob_is_an_error() {
        let result = FileWalker::new(PathBuf::from(".")).with_ignore_patterns(&["[".to_string()]);
        assert!(result.is_err());
    }
}
