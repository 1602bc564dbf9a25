use std::fs;
use std::path::{Path, PathBuf};

use super::CwefixConfig;
use crate::errors::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".cwefix.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Parse configuration text.
pub fn parse_config(contents: &str) -> Result<CwefixConfig> {
    toml::from_str::<CwefixConfig>(contents)
        .map_err(|e| Error::Configuration(format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e)))
}

/// `start` followed by its parents, at most `max_depth` entries.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

fn try_load_config_from_path(config_path: &Path) -> Option<CwefixConfig> {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "Failed to read config file {}: {}",
                    config_path.display(),
                    e
                );
            }
            return None;
        }
    };

    match parse_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("{}. Using defaults.", e);
            Some(CwefixConfig::default())
        }
    }
}

/// Load an explicitly named config file. Unlike discovery, a missing or
/// invalid file is an error.
pub fn load_config_from(path: &Path) -> Result<CwefixConfig> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::file_system("Cannot read config file", path, e))?;
    parse_config(&contents)
}

/// Nearest `.cwefix.toml` from `start` upward, or the defaults.
pub fn load_config(start: &Path) -> CwefixConfig {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            CwefixConfig::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ancestors_are_bounded() {
        let dirs: Vec<_> = directory_ancestors(PathBuf::from("/a/b/c/d"), 3).collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/a/b/c/d"),
                PathBuf::from("/a/b/c"),
                PathBuf::from("/a/b")
            ]
        );
    }

    #[test]
    fn test_config_found_in_parent() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[parallel]\njobs = 3\n",
        )
        .unwrap();
        let nested = temp.path().join("src/main/java");
        fs::create_dir_all(&nested).unwrap();

        let config = load_config(&nested);
        assert_eq!(config.parallel.jobs, 3);
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "[parallel]\njobs = \"many\"\n").unwrap();
        assert_eq!(load_config(temp.path()), CwefixConfig::default());
    }

    #[test]
    fn test_explicit_config_errors_are_reported() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(matches!(
            load_config_from(&missing),
            Err(Error::FileSystem { .. })
        ));

        let bad = temp.path().join("bad.toml");
        fs::write(&bad, "rules = 3").unwrap();
        assert!(matches!(load_config_from(&bad), Err(Error::Configuration(_))));
    }
}
