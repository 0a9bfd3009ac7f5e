use std::{
    collections::{BTreeSet, HashMap},
    path::{Path, PathBuf},
    sync::RwLock,
};
use tracing::debug;

use crate::{
    deps::{candidate_files, name_segments},
    error::{Error, Result},
};

/// Finds unit definition files under an ordered list of base dirs.
///
/// Matches are memoized by logical name. A locator may be shared between
/// build contexts; entries never change once cached.
#[derive(Debug, Default)]
pub struct Locator {
    dirs: RwLock<Vec<PathBuf>>,
    cache: RwLock<HashMap<String, PathBuf>>,
}

impl Locator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let locator = Self::new();
        for d in dirs {
            locator.add_dir(d);
        }
        locator
    }

    /// Registers a base dir; duplicates are ignored.
    pub fn add_dir(&self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        let mut dirs = self.dirs.write().unwrap_or_else(|e| e.into_inner());
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        self.dirs.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// First definition file matching `name`, probing dirs in registration order.
    /// Hits are cached under the canonical name, so every spelling shares one entry.
    pub fn find(&self, name: &str) -> Result<PathBuf> {
        let segments = name_segments(name)?;
        let key = segments.join("/");
        if let Some(hit) = self.cache.read().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Ok(hit.clone());
        }

        for dir in self.dirs() {
            for file in candidate_files(&dir, &segments) {
                debug!("try loading unit file {}...", file.display());
                if file.is_file() {
                    debug!("unit {name} matched with {}", file.display());
                    self.cache
                        .write()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(key, file.clone());
                    return Ok(file);
                }
            }
        }

        Err(Error::Resolution {
            name: name.to_string(),
        })
    }

    /// Every logical name resolvable from the registered dirs, sorted.
    pub fn available(&self) -> Result<Vec<String>> {
        let mut names = BTreeSet::new();

        for dir in self.dirs() {
            let pattern = dir.join("**").join("*.toml");
            let pattern = pattern.to_string_lossy();
            let entries = glob::glob(&pattern).map_err(|e| {
                Error::Configuration(format!("invalid unit dir {}: {e}", dir.display()))
            })?;

            for entry in entries.filter_map(|e| e.ok()) {
                if let Some(name) = logical_name(&dir, &entry) {
                    names.insert(name);
                }
            }
        }

        Ok(names.into_iter().collect())
    }
}

fn logical_name(base: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(base).ok()?;
    let rel = if rel.file_name()? == "index.toml" {
        rel.parent()?.to_path_buf()
    } else {
        rel.with_extension("")
    };

    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_direct_file_then_index() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("JQuery")).unwrap();
        fs::write(dir.path().join("JQuery/index.toml"), "").unwrap();
        fs::write(dir.path().join("JQuery/Define.toml"), "").unwrap();

        let locator = Locator::with_dirs([dir.path()]);
        assert_eq!(locator.find("JQuery").unwrap(), dir.path().join("JQuery/index.toml"));
        assert_eq!(locator.find("JQuery/Define").unwrap(), dir.path().join("JQuery/Define.toml"));
        assert_eq!(locator.find("JQuery.Define").unwrap(), dir.path().join("JQuery/Define.toml"));
    }

    #[test]
    fn test_first_dir_wins() {
        let a = tempdir().unwrap();
        let b = tempdir().unwrap();
        fs::write(a.path().join("Popper.toml"), "").unwrap();
        fs::write(b.path().join("Popper.toml"), "").unwrap();

        let locator = Locator::with_dirs([a.path(), b.path(), a.path()]);
        assert_eq!(locator.dirs().len(), 2);
        assert_eq!(locator.find("Popper").unwrap(), a.path().join("Popper.toml"));
    }

    #[test]
    fn test_hits_are_cached() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Popper.toml");
        fs::write(&file, "").unwrap();

        let locator = Locator::with_dirs([dir.path()]);
        assert_eq!(locator.find("Popper").unwrap(), file);
        fs::remove_file(&file).unwrap();
        assert_eq!(locator.find("Popper").unwrap(), file);
    }

    #[test]
    fn test_cache_shared_across_spellings() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("JQuery/Define.toml");
        fs::create_dir_all(dir.path().join("JQuery")).unwrap();
        fs::write(&file, "").unwrap();

        let locator = Locator::with_dirs([dir.path()]);
        assert_eq!(locator.find("JQuery.Define").unwrap(), file);
        fs::remove_file(&file).unwrap();
        assert_eq!(locator.find("JQuery/Define").unwrap(), file);
    }

    #[test]
    fn test_missing_unit_is_resolution_error() {
        let dir = tempdir().unwrap();
        let locator = Locator::with_dirs([dir.path()]);
        assert!(matches!(
            locator.find("Nope"),
            Err(Error::Resolution { ref name }) if name == "Nope"
        ));
    }

    #[test]
    fn test_available_lists_logical_names() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Bootstrap/Dialog")).unwrap();
        fs::write(dir.path().join("Bootstrap/Dialog/index.toml"), "").unwrap();
        fs::write(dir.path().join("Bootstrap/Dialog/Wait.toml"), "").unwrap();
        fs::write(dir.path().join("Popper.toml"), "").unwrap();

        let locator = Locator::with_dirs([dir.path()]);
        assert_eq!(
            locator.available().unwrap(),
            ["Bootstrap/Dialog", "Bootstrap/Dialog/Wait", "Popper"]
        );
    }
}
