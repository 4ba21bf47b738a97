use crate::error::CheckerError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Load a JSON control file, turning a missing file into a fatal error that
/// tells the operator which step to re-run.
pub fn load_control_file<T: DeserializeOwned>(path: &Path, remedy: &'static str) -> Result<T> {
    let file = File::open(path).map_err(|_| CheckerError::MissingControlFile {
        path: path.to_path_buf(),
        remedy,
    })?;

    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)
        .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))
}

/// Memoizes parsed control files by path for the life of a run.
#[derive(Default)]
pub struct FileCache {
    entries: HashMap<PathBuf, Box<dyn Any>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `path` once; later calls hand back the cached value.
    pub fn get<T: DeserializeOwned + 'static>(
        &mut self,
        path: &Path,
        remedy: &'static str,
    ) -> Result<&T> {
        if !self.entries.contains_key(path) {
            let value: T = load_control_file(path, remedy)?;
            self.entries.insert(path.to_path_buf(), Box::new(value));
        }

        self.entries
            .get(path)
            .and_then(|value| value.downcast_ref::<T>())
            .with_context(|| format!("{} was cached as a different type", path.display()))
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Repositories already pulled during this run.
#[derive(Debug, Default)]
pub struct SyncedRepos {
    seen: HashSet<String>,
}

impl SyncedRepos {
    /// Records `suffix`; returns true if it was not already recorded.
    pub fn mark(&mut self, suffix: &str) -> bool {
        self.seen.insert(suffix.to_string())
    }

    pub fn contains(&self, suffix: &str) -> bool {
        self.seen.contains(suffix)
    }
}

/// Caller-owned state shared by the components of one processing run.
#[derive(Default)]
pub struct RunContext {
    pub files: FileCache,
    pub synced: SyncedRepos,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RERUN_ROSTER;
    use indexmap::IndexMap;

    #[test]
    fn test_missing_control_file_names_remedy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("student_aliases.json");

        let err = load_control_file::<IndexMap<String, String>>(&path, RERUN_ROSTER).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("student_aliases.json"));
        assert!(message.contains("roster"));
    }

    #[test]
    fn test_file_cache_reads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aliases.json");
        std::fs::write(&path, r#"{"jdoe3": "1234"}"#).unwrap();

        let mut cache = FileCache::new();
        let first: &IndexMap<String, String> = cache.get(&path, RERUN_ROSTER).unwrap();
        assert_eq!(first["jdoe3"], "1234");

        // Changes on disk are not seen until the entry is invalidated
        std::fs::write(&path, r#"{"jdoe3": "9999"}"#).unwrap();
        let second: &IndexMap<String, String> = cache.get(&path, RERUN_ROSTER).unwrap();
        assert_eq!(second["jdoe3"], "1234");
        assert_eq!(cache.len(), 1);

        cache.invalidate(&path);
        let third: &IndexMap<String, String> = cache.get(&path, RERUN_ROSTER).unwrap();
        assert_eq!(third["jdoe3"], "9999");
    }

    #[test]
    fn test_synced_repos_mark() {
        let mut synced = SyncedRepos::default();
        assert!(synced.mark("Team01"));
        assert!(!synced.mark("Team01"));
        assert!(synced.contains("Team01"));
        assert!(!synced.contains("Team02"));
    }
}
