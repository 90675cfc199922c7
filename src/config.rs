use crate::storage::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest batch the stager accepts
pub const MAX_BATCH_SIZE: usize = 1000;

/// Overrides `batch_size` from the config file
pub const BATCH_SIZE_ENV: &str = "FACTSTORE_DB_BATCH_SIZE";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FactstoreConfig {
    pub database: Option<String>,
    pub batch_size: Option<usize>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("factstore.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".factstore").join("facts.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<FactstoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: FactstoreConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Clamp a configured batch size: 0 means the default, the ceiling is 1000
pub fn clamp_batch_size(requested: usize) -> usize {
    match requested {
        0 => DEFAULT_BATCH_SIZE,
        n => n.min(MAX_BATCH_SIZE),
    }
}

/// Effective batch size: environment, then config file, then the default
pub fn resolve_batch_size(config: Option<&FactstoreConfig>) -> usize {
    batch_size_from(std::env::var(BATCH_SIZE_ENV).ok().as_deref(), config)
}

/// An unparsable override is ignored
fn batch_size_from(env_value: Option<&str>, config: Option<&FactstoreConfig>) -> usize {
    let requested = env_value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .or_else(|| config.and_then(|c| c.batch_size))
        .unwrap_or(DEFAULT_BATCH_SIZE);
    clamp_batch_size(requested)
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("factstore.toml"))).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("factstore.toml");
        std::fs::write(&path, "database = \"out/facts.db\"\nbatch_size = 50\n").unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.database.as_deref(), Some("out/facts.db"));
        assert_eq!(config.batch_size, Some(50));

        std::fs::write(&path, "batch_size = \"many\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_clamp_batch_size() {
        assert_eq!(clamp_batch_size(0), 200);
        assert_eq!(clamp_batch_size(50), 50);
        assert_eq!(clamp_batch_size(5000), 1000);
    }

    #[test]
    fn test_env_override_beats_config() {
        let config = FactstoreConfig {
            batch_size: Some(50),
            ..Default::default()
        };
        assert_eq!(batch_size_from(Some(" 75 "), Some(&config)), 75);
        assert_eq!(batch_size_from(Some("9999"), Some(&config)), 1000);
        assert_eq!(batch_size_from(Some("0"), Some(&config)), 200);
        assert_eq!(batch_size_from(Some("lots"), Some(&config)), 50);
        assert_eq!(batch_size_from(None, Some(&config)), 50);
        assert_eq!(batch_size_from(None, None), 200);
    }

    #[test]
    fn test_ensure_db_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = default_database_path_in(dir.path());
        ensure_db_dir(&db_path).unwrap();
        assert!(dir.path().join(".factstore").is_dir());
    }
}
