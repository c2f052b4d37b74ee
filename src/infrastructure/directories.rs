use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::config::DirectoryConfig;

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub logs_dir: PathBuf,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

/// Creates the log and data directories and checks the data directory is
/// writable before the queue database is opened in it.
pub fn ensure_directories(cfg: &DirectoryConfig) -> Result<ResolvedPaths> {
    let logs_dir = ensure_dir(&cfg.logs_dir)?;
    let data_dir = ensure_dir(&cfg.data_dir)?;
    let db_path = data_dir.join(&cfg.db_filename);

    let probe_file = data_dir.join(".write-test");
    fs::write(&probe_file, b"ok")
        .with_context(|| format!("data directory {} is not writable", data_dir.display()))?;
    fs::remove_file(&probe_file)?;

    Ok(ResolvedPaths {
        logs_dir,
        data_dir,
        db_path,
    })
}

fn ensure_dir(path: &str) -> Result<PathBuf> {
    let dir = PathBuf::from(path);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create directory {path}"))?;
    Ok(dir.canonicalize().unwrap_or(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_directories() {
        let root = tempfile::tempdir().unwrap();
        let cfg = DirectoryConfig {
            logs_dir: root.path().join("var/logs").display().to_string(),
            data_dir: root.path().join("var/data").display().to_string(),
            db_filename: "queue.db".to_string(),
        };
        let paths = ensure_directories(&cfg).unwrap();
        assert!(paths.logs_dir.is_dir());
        assert!(paths.data_dir.is_dir());
        assert_eq!(paths.db_path.file_name().unwrap(), "queue.db");
        assert!(!paths.data_dir.join(".write-test").exists());
    }
}
