//! Shared JSON persistence for the file-backed stores.
//!
//! Each store loads its document once at startup, mutates in memory behind a
//! lock, and writes the whole document back on each mutation. An exclusive
//! file lock is held around the write so two console processes pointed at the
//! same data directory cannot interleave.

use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("store encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Read and parse a store document. Missing file starts empty; an unparseable
/// file also starts empty (and is logged) rather than refusing to boot.
pub async fn load_json<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match tokio::fs::read_to_string(path).await {
        Ok(s) => match serde_json::from_str(&s) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("ignoring unparseable store file {}: {}", path.display(), e);
                T::default()
            }
        },
        Err(_) => T::default(),
    }
}

/// Serialize and write a store document under an exclusive file lock.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.lock_exclusive()?;
    let res = (&file).write_all(json.as_bytes());
    let _ = fs2::FileExt::unlock(&file);
    res?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Doc {
        items: Vec<String>,
    }

    #[tokio::test]
    async fn round_trips_a_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let doc = Doc {
            items: vec!["a".to_string(), "b".to_string()],
        };
        save_json(&path, &doc).unwrap();
        let loaded: Doc = load_json(&path).await;
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Doc = load_json(&dir.path().join("absent.json")).await;
        assert_eq!(loaded, Doc::default());
    }

    #[tokio::test]
    async fn unparseable_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, "not json").unwrap();
        let loaded: Doc = load_json(&path).await;
        assert_eq!(loaded, Doc::default());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/doc.json");
        save_json(&path, &Doc::default()).unwrap();
        assert!(path.exists());
    }
}
