// # File Snapshot Store
//
// File-based implementation of SnapshotStore.
//
// ## File Format
//
// A single JSON file holding the plain id → record mapping, rewritten in
// full on every persist. No envelope, no version field; full-file overwrite
// is the durability model.
//
// ```json
// {
//   "relay-1": {
//     "address": "10.0.0.1",
//     "port": 9000,
//     "public_key": "...",
//     "last_seen": 1736424000000
//   }
// }
// ```
//
// ## Crash Behavior
//
// - Atomic writes: new state goes to a `.tmp` sibling, then renamed over
//   the snapshot file
// - An absent file loads as an empty mapping
// - A corrupt file is a load error; the registry logs it and starts empty

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::store::RelayRecord;
use crate::traits::SnapshotStore;

/// File-based snapshot store with atomic full-file rewrites
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    /// Create a file snapshot store at `path`
    ///
    /// Creates the parent directory if needed. The file itself is only
    /// created by the first persist.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::snapshot(format!(
                    "failed to create snapshot directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self { path })
    }

    /// Path to the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> crate::Result<HashMap<String, RelayRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no snapshot file at {}, starting fresh", self.path.display());
                return Ok(HashMap::new());
            }
            Err(e) => {
                return Err(Error::snapshot(format!(
                    "failed to read snapshot file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content).map_err(|e| {
            Error::snapshot(format!(
                "failed to parse snapshot file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn persist(&self, snapshot: &HashMap<String, RelayRecord>) -> crate::Result<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| Error::snapshot(format!("failed to serialize snapshot: {}", e)))?;

        // Write to a temporary file first, then rename over the target.
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::snapshot(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::snapshot(format!(
                    "failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::snapshot(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::snapshot(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("snapshot written to {}", self.path.display());
        Ok(())
    }
}
