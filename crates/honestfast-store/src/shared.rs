//! Shared state blob on disk

use honestfast_api::{SharedSnapshot, SyncPayload};
use honestfast_host_api::{HostError, HostResult, SharedStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// [`SharedStore`] backed by a JSON file holding the flat key-value map
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the target, so readers in other processes never see a
/// partial record.
#[derive(Debug, Clone)]
pub struct FileSharedStore {
    path: PathBuf,
}

impl FileSharedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SharedStore for FileSharedStore {
    fn write(&self, snapshot: &SharedSnapshot) -> HostResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_vec_pretty(&snapshot.to_payload())
            .map_err(|e| HostError::Serialization(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| HostError::Io(e.error))?;

        debug!(path = %self.path.display(), is_fasting = snapshot.is_fasting, "Shared state written");
        Ok(())
    }

    fn read(&self) -> HostResult<SharedSnapshot> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SharedSnapshot::default());
            }
            Err(e) => return Err(e.into()),
        };

        let payload: SyncPayload = serde_json::from_str(&contents)
            .map_err(|e| HostError::Serialization(e.to_string()))?;
        Ok(SharedSnapshot::from_payload(&payload))
    }
}
