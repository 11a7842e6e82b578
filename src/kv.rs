// Durable key-value text store backing task and preference persistence

use crate::error::{Result, StoreError};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const STORE_FILE: &str = "store.json";

/// String-keyed, string-valued store persisted as a single JSON object file.
///
/// The file is the durable source of truth: it is read wholesale at open and
/// rewritten wholesale on every `set`. Writes go through a temp file, fsync,
/// and rename so a crash mid-write leaves the previous contents intact.
pub struct TextStore {
    dir: PathBuf,
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl TextStore {
    /// Open or create a store in the given directory.
    ///
    /// A store file that no longer parses is reported with a warning and
    /// replaced by an empty map on the next write; startup never fails on
    /// corrupt content.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let path = dir.join(STORE_FILE);
        let values = match Self::read_file(&path) {
            Ok(values) => values,
            Err(StoreError::CorruptState(e)) => {
                warn!(file = ?path, error = ?e, "Store file corrupt, starting empty");
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };

        debug!(file = ?path, keys = values.len(), "Opened text store");
        Ok(Self { dir, path, values })
    }

    fn read_file(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(StoreError::CorruptState)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a key and rewrite the backing file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        // Hold an exclusive lock on the live file while replacing it, so two
        // processes sharing the directory cannot interleave rewrites.
        let lock = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)?;
        lock.lock_exclusive()?;

        let tmp = self.dir.join(format!("{STORE_FILE}.tmp"));
        let json = serde_json::to_string_pretty(&self.values)?;
        let mut file = fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;

        // Lock is released when `lock` is dropped
        Ok(())
    }
}
