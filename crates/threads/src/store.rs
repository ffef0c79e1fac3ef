//! File-backed mapping store.
//!
//! Persists mappings in `threads.json` under `<state_path>/threads/`. The
//! whole table is loaded at startup and written through on every new
//! mapping via a temp file + rename, so a crash never leaves a truncated
//! file behind.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use ab_domain::error::{Error, Result};

use crate::mapping::{ChannelMapping, MappingStore};

/// Mapping store backed by a JSON file.
///
/// `insert` blocks on disk I/O while holding the write lock; async callers
/// run it on the blocking pool (see `ThreadStore::get_or_create`).
pub struct JsonMappingStore {
    path: PathBuf,
    mappings: RwLock<HashMap<String, ChannelMapping>>,
}

impl JsonMappingStore {
    /// Load or create the store at `state_path/threads/threads.json`.
    pub fn new(state_path: &Path) -> Result<Self> {
        let dir = state_path.join("threads");
        std::fs::create_dir_all(&dir)?;

        let path = dir.join("threads.json");
        let mappings = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| {
                Error::Store(format!("parsing {}: {e}", path.display()))
            })?
        } else {
            HashMap::new()
        };

        tracing::info!(
            mappings = mappings.len(),
            path = %path.display(),
            "thread store loaded"
        );

        Ok(Self {
            path,
            mappings: RwLock::new(mappings),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize the table and atomically replace the file.
    fn persist(&self, mappings: &HashMap<String, ChannelMapping>) -> Result<()> {
        let json = serde_json::to_string_pretty(mappings)?;
        let dir = self.path.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::Store(format!("replacing {}: {e}", self.path.display())))?;
        Ok(())
    }
}

impl MappingStore for JsonMappingStore {
    fn get(&self, channel_id: &str) -> Option<ChannelMapping> {
        self.mappings.read().get(channel_id).cloned()
    }

    fn insert(&self, mapping: ChannelMapping) -> Result<ChannelMapping> {
        let mut mappings = self.mappings.write();
        if let Some(existing) = mappings.get(&mapping.channel_id) {
            return Ok(existing.clone());
        }

        let channel_id = mapping.channel_id.clone();
        mappings.insert(channel_id.clone(), mapping.clone());
        if let Err(e) = self.persist(&mappings) {
            // Keep memory and disk consistent: the mapping is not stored.
            mappings.remove(&channel_id);
            return Err(e);
        }
        Ok(mapping)
    }

    fn list(&self) -> Vec<ChannelMapping> {
        let mut all: Vec<ChannelMapping> = self.mappings.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        all
    }
}
