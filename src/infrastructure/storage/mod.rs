pub mod file;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::models::KeyValueStore;

pub type StoreArc = Arc<dyn KeyValueStore>;

pub struct StorageManager {}

impl StorageManager {
    /// Storage backing the CLI. An empty path keeps everything in memory for
    /// the lifetime of the process.
    pub fn get(path: &str) -> StoreArc {
        if path.is_empty() {
            return Arc::new(memory::MemoryStore::default());
        }

        return Arc::new(file::FileStore::new(PathBuf::from(path)));
    }
}
