use std::{collections::HashMap, io::Result, sync::Mutex};

use bytes::Bytes;

use super::DurablePersistence;

#[derive(Default)]
pub struct MemoryPersistence {
    values: Mutex<HashMap<String, Bytes>>,
}

impl std::fmt::Debug for MemoryPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPersistence").finish()
    }
}

impl MemoryPersistence {
    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, Bytes>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl DurablePersistence for MemoryPersistence {
    async fn load(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.values().get(key).cloned())
    }
    async fn save(&self, key: &str, bytes: Bytes) -> Result<()> {
        self.values().insert(key.to_owned(), bytes);
        Ok(())
    }
    async fn delete(&self, key: &str) -> Result<()> {
        self.values().remove(key);
        Ok(())
    }
}
