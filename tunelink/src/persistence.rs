use std::io::Result;

use bytes::Bytes;

use crate::async_trait;

mod memory;
pub use memory::MemoryPersistence;

mod filesystem;
pub use filesystem::FilesystemPersistence;

/// Durable key/value storage for cache contents.
#[async_trait]
pub trait DurablePersistence: std::fmt::Debug + Send + Sync + 'static {
    async fn load(&self, key: &str) -> Result<Option<Bytes>>;
    async fn save(&self, key: &str, bytes: Bytes) -> Result<()>;
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
