//! Storage trait definition.

use async_trait::async_trait;

use resivault_common::Result;

/// Key/value blob store consumed by the entry repository.
///
/// Keys are opaque identifiers. Implementations decide how to map them onto
/// their medium but must round-trip any key returned by [`list_keys`].
///
/// [`list_keys`]: BlobStorage::list_keys
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Backend name for logs (e.g. "memory", "filesystem").
    fn name(&self) -> &str;

    /// Store `data` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// - `Storage` if the medium rejects the write
    async fn save(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Fetch the bytes stored under `key`.
    ///
    /// Absence is not an error: a missing key yields `Ok(None)`.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All stored keys, in the backend's listing order.
    async fn list_keys(&self) -> Result<Vec<String>>;
}
