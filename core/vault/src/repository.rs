//! Encrypted entry persistence over a blob store.

use std::sync::Arc;
use tracing::debug;

use crate::entry::Entry;
use crate::registry::Registry;
use resivault_common::Result;
use resivault_crypto::{Decryptor, Encryptor, ZeroizingCipher};
use resivault_storage::BlobStorage;

/// Saves and loads whole entries, encrypted with an outer cipher.
///
/// The entry id is the storage key.
pub struct EntryRepository {
    cipher: ZeroizingCipher,
    storage: Arc<dyn BlobStorage>,
    registry: Arc<Registry>,
}

impl EntryRepository {
    pub fn new(
        cipher: ZeroizingCipher,
        storage: Arc<dyn BlobStorage>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            cipher,
            storage,
            registry,
        }
    }

    /// Serialize, encrypt and store `entry`.
    ///
    /// # Returns
    /// The entry id the blob was stored under.
    pub async fn save(&self, entry: &Entry) -> Result<String> {
        let mut plaintext = entry.to_json_bytes()?;
        let ciphertext = self.cipher.encrypt(&mut plaintext)?;

        debug!(
            entry_id = %entry.id(),
            backend = self.storage.name(),
            bytes = ciphertext.len(),
            "Saving entry"
        );
        self.storage.save(entry.id(), ciphertext).await?;
        Ok(entry.id().to_string())
    }

    /// Load and decrypt an entry.
    ///
    /// # Returns
    /// `Ok(None)` if nothing is stored under `id`.
    ///
    /// # Errors
    /// - `CryptoFailure` if the blob does not decrypt under this cipher
    /// - `Serialization`, `SchemaViolation` or an unsupported-type error if
    ///   the decrypted envelope is not a valid entry
    pub async fn load(&self, id: &str) -> Result<Option<Entry>> {
        let Some(ciphertext) = self.storage.load(id).await? else {
            return Ok(None);
        };

        let entry = self
            .cipher
            .decrypt(&ciphertext, |plain| Entry::from_json_bytes(plain, &self.registry))?;
        Ok(Some(entry))
    }

    /// Whether a blob exists under `id`, without decrypting it.
    pub async fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.storage.load(id).await?.is_some())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.storage.delete(id).await
    }

    pub async fn list_keys(&self) -> Result<Vec<String>> {
        self.storage.list_keys().await
    }
}
