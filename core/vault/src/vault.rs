//! The vault: key hierarchy, lock state and entry cache.
//!
//! # Key hierarchy
//! ```text
//! password --scrypt--> KEK --AES-KW--> outer key --AES-OCB--> entry blobs
//!                                  \-> inner key --AES-OCB--> secret values
//! ```
//! The wrapped outer and inner keys live in the root entry, which is stored
//! through a plaintext repository in the metadata store. Every other entry
//! lives in the entry store, encrypted under the outer key.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::{
    CryptoSuite, VaultLayout, ENTRIES_SUFFIX, LABEL_INNER_KEY, LABEL_OUTER_KEY, META_SUFFIX,
    ROOT_ENTRY_ID, ROOT_ENTRY_NAME,
};
use crate::entry::Entry;
use crate::registry::Registry;
use crate::repository::EntryRepository;
use crate::secret::{Secret, SecretKind};
use crate::session::UnlockedState;
use crate::usage::{Usage, UsageKind};
use crate::variants::{encryption_key, VaultAccess};
use resivault_common::{Error, Result, VaultId};
use resivault_crypto::{
    CipherKey, CipherProvider, DerivedKey, PlaintextForMetadataOnly, Salt, ZeroizingCipher,
};
use resivault_storage::{BlobStorage, FilesystemStorage};

/// Password-protected store of entries.
///
/// States:
/// - uninitialized: no root entry in the metadata store
/// - locked: root entry exists, no keys in memory
/// - unlocked: keys in memory, entries cached
///
/// A `Vault` is not internally synchronized. Callers sharing one across
/// tasks must serialize access (e.g. behind a `Mutex`).
pub struct Vault {
    suite: CryptoSuite,
    registry: Arc<Registry>,
    meta: EntryRepository,
    entry_store: Arc<dyn BlobStorage>,
    unlocked: Option<UnlockedState>,
    loading_errors: BTreeMap<String, Error>,
}

impl Vault {
    /// Create a vault over a metadata store and an entry store.
    pub fn new(
        meta_store: Arc<dyn BlobStorage>,
        entry_store: Arc<dyn BlobStorage>,
        registry: Arc<Registry>,
    ) -> Self {
        Self::with_suite(meta_store, entry_store, registry, CryptoSuite::default())
    }

    pub fn with_suite(
        meta_store: Arc<dyn BlobStorage>,
        entry_store: Arc<dyn BlobStorage>,
        registry: Arc<Registry>,
        suite: CryptoSuite,
    ) -> Self {
        let plain: Arc<dyn CipherProvider> = Arc::new(PlaintextForMetadataOnly);
        let no_key = plain.generate_key();
        let meta = EntryRepository::new(
            ZeroizingCipher::new(plain, no_key),
            meta_store,
            registry.clone(),
        );

        Self {
            suite,
            registry,
            meta,
            entry_store,
            unlocked: None,
            loading_errors: BTreeMap::new(),
        }
    }

    /// Open a vault kept in `data_dir` (`meta/*.meta`, `entries/*.secret`).
    ///
    /// # Errors
    /// - `Storage` if either directory cannot be created
    pub fn open_dir(data_dir: impl AsRef<Path>, registry: Arc<Registry>) -> Result<Self> {
        let layout = VaultLayout::under(data_dir);
        let meta = FilesystemStorage::new(&layout.meta_dir, META_SUFFIX)?;
        let entries = FilesystemStorage::new(&layout.entries_dir, ENTRIES_SUFFIX)?;
        Ok(Self::new(Arc::new(meta), Arc::new(entries), registry))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Whether a root entry has been written.
    pub async fn is_initialized(&self) -> Result<bool> {
        self.meta.contains(ROOT_ENTRY_ID).await
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked.is_some()
    }

    fn state(&self) -> Result<&UnlockedState> {
        self.unlocked.as_ref().ok_or(Error::VaultNotUnlocked)
    }

    fn state_mut(&mut self) -> Result<&mut UnlockedState> {
        self.unlocked.as_mut().ok_or(Error::VaultNotUnlocked)
    }

    /// Run the KDF off the async executor.
    async fn derive_kek(&self, password: &str, salt: Option<Salt>) -> Result<DerivedKey> {
        let kdf = self.suite.kdf.clone();
        let key_bytes = self.suite.key_wrap.key_bytes();
        let password = Zeroizing::new(password.to_string());

        tokio::task::spawn_blocking(move || match salt {
            Some(salt) => kdf
                .derive_key(&password, &salt, key_bytes)
                .map(|key| DerivedKey { key, salt }),
            None => kdf.derive_new_key(&password, key_bytes),
        })
        .await
        .map_err(|e| Error::Crypto(format!("Key derivation task failed: {}", e)))?
    }

    fn key_cipher(&self, kek: CipherKey) -> ZeroizingCipher {
        ZeroizingCipher::new(self.suite.key_wrap.clone(), kek)
    }

    /// Root entry holding `outer` and `inner` wrapped under `kek`.
    fn build_root_entry(
        &self,
        vault_id: &str,
        kek: DerivedKey,
        outer: &CipherKey,
        inner: &CipherKey,
    ) -> Result<Entry> {
        let access = VaultAccess::new(vault_id, self.suite.kdf.name(), &kek.salt);
        let wrapper = self.key_cipher(kek.key);

        let secrets = vec![
            encryption_key::seal_key(LABEL_OUTER_KEY, outer, &wrapper)?,
            encryption_key::seal_key(LABEL_INNER_KEY, inner, &wrapper)?,
        ];

        Ok(Entry::new(
            ROOT_ENTRY_ID,
            ROOT_ENTRY_NAME,
            Vec::new(),
            Usage::vault_access(&access)?,
            secrets,
        ))
    }

    async fn load_root(&self) -> Result<Entry> {
        self.meta
            .load(ROOT_ENTRY_ID)
            .await?
            .ok_or(Error::RootEntryNotFound)
    }

    /// Check the root entry's shape and unwrap its keys with `password`.
    ///
    /// # Returns
    /// `(vault access details, outer key, inner key)`
    async fn unwrap_root_keys(
        &self,
        root: &Entry,
        password: &str,
    ) -> Result<(VaultAccess, CipherKey, CipherKey)> {
        if root.usage().kind() != UsageKind::VaultAccess {
            return Err(Error::RootEntryMalformed(
                "Usage type must be VaultAccess".to_string(),
            ));
        }
        let access = VaultAccess::from_details(root.usage().details())?;
        self.suite.check_kdf(&access.kdf)?;
        let salt = access.salt()?;

        let (outer, inner) = match (
            root.secrets().len(),
            root.get_secret(LABEL_OUTER_KEY),
            root.get_secret(LABEL_INNER_KEY),
        ) {
            (2, Some(outer), Some(inner)) => (outer, inner),
            _ => {
                return Err(Error::RootEntryMalformed(
                    "Root entry must hold exactly the outer and inner keys".to_string(),
                ))
            }
        };
        for secret in [outer, inner] {
            if secret.kind() != SecretKind::EncryptionKey {
                return Err(Error::RootEntryMalformed(format!(
                    "{} key is not an EncryptionKey",
                    secret.label()
                )));
            }
        }

        let kek = self.derive_kek(password, Some(salt)).await?;
        let unwrapper = self.key_cipher(kek.key);

        let outer_key = Self::unwrap_key(outer, &unwrapper, self.suite.outer.key_bytes())?;
        let inner_key = Self::unwrap_key(inner, &unwrapper, self.suite.inner.key_bytes())?;
        Ok((access, outer_key, inner_key))
    }

    fn unwrap_key(secret: &Secret, unwrapper: &ZeroizingCipher, expected: usize) -> Result<CipherKey> {
        let key = encryption_key::reveal_key(secret, unwrapper)?;
        if key.len() != expected {
            return Err(Error::RootEntryMalformed(format!(
                "{} key has {} bytes, expected {}",
                secret.label(),
                key.len(),
                expected
            )));
        }
        Ok(key)
    }

    /// Create the key hierarchy and write the root entry.
    ///
    /// # Postconditions
    /// - The vault is locked and can be unlocked with `password`
    ///
    /// # Errors
    /// - `VaultAlreadyInitialized` if a root entry exists
    /// - `PasswordNotProvided` if `password` is empty
    pub async fn initialize_new(&mut self, password: &str) -> Result<()> {
        if self.is_initialized().await? {
            return Err(Error::VaultAlreadyInitialized);
        }

        let kek = self.derive_kek(password, None).await?;
        let outer_key = self.suite.outer.generate_key();
        let inner_key = self.suite.inner.generate_key();
        let vault_id = VaultId::generate();

        let root = self.build_root_entry(vault_id.as_str(), kek, &outer_key, &inner_key)?;
        self.meta.save(&root).await?;

        info!(vault_id = %vault_id, kdf = self.suite.kdf.name(), "Vault initialized");
        Ok(())
    }

    /// Derive the KEK, unwrap both data keys and enter the unlocked state.
    ///
    /// On failure the vault stays in whatever state it was in before.
    ///
    /// # Errors
    /// - `RootEntryNotFound` if the vault was never initialized
    /// - `RootEntryMalformed` if the root entry has the wrong shape
    /// - `CryptographyIncompatible` if the stored KDF is unknown
    /// - `CryptoFailure` on a wrong password
    pub async fn unlock(&mut self, password: &str) -> Result<()> {
        let root = self.load_root().await?;
        let (access, outer_key, inner_key) = match self.unwrap_root_keys(&root, password).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Unlock failed");
                return Err(e);
            }
        };

        let repository = EntryRepository::new(
            ZeroizingCipher::new(self.suite.outer.clone(), outer_key.clone()),
            self.entry_store.clone(),
            self.registry.clone(),
        );
        let inner = ZeroizingCipher::new(self.suite.inner.clone(), inner_key.clone());

        self.unlocked = Some(UnlockedState::new(outer_key, inner_key, repository, inner));
        self.loading_errors.clear();

        info!(vault_id = %access.vault_id, "Vault unlocked");
        Ok(())
    }

    /// Drop both data keys and the entry cache. No-op when already locked.
    pub fn lock(&mut self) {
        if let Some(state) = self.unlocked.take() {
            let cached = state.entries.len();
            drop(state);
            info!(cached_entries = cached, "Vault locked");
        }
    }

    /// Load one entry from storage into the cache.
    ///
    /// # Errors
    /// - `VaultNotUnlocked`
    /// - `EntryNotFound` if nothing is stored under `id`
    pub async fn load_entry(&mut self, id: &str) -> Result<()> {
        let state = self.state_mut()?;
        let entry = state
            .repository
            .load(id)
            .await?
            .ok_or_else(|| Error::EntryNotFound(id.to_string()))?;

        debug!(entry_id = %id, secrets = entry.secrets().len(), "Entry loaded");
        state.entries.insert(entry.id().to_string(), entry);
        Ok(())
    }

    /// Load every stored entry, one at a time in listing order.
    ///
    /// Per-entry failures are recorded in [`loading_errors`](Self::loading_errors)
    /// instead of aborting the scan.
    ///
    /// # Returns
    /// Number of entries loaded.
    pub async fn load_entries(&mut self) -> Result<usize> {
        let ids = self.state()?.repository.list_keys().await?;
        let mut loaded = 0;

        for id in ids {
            if id == ROOT_ENTRY_ID {
                continue;
            }
            match self.load_entry(&id).await {
                Ok(()) => {
                    self.loading_errors.remove(&id);
                    loaded += 1;
                }
                Err(e) => {
                    warn!(entry_id = %id, error = %e, "Failed to load entry");
                    self.loading_errors.insert(id, e);
                }
            }
        }

        info!(
            loaded,
            failed = self.loading_errors.len(),
            "Entries loaded"
        );
        Ok(loaded)
    }

    /// Failures recorded by the last [`load_entries`](Self::load_entries)
    /// calls since unlocking, keyed by entry id.
    pub fn loading_errors(&self) -> &BTreeMap<String, Error> {
        &self.loading_errors
    }

    /// Cached entry by id.
    pub fn get_entry(&self, id: &str) -> Result<Option<&Entry>> {
        Ok(self.state()?.entries.get(id))
    }

    /// Cached entries in id order.
    pub fn entries(&self) -> Result<impl Iterator<Item = &Entry>> {
        Ok(self.state()?.entries.values())
    }

    pub fn entry_ids(&self) -> Result<Vec<String>> {
        Ok(self.state()?.entries.keys().cloned().collect())
    }

    /// Persist `entry`, then cache it.
    ///
    /// # Errors
    /// - `VaultNotUnlocked`
    /// - `InvalidInput` for an empty id, the reserved root id, or an id the
    ///   entry store cannot hold as a single key
    pub async fn save_entry(&mut self, entry: Entry) -> Result<String> {
        let state = self.state_mut()?;
        if entry.id().is_empty() || entry.id() == ROOT_ENTRY_ID {
            return Err(Error::InvalidInput(format!(
                "Entry id {:?} is reserved or empty",
                entry.id()
            )));
        }

        let id = state.repository.save(&entry).await?;
        state.entries.insert(id.clone(), entry);

        debug!(entry_id = %id, "Entry saved");
        Ok(id)
    }

    /// Remove an entry from storage and the cache.
    ///
    /// # Errors
    /// - `EntryNotFound` if it is neither cached nor stored
    pub async fn delete_entry(&mut self, id: &str) -> Result<()> {
        let state = self.state_mut()?;
        if !state.entries.contains_key(id) && !state.repository.contains(id).await? {
            return Err(Error::EntryNotFound(id.to_string()));
        }

        state.repository.delete(id).await?;
        state.entries.remove(id);
        self.loading_errors.remove(id);

        info!(entry_id = %id, "Entry deleted");
        Ok(())
    }

    /// Seal `value` as a new secret of `type_tag` under the inner key.
    ///
    /// # Errors
    /// - `VaultNotUnlocked`
    /// - `SecretTypeNotSupported` if `type_tag` is not registered
    /// - `SchemaViolation` if `value` does not fit the variant
    pub fn seal_secret(&self, type_tag: &str, label: &str, value: &Value) -> Result<Secret> {
        let state = self.state()?;
        self.registry.secret(type_tag)?.seal(label, value, &state.inner)
    }

    /// Decrypt a secret sealed under this vault's inner key.
    pub fn reveal_secret(&self, secret: &Secret) -> Result<Value> {
        secret.reveal(&self.registry, &self.state()?.inner)
    }

    /// Seal a value and attach it to a cached entry, then persist the entry.
    ///
    /// # Errors
    /// - `EntryNotFound` if the entry is not cached
    /// - `SecretLabelAlreadyExists`; the entry is unchanged in the cache and
    ///   in storage
    pub async fn add_secret(
        &mut self,
        entry_id: &str,
        type_tag: &str,
        label: &str,
        value: &Value,
    ) -> Result<()> {
        let mut entry = self
            .get_entry(entry_id)?
            .cloned()
            .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;
        if entry.get_secret(label).is_some() {
            return Err(Error::SecretLabelAlreadyExists(label.to_string()));
        }

        let secret = self.seal_secret(type_tag, label, value)?;
        entry.add_secret(secret)?;
        self.save_entry(entry).await?;

        info!(entry_id = %entry_id, label = %label, secret_type = %type_tag, "Secret added");
        Ok(())
    }

    /// Detach a secret from a cached entry and persist the entry.
    ///
    /// # Errors
    /// - `EntryNotFound`, `SecretNotFound`
    pub async fn remove_secret(&mut self, entry_id: &str, label: &str) -> Result<()> {
        let mut entry = self
            .get_entry(entry_id)?
            .cloned()
            .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;
        entry.delete_secret(label)?;
        self.save_entry(entry).await?;

        info!(entry_id = %entry_id, label = %label, "Secret removed");
        Ok(())
    }

    /// Reveal the secret `label` of cached entry `entry_id`.
    pub fn reveal_entry_secret(&self, entry_id: &str, label: &str) -> Result<Value> {
        let entry = self
            .get_entry(entry_id)?
            .ok_or_else(|| Error::EntryNotFound(entry_id.to_string()))?;
        let secret = entry
            .get_secret(label)
            .ok_or_else(|| Error::SecretNotFound(label.to_string()))?;
        self.reveal_secret(secret)
    }

    /// Re-wrap the current data keys under a KEK derived from `new_password`.
    ///
    /// Entry blobs are untouched: only the root entry is rewritten, with a
    /// fresh salt and the same vault id.
    ///
    /// # Errors
    /// - `VaultNotUnlocked`
    /// - `CryptoFailure` if `old_password` does not unwrap the keys in use
    /// - `PasswordNotProvided` if `new_password` is empty
    pub async fn change_password(&mut self, old_password: &str, new_password: &str) -> Result<()> {
        let state = self.state()?;
        let root = self.load_root().await?;
        let (access, outer, inner) = self.unwrap_root_keys(&root, old_password).await?;

        let same_outer = outer.as_bytes().ct_eq(state.outer_key.as_bytes());
        let same_inner = inner.as_bytes().ct_eq(state.inner_key.as_bytes());
        if !bool::from(same_outer & same_inner) {
            return Err(Error::CryptoFailure);
        }

        let kek = self.derive_kek(new_password, None).await?;
        let root = self.build_root_entry(&access.vault_id, kek, &outer, &inner)?;
        self.meta.save(&root).await?;

        info!(vault_id = %access.vault_id, "Vault password changed");
        Ok(())
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("suite", &self.suite)
            .field("unlocked", &self.is_unlocked())
            .field("loading_errors", &self.loading_errors.len())
            .finish()
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        self.lock();
    }
}
