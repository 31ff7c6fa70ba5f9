//! Key material and cache that exist only while a vault is unlocked.

use std::collections::BTreeMap;

use crate::entry::Entry;
use crate::repository::EntryRepository;
use resivault_crypto::{CipherKey, ZeroizingCipher};

/// Sensitive half of a [`Vault`](crate::Vault).
///
/// Dropping this struct zeroizes both data keys (every copy is a
/// `CipherKey`) and discards the entry cache.
pub(crate) struct UnlockedState {
    pub(crate) outer_key: CipherKey,
    pub(crate) inner_key: CipherKey,
    /// Repository bound to the outer key.
    pub(crate) repository: EntryRepository,
    /// Inner encryptor/decryptor for secrets.
    pub(crate) inner: ZeroizingCipher,
    pub(crate) entries: BTreeMap<String, Entry>,
}

impl UnlockedState {
    pub(crate) fn new(
        outer_key: CipherKey,
        inner_key: CipherKey,
        repository: EntryRepository,
        inner: ZeroizingCipher,
    ) -> Self {
        Self {
            outer_key,
            inner_key,
            repository,
            inner,
            entries: BTreeMap::new(),
        }
    }
}
