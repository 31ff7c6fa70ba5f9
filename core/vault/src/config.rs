//! Cryptographic suite and on-disk layout of a vault.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use resivault_common::{Error, Result};
use resivault_crypto::{Aes128Ocb, Aes256KeyWrap, CipherProvider, ScryptKdfV1};

/// Id of the distinguished entry holding the wrapped keys.
pub const ROOT_ENTRY_ID: &str = "root";

/// Label of the wrapped outer key in the root entry.
pub const LABEL_OUTER_KEY: &str = "outer";

/// Label of the wrapped inner key in the root entry.
pub const LABEL_INNER_KEY: &str = "inner";

/// Name shown for the root entry.
pub const ROOT_ENTRY_NAME: &str = "(this vault)";

/// Directory and file suffix of the metadata store.
pub const META_DIR: &str = "meta";
pub const META_SUFFIX: &str = ".meta";

/// Directory and file suffix of the entry store.
pub const ENTRIES_DIR: &str = "entries";
pub const ENTRIES_SUFFIX: &str = ".secret";

/// Algorithms used by a vault.
///
/// Only the KDF name is persisted, so the suite is fixed at compile time.
#[derive(Clone)]
pub struct CryptoSuite {
    /// Wraps the outer and inner keys under the password-derived KEK.
    pub key_wrap: Arc<dyn CipherProvider>,
    /// Encrypts whole entries at rest.
    pub outer: Arc<dyn CipherProvider>,
    /// Encrypts individual secrets.
    pub inner: Arc<dyn CipherProvider>,
    pub kdf: ScryptKdfV1,
}

impl CryptoSuite {
    /// Reject a vault whose stored KDF name is not ours.
    ///
    /// Exact comparison: there is a single KDF version today.
    pub fn check_kdf(&self, stored: &str) -> Result<()> {
        if stored != self.kdf.name() {
            return Err(Error::CryptographyIncompatible(format!(
                "Unsupported KDF {}",
                stored
            )));
        }
        Ok(())
    }
}

impl Default for CryptoSuite {
    fn default() -> Self {
        Self {
            key_wrap: Arc::new(Aes256KeyWrap),
            outer: Arc::new(Aes128Ocb),
            inner: Arc::new(Aes128Ocb),
            kdf: ScryptKdfV1::new(),
        }
    }
}

impl std::fmt::Debug for CryptoSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoSuite")
            .field("key_wrap", &self.key_wrap.name())
            .field("outer", &self.outer.name())
            .field("inner", &self.inner.name())
            .field("kdf", &self.kdf.name())
            .finish()
    }
}

/// Where a vault keeps its two stores under a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultLayout {
    pub meta_dir: PathBuf,
    pub entries_dir: PathBuf,
}

impl VaultLayout {
    pub fn under(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            meta_dir: data_dir.join(META_DIR),
            entries_dir: data_dir.join(ENTRIES_DIR),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_suite() {
        let suite = CryptoSuite::default();
        assert_eq!(suite.key_wrap.name(), "aes-256-kw");
        assert_eq!(suite.outer.name(), "aes-128-ocb");
        assert_eq!(suite.inner.name(), "aes-128-ocb");
        assert_eq!(suite.kdf.name(), "scrypt-v1");
    }

    #[test]
    fn test_kdf_check_is_exact() {
        let suite = CryptoSuite::default();
        assert!(suite.check_kdf("scrypt-v1").is_ok());
        assert!(matches!(
            suite.check_kdf("scrypt-v2"),
            Err(Error::CryptographyIncompatible(_))
        ));
        assert!(suite.check_kdf("SCRYPT-V1").is_err());
    }

    #[test]
    fn test_layout() {
        let layout = VaultLayout::under("/data");
        assert_eq!(layout.meta_dir, PathBuf::from("/data/meta"));
        assert_eq!(layout.entries_dir, PathBuf::from("/data/entries"));
    }
}
