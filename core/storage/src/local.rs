//! Local filesystem storage backend.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::provider::BlobStorage;
use resivault_common::{Error, Result};

/// Suffix of in-flight writes; never matches a configured suffix.
const PARTIAL_SUFFIX: &str = ".partial";

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> Error {
    Error::Storage(format!("Failed to {} {}: {}", action, path.display(), err))
}

/// Filesystem blob store: one file per key in a single directory.
///
/// A key maps to `<base_dir>/<key><suffix>`. Keys must be a single plain
/// file name component; anything that would name another directory is
/// rejected rather than rewritten, so distinct keys never share a file.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    base_dir: PathBuf,
    suffix: String,
}

impl FilesystemStorage {
    /// Open (and create if needed) a store rooted at `base_dir`.
    ///
    /// # Postconditions
    /// - `base_dir` exists; on Unix it is only accessible by the owner
    ///
    /// # Errors
    /// - `Storage` if the directory cannot be created
    pub fn new(base_dir: impl AsRef<Path>, suffix: impl Into<String>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        // Sync for constructor
        if !base_dir.exists() {
            std::fs::create_dir_all(&base_dir)
                .map_err(|e| storage_error("create", &base_dir, e))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&base_dir, std::fs::Permissions::from_mode(0o700))
                    .map_err(|e| storage_error("restrict", &base_dir, e))?;
            }
        }

        Ok(Self {
            base_dir,
            suffix: suffix.into(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a key to its file.
    ///
    /// # Errors
    /// - `InvalidInput` if `key` is empty, `.`/`..`, contains a path
    ///   separator or NUL, or ends like an in-flight write
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let plain = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(&['/', '\\', '\0'][..])
            && !key.ends_with(PARTIAL_SUFFIX);
        if !plain {
            return Err(Error::InvalidInput(format!("Invalid storage key: {:?}", key)));
        }

        Ok(self.base_dir.join(format!("{}{}", key, self.suffix)))
    }

    async fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await?;
        file.write_all(data).await?;
        file.sync_all().await
    }
}

#[async_trait]
impl BlobStorage for FilesystemStorage {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn save(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        let mut partial = path.clone().into_os_string();
        partial.push(PARTIAL_SUFFIX);
        let partial = PathBuf::from(partial);

        // Write then rename so a crash never leaves a truncated blob behind
        Self::write_private(&partial, &data)
            .await
            .map_err(|e| storage_error("write", &partial, e))?;
        fs::rename(&partial, &path)
            .await
            .map_err(|e| storage_error("rename", &path, e))?;

        debug!(key = %key, bytes = data.len(), "Saved blob");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", &path, e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("delete", &path, e)),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| storage_error("list", &self.base_dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error("list", &self.base_dir, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| storage_error("stat", &entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(key) = name.strip_suffix(self.suffix.as_str()) {
                if !key.is_empty() {
                    keys.push(key.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}
