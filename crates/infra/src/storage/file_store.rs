//! Filesystem token store
//!
//! One pretty-printed JSON file per tenant at `{dir}/{member_id}.json`.
//!
//! ## Write path
//! 1. Serialize the record
//! 2. Write it to a uniquely named temp file in the same directory
//! 3. `fsync` the temp file
//! 4. Rename over the target
//!
//! Rename within one directory is atomic, so readers see the old file or
//! the new one. Unique temp names keep concurrent saves apart.
//!
//! On Unix the directory is `0700` and record files are `0600`.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use portal_auth_core::TokenStore;
use portal_auth_domain::constants::TOKEN_FILE_EXTENSION;
use portal_auth_domain::{
    MemberId, MemberIdPolicy, PortalAuthError, Result, StorageConfig, TokenRecord,
};
use tempfile::NamedTempFile;

use crate::errors::InfraError;

/// [`TokenStore`] backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
    policy: MemberIdPolicy,
}

impl FileTokenStore {
    /// Open (creating if needed) the token directory named by `config`.
    ///
    /// # Errors
    /// Returns `StorageFailure` if the directory cannot be created or
    /// restricted.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        Self::new(&config.token_dir, config.member_id_policy)
    }

    /// # Errors
    /// Returns `StorageFailure` if the directory cannot be created or
    /// restricted.
    pub fn new(dir: impl Into<PathBuf>, policy: MemberIdPolicy) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(InfraError::from)?;
        restrict(&dir, 0o700)?;
        tracing::debug!(path = %dir.display(), policy = %policy, "token_store.opened");
        Ok(Self { dir, policy })
    }

    /// Directory holding the record files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds (or would hold) the tenant's record.
    ///
    /// # Errors
    /// Returns `InvalidMemberId` if the identifier is unusable under the
    /// configured policy.
    pub fn path_for(&self, member_id: &str) -> Result<PathBuf> {
        let member = MemberId::parse(member_id, self.policy)?;
        Ok(self.dir.join(format!("{member}.{TOKEN_FILE_EXTENSION}")))
    }

    /// Tenants with a record file, sorted. Unreadable entries are skipped.
    ///
    /// # Errors
    /// Returns `StorageFailure` if the directory cannot be listed.
    pub async fn member_ids(&self) -> Result<Vec<String>> {
        let dir = self.dir.clone();
        blocking(move || {
            let mut ids = Vec::new();
            for entry in fs::read_dir(&dir).map_err(InfraError::from)? {
                let path = match entry {
                    Ok(entry) => entry.path(),
                    Err(err) => {
                        tracing::warn!(error = %err, "token_store.list_entry_failed");
                        continue;
                    }
                };
                if path.extension().and_then(|ext| ext.to_str()) != Some(TOKEN_FILE_EXTENSION) {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    ids.push(stem.to_string());
                }
            }
            ids.sort();
            Ok(ids)
        })
        .await
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn save(&self, member_id: &str, record: &TokenRecord) -> Result<()> {
        let target = self.path_for(member_id)?;
        record.validate()?;
        let bytes = serde_json::to_vec_pretty(record).map_err(InfraError::from)?;

        let dir = self.dir.clone();
        let path = target.clone();
        blocking(move || write_atomic(&dir, &path, &bytes)).await?;

        tracing::debug!(member_id, path = %target.display(), "token_store.saved");
        Ok(())
    }

    async fn load_strict(&self, member_id: &str) -> Result<Option<TokenRecord>> {
        let path = self.path_for(member_id)?;
        let key = member_id.to_string();

        blocking(move || {
            let contents = match fs::read(&path) {
                Ok(contents) => contents,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(InfraError::from(err).into()),
            };

            // Raw bytes: a non-UTF-8 file is a bad record, not a storage fault.
            let record: TokenRecord = serde_json::from_slice(&contents).map_err(|err| {
                PortalAuthError::MalformedRecord { member_id: key.clone(), reason: err.to_string() }
            })?;
            record.validate()?;
            Ok(Some(record))
        })
        .await
    }

    async fn delete(&self, member_id: &str) -> Result<()> {
        let path = self.path_for(member_id)?;
        let removed = blocking(move || match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(InfraError::from(err).into()),
        })
        .await?;

        tracing::debug!(member_id, removed, "token_store.deleted");
        Ok(())
    }
}

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(InfraError::from)?
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp = NamedTempFile::new_in(dir).map_err(InfraError::from)?;
    temp.write_all(bytes).map_err(InfraError::from)?;
    temp.as_file().sync_all().map_err(InfraError::from)?;
    restrict(temp.path(), 0o600)?;
    temp.persist(target).map_err(InfraError::from)?;
    sync_dir(dir);
    Ok(())
}

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(InfraError::from)?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Persist the rename itself. Best effort: not every platform allows
/// opening a directory.
fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    if let Err(err) = fs::File::open(dir).and_then(|handle| handle.sync_all()) {
        tracing::debug!(error = %err, path = %dir.display(), "token_store.dir_sync_failed");
    }
    #[cfg(not(unix))]
    let _ = dir;
}
