//! On-disk storage backend: one file per key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::fs;
use uuid::Uuid;

use super::{Cache, CacheError};
use crate::BoxFuture;

/// A [`Cache`] that keeps each entry in its own file under a root directory.
///
/// File names are the hex SHA-256 of the key, so arbitrary URLs map to safe,
/// fixed-length names. Writes go to a uniquely named temporary file that is
/// renamed into place, so a concurrent `get` sees either the old or the new
/// entry, even when several instances or processes share the directory.
#[derive(Debug)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Creates a cache rooted at `root`. The directory is created on the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.root.join(hex::encode(hasher.finalize()))
    }
}

impl Cache for DiskCache {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Bytes>, CacheError>> {
        Box::pin(async move {
            match fs::read(self.path_for(key)).await {
                Ok(bytes) => Ok(Some(Bytes::from(bytes))),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn set<'a>(&'a self, key: &'a str, value: Bytes) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            fs::create_dir_all(&self.root).await?;
            let path = self.path_for(key);
            let tmp = self.root.join(format!("tmp_{}", Uuid::new_v4()));
            fs::write(&tmp, &value).await?;
            if let Err(e) = fs::rename(&tmp, &path).await {
                fs::remove_file(&tmp).await.ok();
                return Err(e.into());
            }
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            match fs::remove_file(self.path_for(key)).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }
}
