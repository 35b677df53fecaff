//! File-sync source: copy recognized files from a remote folder into the
//! local working directory before enumeration.
//!
//! The folder locator is resolved through `object_store`, so `file://`,
//! `s3://` and `http(s)://` (WebDAV) folders all work. A locator without a
//! scheme is treated as a local path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::TryStreamExt;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use salesflow_core::config::SourceConfig;
use salesflow_core::FileFormat;
use tracing::info;
use url::Url;

use crate::error::SourceError;

/// A remote (or mounted) folder that can be mirrored locally.
pub struct FolderSource {
    store: Arc<dyn ObjectStore>,
    prefix: Option<ObjectPath>,
    locator: String,
}

impl FolderSource {
    /// Resolve a folder locator into an object store and key prefix.
    pub fn from_locator(locator: &str) -> Result<Self, SourceError> {
        let (store, prefix): (Arc<dyn ObjectStore>, Option<ObjectPath>) =
            match Url::parse(locator) {
                Ok(url) if url.scheme() != "file" && url.scheme().len() > 1 => {
                    let (store, path) = object_store::parse_url(&url)?;
                    let prefix = (!path.as_ref().is_empty()).then_some(path);
                    (Arc::from(store), prefix)
                }
                Ok(url) if url.scheme() == "file" => {
                    let dir = url
                        .to_file_path()
                        .map_err(|_| SourceError::InvalidLocator(locator.to_string()))?;
                    (local_store(&dir)?, None)
                }
                // No scheme (or a Windows drive letter): a plain directory.
                _ => (local_store(Path::new(locator))?, None),
            };

        info!(locator, "folder source resolved");
        Ok(Self {
            store,
            prefix,
            locator: locator.to_string(),
        })
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Download every object with a recognized extension into
    /// `local_directory`, flattening keys to their base name. Creates the
    /// directory if needed. Returns the written paths in listing order.
    pub async fn sync(&self, local_directory: &Path) -> Result<Vec<PathBuf>, SourceError> {
        tokio::fs::create_dir_all(local_directory).await?;

        let mut objects = Vec::new();
        let mut listing = self.store.list(self.prefix.as_ref());
        while let Some(meta) = listing.try_next().await? {
            let Some(name) = meta.location.filename().map(str::to_string) else {
                continue;
            };
            if FileFormat::from_path(Path::new(&name)).is_some() {
                objects.push((meta.location, name));
            }
        }
        objects.sort_by(|a, b| a.0.cmp(&b.0));

        let mut written = Vec::with_capacity(objects.len());
        for (location, name) in objects {
            let bytes = self.store.get(&location).await?.bytes().await?;
            let target = local_directory.join(&name);
            tokio::fs::write(&target, &bytes).await?;
            info!(object = %location, bytes = bytes.len(), "downloaded");
            written.push(target);
        }

        info!(
            locator = %self.locator,
            files = written.len(),
            dir = %local_directory.display(),
            "folder sync complete"
        );
        Ok(written)
    }
}

fn local_store(dir: &Path) -> Result<Arc<dyn ObjectStore>, SourceError> {
    let canonical = std::fs::canonicalize(dir)?;
    let store = LocalFileSystem::new_with_prefix(&canonical)?;
    Ok(Arc::new(store))
}

/// Sync the configured folder, or do nothing when no locator is set.
pub async fn sync_configured(config: &SourceConfig) -> Result<Vec<PathBuf>, SourceError> {
    match config.folder_locator.as_deref() {
        Some(locator) => {
            let source = FolderSource::from_locator(locator)?;
            info!(
                locator = source.locator(),
                dir = %config.local_directory.display(),
                "syncing folder"
            );
            source.sync(&config.local_directory).await
        }
        None => {
            info!("no folder locator configured, skipping sync");
            Ok(Vec::new())
        }
    }
}
