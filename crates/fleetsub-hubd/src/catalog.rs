//! Object-bucket catalog loading
//!
//! Fills an in-memory object store from a directory tree: every
//! subdirectory becomes a bucket and every regular file in it an object
//! named after the file.

use crate::error::DaemonResult;
use fleetsub_store::{InMemoryObjectStore, ObjectStore};
use std::path::Path;
use tracing::{debug, info};

/// Object store holding the buckets found under `dir`
pub async fn load_buckets(dir: &Path) -> DaemonResult<InMemoryObjectStore> {
    let store = InMemoryObjectStore::new();
    let mut buckets = 0usize;
    let mut objects = 0usize;

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let bucket = entry.file_name().to_string_lossy().into_owned();
        store.create(&bucket).await?;
        buckets += 1;

        let mut files = tokio::fs::read_dir(entry.path()).await?;
        while let Some(file) = files.next_entry().await? {
            if !file.file_type().await?.is_file() {
                continue;
            }
            let name = file.file_name().to_string_lossy().into_owned();
            let content = tokio::fs::read(file.path()).await?;
            debug!(bucket = %bucket, object = %name, bytes = content.len(), "Loaded catalog object");
            store.put(&bucket, &name, content).await?;
            objects += 1;
        }
    }

    info!(dir = %dir.display(), buckets, objects, "Loaded bucket catalog");
    Ok(store)
}
