//! In-process object storage for tests and offline use.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ObjectStorage, UploadProgress};
use crate::models::ImageFile;
use crate::{Error, Result};

const DEFAULT_BUCKET: &str = "memory";

#[derive(Debug, Default)]
struct Objects {
    stored: HashMap<String, ImageFile>,
    failing: HashSet<String>,
}

/// Stores uploads in a map and hands back `memory://{bucket}/{key}` URLs.
#[derive(Debug)]
pub struct MemoryObjectStorage {
    bucket: String,
    objects: Mutex<Objects>,
}

impl Default for MemoryObjectStorage {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET)
    }
}

impl MemoryObjectStorage {
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(Objects::default()),
        }
    }

    /// Make uploads of files named `file_name` fail.
    pub async fn fail_uploads_of(&self, file_name: impl Into<String>) {
        self.objects.lock().await.failing.insert(file_name.into());
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.stored.len()
    }

    /// Keys of every stored object, sorted.
    pub async fn object_keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().await.stored.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn object(&self, object_key: &str) -> Option<ImageFile> {
        self.objects.lock().await.stored.get(object_key).cloned()
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        object_key: &str,
        file: &ImageFile,
        progress: &(dyn Fn(UploadProgress) + Send + Sync),
    ) -> Result<String> {
        let mut objects = self.objects.lock().await;
        if objects.failing.contains(&file.name) {
            return Err(Error::Storage(format!(
                "upload of {} was refused",
                file.name
            )));
        }

        let total = file.size_bytes() as u64;
        progress(UploadProgress {
            file_name: file.name.clone(),
            bytes_transferred: total,
            total_bytes: total,
        });

        objects.stored.insert(object_key.to_string(), file.clone());
        Ok(format!("memory://{}/{object_key}", self.bucket))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    fn image(name: &str) -> ImageFile {
        ImageFile::new(name, "image/png", vec![7; 32]).unwrap()
    }

    #[tokio::test]
    async fn upload_stores_object_and_reports_progress() {
        let storage = MemoryObjectStorage::new("house.appspot.com");
        let reported = AtomicU64::new(0);

        let url = storage
            .upload("images/u-a.png-1", &image("a.png"), &|update| {
                reported.store(update.bytes_transferred, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert_eq!(url, "memory://house.appspot.com/images/u-a.png-1");
        assert_eq!(reported.load(Ordering::SeqCst), 32);
        assert_eq!(storage.object_keys().await, vec!["images/u-a.png-1"]);
        assert_eq!(storage.object("images/u-a.png-1").await, Some(image("a.png")));
    }

    #[tokio::test]
    async fn failing_file_is_not_stored() {
        let storage = MemoryObjectStorage::default();
        storage.fail_uploads_of("broken.png").await;

        let result = storage
            .upload("images/u-broken.png-1", &image("broken.png"), &|_| {})
            .await;
        assert!(matches!(result, Err(Error::Storage(_))));
        assert_eq!(storage.object_count().await, 0);
    }
}
