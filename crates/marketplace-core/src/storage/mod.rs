//! Object storage for listing images.

mod firebase;
mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::ImageFile;
use crate::{Error, Result};

pub use firebase::FirebaseStorage;
pub use memory::MemoryObjectStorage;

/// Key prefix for every listing image.
pub const IMAGES_PREFIX: &str = "images";

/// Bytes sent so far for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgress {
    pub file_name: String,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl UploadProgress {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_transferred as f64 / self.total_bytes as f64) * 100.0
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.bytes_transferred >= self.total_bytes
    }
}

/// Upload-by-key storage returning a durable download URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload `file` under `object_key`, reporting progress as chunks land.
    async fn upload(
        &self,
        object_key: &str,
        file: &ImageFile,
        progress: &(dyn Fn(UploadProgress) + Send + Sync),
    ) -> Result<String>;
}

/// Build the storage key for an image: `images/{owner}-{file name}-{uuid}`.
pub fn image_object_key(owner_id: &str, file_name: &str) -> Result<String> {
    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        return Err(Error::InvalidInput(
            "Image owner id cannot be empty".to_string(),
        ));
    }

    // Path separators would escape the images/ namespace.
    let file_name = file_name.trim().replace(['/', '\\'], "-");
    let file_name = if file_name.is_empty() {
        "image".to_string()
    } else {
        file_name
    };

    Ok(format!(
        "{IMAGES_PREFIX}/{owner_id}-{file_name}-{}",
        Uuid::new_v4()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_object_key_embeds_owner_and_name() {
        let key = image_object_key("user-1", "front.jpg").unwrap();
        assert!(key.starts_with("images/user-1-front.jpg-"));
        let token = key.trim_start_matches("images/user-1-front.jpg-");
        assert!(token.parse::<Uuid>().is_ok());
    }

    #[test]
    fn image_object_key_is_unique_per_call() {
        let first = image_object_key("user-1", "a.png").unwrap();
        let second = image_object_key("user-1", "a.png").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn image_object_key_stays_in_namespace() {
        let key = image_object_key("user-1", "../../etc/passwd").unwrap();
        assert_eq!(key.matches('/').count(), 1);
        assert!(image_object_key("  ", "a.png").is_err());
    }

    #[test]
    fn progress_percent() {
        let progress = UploadProgress {
            file_name: "a.png".to_string(),
            bytes_transferred: 50,
            total_bytes: 200,
        };
        assert!((progress.percent() - 25.0).abs() < f64::EPSILON);
        assert!(!progress.is_complete());
    }
}
