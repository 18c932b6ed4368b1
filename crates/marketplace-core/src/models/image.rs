//! Image file attached to a listing draft before upload.

use std::fmt;

use crate::error::{Error, Result};

/// An image picked by the user, held in memory until submit.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    /// Original file name as picked by the user.
    pub name: String,
    /// Content MIME type.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Create a new image file, validating its metadata.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        let name = name.into().trim().to_string();
        let content_type = content_type.into().trim().to_string();

        if name.is_empty() {
            return Err(Error::InvalidInput(
                "Image file name cannot be empty".to_string(),
            ));
        }
        if !content_type.starts_with("image/") {
            return Err(Error::InvalidInput(format!(
                "Image '{name}' has unsupported content type '{content_type}'"
            )));
        }
        if bytes.is_empty() {
            return Err(Error::InvalidInput(format!("Image '{name}' is empty")));
        }

        Ok(Self {
            name,
            content_type,
            bytes,
        })
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ImageFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}
