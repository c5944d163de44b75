//! Offline photo model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A unique identifier for a captured photo, using UUID v7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhotoId(Uuid);

impl PhotoId {
    /// Create a new unique photo ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID.
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for PhotoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PhotoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A photo captured while offline, waiting for upload.
///
/// Uploaded photos are flagged `synced` and kept, unlike queued mutations
/// which are deleted once applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsyncedPhoto {
    /// Unique photo identifier.
    pub id: PhotoId,
    /// Inspection the photo belongs to.
    pub inspection_id: String,
    /// Free-form caption.
    pub caption: String,
    /// Report category (e.g. "attic", "hvac").
    pub category: String,
    /// Original file name.
    pub file_name: String,
    /// Content MIME type.
    pub mime_type: String,
    /// Raw image bytes.
    #[serde(skip)]
    pub content: Vec<u8>,
    /// Whether the photo has been uploaded.
    pub synced: bool,
    /// Capture timestamp (Unix ms).
    pub created_at: i64,
}

impl UnsyncedPhoto {
    /// Create a new photo record awaiting upload.
    pub fn new(
        inspection_id: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Result<Self> {
        let inspection_id = inspection_id.into().trim().to_string();
        let file_name = file_name.into().trim().to_string();
        let mime_type = mime_type.into().trim().to_string();

        if inspection_id.is_empty() {
            return Err(Error::InvalidInput(
                "Photo inspection_id cannot be empty".to_string(),
            ));
        }
        if file_name.is_empty() {
            return Err(Error::InvalidInput(
                "Photo file_name cannot be empty".to_string(),
            ));
        }
        if mime_type.is_empty() {
            return Err(Error::InvalidInput(
                "Photo mime_type cannot be empty".to_string(),
            ));
        }
        if content.is_empty() {
            return Err(Error::InvalidInput(
                "Photo content cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id: PhotoId::new(),
            inspection_id,
            caption: String::new(),
            category: String::new(),
            file_name,
            mime_type,
            content,
            synced: false,
            created_at: crate::util::unix_timestamp_millis(),
        })
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into().trim().to_string();
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into().trim().to_string();
        self
    }

    /// Size of the stored content in bytes.
    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }
}

/// Guess a MIME type for common photo extensions.
pub fn photo_mime_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "heic" => "image/heic",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
