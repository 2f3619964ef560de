//! Upload storage. Files are addressed by a `public_id` that encodes the
//! asset kind and the uploading user, so deletes can be authorised without
//! a lookup table.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unsupported upload kind: {0}")]
    UnknownKind(String),

    #[error("File type {content_type} is not allowed for {kind}")]
    UnsupportedType { kind: &'static str, content_type: String },

    #[error("File is too large (max {max_bytes} bytes)")]
    TooLarge { max_bytes: usize },

    #[error("File is empty")]
    Empty,

    #[error("Invalid media id")]
    InvalidId,

    #[error("Media not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotFound => ApiError::not_found("File not found"),
            MediaError::Io(e) => {
                tracing::error!(error = %e, "Media storage failure");
                ApiError::internal_server_error("Server error")
            }
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Avatar,
    Image,
    Document,
}

impl MediaKind {
    pub fn parse(kind: &str) -> Result<Self, MediaError> {
        match kind {
            "avatar" => Ok(MediaKind::Avatar),
            "image" => Ok(MediaKind::Image),
            "document" => Ok(MediaKind::Document),
            other => Err(MediaError::UnknownKind(other.to_string())),
        }
    }

    /// Multipart field name carrying the file, and the `public_id` prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Avatar => "avatar",
            MediaKind::Image => "image",
            MediaKind::Document => "document",
        }
    }

    /// Allowed content types with the extension stored on disk.
    fn allowed_types(&self) -> &'static [(&'static str, &'static str)] {
        const IMAGES: &[(&str, &str)] = &[
            ("image/jpeg", "jpg"),
            ("image/png", "png"),
            ("image/gif", "gif"),
            ("image/webp", "webp"),
        ];
        match self {
            MediaKind::Avatar | MediaKind::Image => IMAGES,
            MediaKind::Document => &[
                ("application/pdf", "pdf"),
                ("application/vnd.ms-powerpoint", "ppt"),
                ("application/vnd.openxmlformats-officedocument.presentationml.presentation", "pptx"),
                ("application/msword", "doc"),
                ("application/vnd.openxmlformats-officedocument.wordprocessingml.document", "docx"),
            ],
        }
    }

    pub fn extension_for(&self, content_type: &str) -> Result<&'static str, MediaError> {
        let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        self.allowed_types()
            .iter()
            .find(|(mime, _)| *mime == essence)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| MediaError::UnsupportedType {
                kind: self.as_str(),
                content_type: content_type.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMedia {
    pub url: String,
    pub public_id: String,
}

/// `<kind>_<owner>_<random>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaId {
    pub kind: MediaKind,
    pub owner: Uuid,
}

impl MediaId {
    pub fn build(kind: MediaKind, owner: Uuid, ext: &str) -> String {
        format!("{}_{}_{}.{}", kind.as_str(), owner.simple(), Uuid::new_v4().simple(), ext)
    }

    pub fn parse(public_id: &str) -> Result<Self, MediaError> {
        let (stem, ext) = public_id.rsplit_once('.').ok_or(MediaError::InvalidId)?;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(MediaError::InvalidId);
        }
        let mut parts = stem.split('_');
        let (Some(kind), Some(owner), Some(random), None) = (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(MediaError::InvalidId);
        };
        let kind = MediaKind::parse(kind).map_err(|_| MediaError::InvalidId)?;
        let owner = Uuid::parse_str(owner).map_err(|_| MediaError::InvalidId)?;
        Uuid::parse_str(random).map_err(|_| MediaError::InvalidId)?;
        Ok(Self { kind, owner })
    }
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn store(
        &self,
        kind: MediaKind,
        owner: Uuid,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredMedia, MediaError>;

    async fn delete(&self, public_id: &str) -> Result<(), MediaError>;
}

/// Writes into a local directory that the router serves under `/uploads`.
pub struct LocalMediaStore {
    root: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl LocalMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn url_for(&self, public_id: &str) -> String {
        format!("{}/uploads/{}", self.public_base_url, public_id)
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn store(
        &self,
        kind: MediaKind,
        owner: Uuid,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StoredMedia, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(MediaError::TooLarge { max_bytes: self.max_bytes });
        }
        let ext = kind.extension_for(content_type)?;
        let public_id = MediaId::build(kind, owner, ext);

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&public_id), bytes).await?;
        info!(public_id = %public_id, size = bytes.len(), "Stored upload");

        Ok(StoredMedia {
            url: self.url_for(&public_id),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        MediaId::parse(public_id)?;
        match tokio::fs::remove_file(self.root.join(public_id)).await {
            Ok(()) => {
                info!(public_id, "Deleted upload");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(MediaError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
