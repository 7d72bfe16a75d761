/**
 * Blob Upload
 * Image validation and hosted storage for portfolio media
 */
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5MB
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];
pub const DEFAULT_FOLDER: &str = "portfolio";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{0}")]
    Rejected(String),
    #[error("Upload request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Upload provider returned {status}")]
    Provider { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedBlob {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait BlobUploader: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, folder: &str)
        -> Result<UploadedBlob, UploadError>;
}

/// Sniff the image type from its leading bytes.
pub fn validate_image_magic_bytes(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Reject anything that is not a small, real image with an allowed
/// extension. Returns the detected MIME type.
pub fn inspect_image(filename: &str, bytes: &[u8]) -> Result<&'static str, UploadError> {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(UploadError::Rejected(
            "Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.".to_string(),
        ));
    }
    if bytes.is_empty() {
        return Err(UploadError::Rejected("Empty file".to_string()));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(UploadError::Rejected(
            "File too large. Maximum size is 5MB.".to_string(),
        ));
    }
    validate_image_magic_bytes(bytes).ok_or_else(|| {
        UploadError::Rejected("File content does not match an allowed image type.".to_string())
    })
}

/// Folder names become part of the public id; keep them path-safe.
pub fn sanitize_folder(folder: &str) -> String {
    let cleaned: String = folder
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'))
        .collect();
    let cleaned = cleaned.trim_matches('/').replace("//", "/");
    if cleaned.is_empty() {
        DEFAULT_FOLDER.to_string()
    } else {
        cleaned
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// Cloudinary
// ============================================================================

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: String,
    public_id: String,
}

pub struct CloudinaryUploader {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryUploader {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.config.cloud_name
        )
    }
}

/// Signature over the alphabetically sorted parameters followed by the secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl BlobUploader for CloudinaryUploader {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        folder: &str,
    ) -> Result<UploadedBlob, UploadError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let folder = sanitize_folder(folder);
        let signature = sign_params(
            &[("folder", folder.clone()), ("timestamp", timestamp.clone())],
            &self.config.api_secret,
        );

        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder)
            .text("signature", signature);

        let response = self.client.post(self.endpoint()).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("Cloudinary upload failed with status {}", status);
            return Err(UploadError::Provider {
                status: status.as_u16(),
            });
        }

        let body: CloudinaryResponse = response.json().await?;
        Ok(UploadedBlob {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }
}

// ============================================================================
// Development fallback
// ============================================================================

/// Used when no upload credentials are configured. Never fails; the same
/// bytes always yield the same blob.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderUploader;

#[async_trait]
impl BlobUploader for PlaceholderUploader {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        _filename: &str,
        folder: &str,
    ) -> Result<UploadedBlob, UploadError> {
        let hash = content_hash(&bytes);
        let short = &hash[..16];
        let public_id = format!("{}/{}", sanitize_folder(folder), short);
        tracing::debug!("Upload credentials missing, returning placeholder {}", public_id);
        Ok(UploadedBlob {
            url: format!("https://picsum.photos/seed/{}/800/600", short),
            public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_magic_bytes() {
        assert_eq!(validate_image_magic_bytes(PNG), Some("image/png"));
        assert_eq!(validate_image_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(validate_image_magic_bytes(b"GIF89a"), Some("image/gif"));
        assert_eq!(validate_image_magic_bytes(b"RIFF\0\0\0\0WEBPVP8"), Some("image/webp"));
        assert_eq!(validate_image_magic_bytes(b"<svg"), None);
        assert_eq!(validate_image_magic_bytes(&[0xFF]), None);
    }

    #[test]
    fn test_inspect_image_rejections() {
        assert!(matches!(inspect_image("a.exe", PNG), Err(UploadError::Rejected(_))));
        assert!(matches!(inspect_image("a.png", &[]), Err(UploadError::Rejected(_))));
        assert!(matches!(inspect_image("a.png", b"not an image"), Err(UploadError::Rejected(_))));
        let huge = vec![0x89; MAX_FILE_SIZE + 1];
        assert!(matches!(inspect_image("a.png", &huge), Err(UploadError::Rejected(_))));
        assert_eq!(inspect_image("photo.PNG", PNG).unwrap(), "image/png");
    }

    #[test]
    fn test_sanitize_folder() {
        assert_eq!(sanitize_folder("portfolio/jane"), "portfolio/jane");
        assert_eq!(sanitize_folder("../etc"), "etc");
        assert_eq!(sanitize_folder("  "), DEFAULT_FOLDER);
        assert_eq!(sanitize_folder("a/../b"), "a/b");
    }

    #[test]
    fn test_signature_sorts_params() {
        let a = sign_params(
            &[("timestamp", "1".to_string()), ("folder", "x".to_string())],
            "secret",
        );
        let b = sign_params(
            &[("folder", "x".to_string()), ("timestamp", "1".to_string())],
            "secret",
        );
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
        assert_ne!(a, sign_params(&[("folder", "x".to_string())], "secret"));
    }

    #[tokio::test]
    async fn test_placeholder_is_deterministic() {
        let uploader = PlaceholderUploader;
        let first = uploader.upload(PNG.to_vec(), "a.png", "portfolio").await.unwrap();
        let second = uploader.upload(PNG.to_vec(), "b.png", "portfolio").await.unwrap();
        assert_eq!(first, second);
        assert!(first.public_id.starts_with("portfolio/"));

        let other = uploader.upload(b"GIF89a".to_vec(), "a.gif", "portfolio").await.unwrap();
        assert_ne!(first.url, other.url);
    }

    #[tokio::test]
    async fn test_placeholder_accepts_empty_input() {
        let blob = PlaceholderUploader.upload(Vec::new(), "", "").await.unwrap();
        assert!(blob.public_id.starts_with(DEFAULT_FOLDER));
    }
}
