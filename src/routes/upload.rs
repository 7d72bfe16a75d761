use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::upload::{extension_for_mime, inspect_image, sanitize_folder, DEFAULT_FOLDER};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub public_id: String,
    pub size: usize,
    pub mime_type: String,
}

/// POST /api/upload
/// Multipart with a `file` field and an optional `folder` text field.
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadResponse>)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut folder = DEFAULT_FOLDER.to_string();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Multipart error: {}", e);
        AppError::validation("Invalid multipart data")
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("folder") => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::validation("Invalid folder field"))?;
                folder = sanitize_folder(&text);
            }
            Some("file") | None => {
                let original_name = field.file_name().unwrap_or("unknown").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    tracing::error!("Failed to read upload bytes: {}", e);
                    AppError::validation("Failed to read file data")
                })?;
                file = Some((original_name, bytes.to_vec()));
            }
            Some(_) => {}
        }
    }

    let (original_name, bytes) = file.ok_or_else(|| AppError::validation("No file provided"))?;
    let mime_type = inspect_image(&original_name, &bytes)?;

    // Provider-side names never reuse the client's filename.
    let filename = format!("{}.{}", Uuid::new_v4(), extension_for_mime(mime_type));
    let size = bytes.len();
    let blob = state.uploader.upload(bytes, &filename, &folder).await?;

    tracing::info!(
        user_id = %user.user_id,
        public_id = %blob.public_id,
        "Image uploaded ({} bytes)",
        size
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: blob.url,
            public_id: blob.public_id,
            size,
            mime_type: mime_type.to_string(),
        }),
    ))
}
