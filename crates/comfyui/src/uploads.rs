//! Stage job input images on the ComfyUI server.

use base64::Engine as _;
use vidshim_core::types::{ImageInput, UploadResult, UploadStatus};

use crate::api::ComfyUIApi;

/// Decode and upload every image, one at a time, in input order.
///
/// Each image contributes exactly one entry to `details`, either a
/// success or an error message. A single failure marks the whole batch
/// as [`UploadStatus::Error`]; the remaining images are still attempted.
pub async fn upload_images(api: &ComfyUIApi, images: Option<&[ImageInput]>) -> UploadResult {
    let images = match images {
        Some(images) if !images.is_empty() => images,
        _ => {
            return UploadResult {
                status: UploadStatus::Success,
                message: "No images to upload".to_string(),
                details: Vec::new(),
            };
        }
    };

    let mut details = Vec::with_capacity(images.len());
    let mut failed = 0usize;

    for image in images {
        match upload_one(api, image).await {
            Ok(()) => {
                tracing::debug!(name = %image.name, "Uploaded input image");
                details.push(format!("Successfully uploaded {}", image.name));
            }
            Err(reason) => {
                tracing::warn!(name = %image.name, error = %reason, "Image upload failed");
                failed += 1;
                details.push(format!("Error uploading {}: {reason}", image.name));
            }
        }
    }

    tracing::info!(total = images.len(), failed, "Image uploads finished");

    UploadResult {
        status: if failed > 0 {
            UploadStatus::Error
        } else {
            UploadStatus::Success
        },
        message: "Upload result".to_string(),
        details,
    }
}

async fn upload_one(api: &ComfyUIApi, image: &ImageInput) -> Result<(), String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image.image.trim())
        .map_err(|e| format!("invalid base64 data: {e}"))?;

    api.upload_image(&image.name, bytes)
        .await
        .map_err(|e| match e {
            crate::api::ComfyUIApiError::ApiError { body, .. } => body,
            other => other.to_string(),
        })
}
