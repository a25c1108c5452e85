//! Locate the video a finished workflow wrote and encode it for the runtime.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use serde_json::Value;
use vidshim_core::types::JobResult;

/// Returned when no node output references a video file on disk.
pub const NO_VIDEO_OUTPUT_MESSAGE: &str =
    "No video output found. Ensure your workflow ends with a SaveVideo node.";

/// Return the first video referenced by `outputs` that exists under
/// `output_root`, base64-encoded in a success result.
///
/// Nodes are scanned in the order ComfyUI listed them and only the first existing file is
/// returned. Reads the filesystem but never mutates it, so repeated calls
/// yield the same result.
pub async fn extract_video_output(outputs: &Value, output_root: &Path) -> JobResult {
    for path in video_candidates(outputs, output_root) {
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(path = %path.display(), "Referenced video not on disk");
                continue;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot stat video output");
                continue;
            }
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::info!(
                    path = %path.display(),
                    size_bytes = bytes.len(),
                    "Returning video output",
                );
                let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                return JobResult::success(encoded);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read video output");
            }
        }
    }

    JobResult::failed(NO_VIDEO_OUTPUT_MESSAGE)
}

/// Paths of every video entry across all node outputs, in scan order.
fn video_candidates(outputs: &Value, output_root: &Path) -> Vec<PathBuf> {
    let Some(nodes) = outputs.as_object() else {
        return Vec::new();
    };

    nodes
        .values()
        .filter_map(|node| node.get("videos").and_then(Value::as_array))
        .flatten()
        .filter_map(|video| {
            let filename = video.get("filename").and_then(Value::as_str)?;
            let subfolder = video
                .get("subfolder")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(output_root.join(subfolder).join(filename))
        })
        .collect()
}
