//! Job input validation.
//!
//! The runtime may hand over the input as a JSON object or as a JSON
//! document encoded in a string. Both are normalised into [`JobInput`].
//! Error messages are returned to the caller verbatim.

use serde_json::Value;

use crate::types::{ImageInput, JobInput};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Please provide input")]
    Missing,

    #[error("Invalid JSON format in input")]
    InvalidJson,

    #[error("Missing 'workflow' parameter")]
    MissingWorkflow,

    #[error("'images' must be a list of objects with 'name' and 'image' keys")]
    InvalidImages,
}

/// Validate and normalise a raw job input.
pub fn validate_input(input: Option<&Value>) -> Result<JobInput, InputError> {
    let parsed;
    let input = match input {
        None | Some(Value::Null) => return Err(InputError::Missing),
        Some(Value::String(raw)) => {
            parsed = serde_json::from_str::<Value>(raw).map_err(|_| InputError::InvalidJson)?;
            &parsed
        }
        Some(other) => other,
    };

    let workflow = match input.get("workflow") {
        None | Some(Value::Null) => return Err(InputError::MissingWorkflow),
        Some(workflow) => workflow.clone(),
    };

    let images = match input.get("images") {
        None | Some(Value::Null) => None,
        Some(images) => Some(parse_images(images)?),
    };

    Ok(JobInput { workflow, images })
}

fn parse_images(value: &Value) -> Result<Vec<ImageInput>, InputError> {
    let entries = value.as_array().ok_or(InputError::InvalidImages)?;
    entries
        .iter()
        .map(|entry| {
            let name = entry.get("name").and_then(Value::as_str);
            let image = entry.get("image").and_then(Value::as_str);
            match (name, image) {
                (Some(name), Some(image)) => Ok(ImageInput {
                    name: name.to_string(),
                    image: image.to_string(),
                }),
                _ => Err(InputError::InvalidImages),
            }
        })
        .collect()
}
