//! Classification of `/history/{prompt_id}` responses.

use serde_json::Value;

use crate::api::ComfyUIApiError;

/// Outcome of a single history poll.
#[derive(Debug)]
pub enum HistoryPoll {
    /// The prompt is not in history yet, or has produced no outputs.
    Pending,
    /// The prompt finished; holds its `outputs` mapping (node id -> output).
    Complete(Value),
    /// History could not be fetched or decoded.
    Unavailable(ComfyUIApiError),
}

/// Interpret a history document for `prompt_id`.
///
/// ComfyUI returns `{}` until the prompt finishes, then
/// `{prompt_id: {"outputs": {...}, "status": {...}}}`. Missing, null, or
/// empty `outputs` all count as pending.
pub fn interpret_history(prompt_id: &str, mut history: Value) -> HistoryPoll {
    let outputs = history
        .get_mut(prompt_id)
        .and_then(|entry| entry.get_mut("outputs"))
        .map(Value::take);

    match outputs {
        Some(outputs) if has_content(&outputs) => HistoryPoll::Complete(outputs),
        _ => HistoryPoll::Pending,
    }
}

fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
