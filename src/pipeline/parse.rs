//! Cleanup of generated text before decoding.

use std::sync::LazyLock;

use regex::Regex;

/// An opening fence with optional language tag, or a closing fence.
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("valid fence regex"));

/// Remove every Markdown code-fence marker and trim.
///
/// Generated prose is sometimes wrapped in a fence even when the prompt asks
/// for plain text; the content between markers is kept.
pub fn strip_code_fences(text: &str) -> String {
    FENCE.replace_all(text, "").trim().to_string()
}

/// Extract a JSON object from generated output (handles markdown wrapping
/// and surrounding chatter).
pub fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    // Already a JSON object
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return trimmed.to_string();
    }

    let unfenced = strip_code_fences(trimmed);
    if unfenced.starts_with('{') && unfenced.ends_with('}') {
        return unfenced;
    }

    // Try to find object bounds
    if let (Some(start), Some(end)) = (unfenced.find('{'), unfenced.rfind('}'))
        && end > start
    {
        return unfenced[start..=end].to_string();
    }

    unfenced
}
