//! Provider reply normalization.

use serde_json::Value;

/// Extract plain text from a provider reply.
///
/// Accepted shapes, checked in order:
///
/// - a plain string
/// - an object with a string `text` field
/// - an object with `content` holding a string or an array of blocks
/// - an object with OpenAI-style `choices[0].message.content`
/// - an array of blocks
///
/// Within a block array the first textual block wins: a bare string, a block
/// with `"type": "text"`, or an untyped object with a `text` field. Blocks of
/// other types (`tool_use`, `thinking`, ...) are skipped. Blank text counts as
/// absent, so `None` means the reply is unusable.
pub fn extract_text(reply: &Value) -> Option<String> {
    match reply {
        Value::String(s) => non_blank(s),
        Value::Array(blocks) => first_text_block(blocks),
        Value::Object(map) => {
            if let Some(Value::String(text)) = map.get("text") {
                return non_blank(text);
            }

            match map.get("content") {
                Some(Value::String(text)) => return non_blank(text),
                Some(Value::Array(blocks)) => return first_text_block(blocks),
                _ => {}
            }

            map.get("choices")
                .and_then(|choices| choices.get(0))
                .and_then(|choice| choice.get("message"))
                .and_then(|message| message.get("content"))
                .and_then(Value::as_str)
                .and_then(non_blank)
        }
        _ => None,
    }
}

fn first_text_block(blocks: &[Value]) -> Option<String> {
    blocks.iter().find_map(|block| match block {
        Value::String(s) => non_blank(s),
        Value::Object(map) => {
            let is_text = match map.get("type").and_then(Value::as_str) {
                Some(kind) => kind == "text",
                None => true,
            };
            if !is_text {
                return None;
            }
            map.get("text").and_then(Value::as_str).and_then(non_blank)
        }
        _ => None,
    })
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
