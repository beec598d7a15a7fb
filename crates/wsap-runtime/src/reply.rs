//! Decoding free-form model replies into actions
//!
//! A reply is either a JSON object `{"action", "params"|"parameters", "reasoning"}`
//! (possibly wrapped in prose or a code fence) or a bare action name. Nothing is
//! guessed: a name outside the action space is `UnknownAction`, anything else that
//! does not fit is `UnparseableReply`.

use serde_json::Value;
use wsap_core::{Action, ActionSpace, Params, Result, WsapError};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Decode `raw` against the action space it was generated for
pub fn decode_reply(raw: &str, space: &ActionSpace) -> Result<Action> {
    let content = strip_thinking(raw);
    let content = content.trim();
    if content.is_empty() {
        return Err(unparseable("empty reply", raw));
    }

    if content.contains('{') {
        let object = first_json_object(content).ok_or_else(|| unparseable("unbalanced JSON object", raw))?;
        let value: Value = serde_json::from_str(object)
            .map_err(|e| unparseable(&format!("invalid JSON: {}", e), raw))?;
        return action_from_json(value, space, raw);
    }

    let name = bare_name(content);
    if let Some(known) = resolve_name(&name, space) {
        return Ok(Action::new(known));
    }
    if !name.is_empty() && !name.contains(char::is_whitespace) {
        return Err(WsapError::UnknownAction(name));
    }
    Err(unparseable("no action found", raw))
}

fn unparseable(reason: &str, raw: &str) -> WsapError {
    WsapError::UnparseableReply {
        reason: reason.to_string(),
        raw: raw.chars().take(200).collect(),
    }
}

/// Removes reasoning-model `<think>` blocks.
///
/// A dangling close tag means the opening was cut off; everything before it is thinking.
fn strip_thinking(raw: &str) -> String {
    let mut text = raw;
    if let Some(idx) = text.rfind(THINK_CLOSE) {
        if !text[..idx].contains(THINK_OPEN) {
            text = &text[idx + THINK_CLOSE.len()..];
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(THINK_OPEN) {
        out.push_str(&rest[..start]);
        match rest[start..].find(THINK_CLOSE) {
            Some(end) => rest = &rest[start + end + THINK_CLOSE.len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// First balanced `{...}` span, string-literal aware
fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn action_from_json(value: Value, space: &ActionSpace, raw: &str) -> Result<Action> {
    let Value::Object(mut map) = value else {
        return Err(unparseable("reply is not a JSON object", raw));
    };

    let name = match map.remove("action") {
        Some(Value::String(name)) => name,
        Some(_) => return Err(unparseable("'action' is not a string", raw)),
        None => return Err(unparseable("JSON reply missing 'action'", raw)),
    };

    let parameters = match map.remove("params").or_else(|| map.remove("parameters")) {
        None | Some(Value::Null) => Params::new(),
        Some(Value::Object(params)) => params,
        Some(_) => return Err(unparseable("'params' is not an object", raw)),
    };

    let reasoning = match map.remove("reasoning") {
        Some(Value::String(text)) if !text.is_empty() => Some(text),
        _ => None,
    };

    let known = resolve_name(name.trim(), space).ok_or_else(|| WsapError::UnknownAction(name.clone()))?;
    Ok(Action {
        name: known,
        parameters,
        reasoning,
    })
}

// Exact match first, then case-insensitive
fn resolve_name(name: &str, space: &ActionSpace) -> Option<String> {
    if space.contains(name) {
        return Some(name.to_string());
    }
    let lower = name.to_lowercase();
    space
        .action_names()
        .into_iter()
        .find(|candidate| candidate.to_lowercase() == lower)
        .map(str::to_string)
}

fn bare_name(content: &str) -> String {
    content
        .trim_matches(|c: char| matches!(c, '`' | '"' | '\'' | '.' | '!') || c.is_whitespace())
        .to_string()
}
