//! Structured-output extraction
//!
//! Responders are asked for a single JSON object, but models wrap it in
//! markdown fences or surrounding prose often enough that a plain
//! `serde_json::from_str` is not reliable.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Matches a fenced code block, optionally tagged as json.
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

/// Parse a typed value out of model text.
///
/// Tries, in order: the content of the first code fence, the whole trimmed
/// text, and the outermost `{...}` span. Anything else is [`Error::Malformed`].
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let candidate = match FENCE.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.trim().to_string(),
    };

    match serde_json::from_str(&candidate) {
        Ok(value) => Ok(value),
        Err(direct_err) => {
            let start = candidate.find('{');
            let end = candidate.rfind('}');
            if let (Some(start), Some(end)) = (start, end) {
                if end > start {
                    return serde_json::from_str(&candidate[start..=end])
                        .map_err(|e| Error::Malformed(e.to_string()));
                }
            }
            Err(Error::Malformed(direct_err.to_string()))
        }
    }
}
