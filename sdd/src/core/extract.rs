//! Extraction of file artifacts from oracle response text.
//!
//! The wire format is a fenced block carrying a language tag and an optional
//! file path:
//!
//! ````text
//! ```ts:src/app.ts
//! export const x = 1;
//! ```
//! ````
//!
//! Extraction is a pure function of the response text. Bodies are matched
//! lazily up to the next triple fence, so a fence nested inside a body ends
//! the block early. That is the observable behavior of the grammar and is
//! kept as-is.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::PipelineError;

/// `<fence><language>:<path>\n<body><fence>`
static EXPLICIT_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(\w+):([^\n]+)\n([\s\S]*?)```").unwrap());

/// `<fence><language>\n<body><fence>`
static ANONYMOUS_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(\w+)\n([\s\S]*?)```").unwrap());

/// Any fence, language optional. Used by the single-file fallback.
static ANY_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```[^\n`]*\n([\s\S]*?)```").unwrap());

static JSON_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").unwrap());

/// Ordered `path -> content` mapping produced by one extraction pass.
pub type ArtifactMap = IndexMap<String, String>;

/// Extract every fenced code block from `response`.
///
/// 1. Explicit blocks (```` ```lang:path ````) are keyed by their path. When a
///    path repeats, the last body wins; the key keeps its first position.
/// 2. Anonymous blocks (```` ```lang ````) whose body is not already present
///    as a value are keyed `code-block-<n>.<lang>`, with `n` counting accepted
///    anonymous blocks from zero.
///
/// A response without fences yields an empty map.
pub fn extract_code_blocks(response: &str) -> ArtifactMap {
    let mut blocks = ArtifactMap::new();

    for caps in EXPLICIT_BLOCK_RE.captures_iter(response) {
        let path = caps[2].trim().to_string();
        let body = caps[3].to_string();
        blocks.insert(path, body);
    }

    let mut anonymous_index = 0usize;
    for caps in ANONYMOUS_BLOCK_RE.captures_iter(response) {
        let language = &caps[1];
        let body = &caps[2];
        if blocks.values().any(|existing| existing == body) {
            continue;
        }
        blocks.insert(
            format!("code-block-{anonymous_index}.{language}"),
            body.to_string(),
        );
        anonymous_index += 1;
    }

    blocks
}

/// Interpret `response` as the new content of a single file.
///
/// Preference order: an explicit block for `target_path`, the first fenced
/// block of any kind, then the whole response verbatim. Returns `None` when
/// the response is blank.
pub fn extract_single_file(response: &str, target_path: &str) -> Option<String> {
    let explicit = extract_code_blocks(response);
    if let Some(body) = explicit.get(target_path.trim()) {
        return Some(body.clone());
    }
    if let Some(caps) = ANY_BLOCK_RE.captures(response) {
        return Some(caps[1].to_string());
    }
    if response.trim().is_empty() {
        return None;
    }
    Some(response.to_string())
}

/// Parse the single JSON payload of a structured response.
///
/// Uses the first ```` ```json ```` block when present, otherwise the whole
/// response.
pub fn extract_json<T: DeserializeOwned>(response: &str) -> Result<T, PipelineError> {
    let payload = json_payload(response);
    serde_json::from_str(payload)
        .map_err(|err| PipelineError::Extraction(format!("parse json payload: {err}")))
}

fn json_payload(response: &str) -> &str {
    match JSON_BLOCK_RE.captures(response) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or_default(),
        None => response.trim(),
    }
}
