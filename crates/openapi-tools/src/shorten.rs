//! Operation-id shortening.
//!
//! Frameworks derive operation ids from `{function}_{path segments}_{method}`, which easily
//! exceeds what MCP clients accept as a tool name. Shortening keeps the function name, the
//! HTTP method and the most specific (rightmost) path segments, then appends a short content
//! hash of the original id so different ids stay distinct.

use sha2::{Digest, Sha256};

const HTTP_METHOD_SUFFIXES: [&str; 7] = ["get", "post", "put", "delete", "patch", "head", "options"];

/// Tokens that mark the start of the path part of a generated id.
const PATH_INDICATORS: [&str; 8] = ["api", "v1", "v2", "v3", "admin", "auth", "public", "private"];

const HASH_LEN: usize = 6;

/// Underscores separating function, path, method and hash.
const SEPARATORS: usize = 3;

/// Width of the function-name ellipsis marker.
const ELLIPSIS: &str = "...";

/// First six hex digits of the SHA-256 of `operation_id`.
#[must_use]
pub fn operation_id_hash(operation_id: &str) -> String {
    let digest = hex::encode(Sha256::digest(operation_id.as_bytes()));
    digest[..HASH_LEN].to_string()
}

/// Shorten `operation_id` to at most `max_length` characters.
///
/// Ids already within the limit are returned unchanged. The result is deterministic and, for any
/// limit that can hold `{f}_{method}_{hash}`, never longer than `max_length`.
#[must_use]
pub fn shorten_operation_id(operation_id: &str, max_length: usize) -> String {
    if operation_id.chars().count() <= max_length {
        return operation_id.to_string();
    }

    let hash = operation_id_hash(operation_id);
    let mut parts: Vec<&str> = operation_id.split('_').collect();

    let method = match parts.last() {
        Some(last) if HTTP_METHOD_SUFFIXES.contains(last) => {
            let method = *last;
            parts.pop();
            method
        }
        _ => "",
    };

    let indicator = parts
        .iter()
        .position(|p| PATH_INDICATORS.contains(&p.to_ascii_lowercase().as_str()));
    let (function_parts, path_segments) = match indicator {
        Some(i) => parts.split_at(i),
        None if parts.is_empty() => (&parts[..], &parts[..]),
        None => parts.split_at(1),
    };

    let function_name = function_parts.join("_");
    let function_len = function_name.chars().count();
    let fixed = function_len + method.len() + HASH_LEN + SEPARATORS;

    if fixed >= max_length {
        let available = max_length.saturating_sub(method.len() + HASH_LEN + SEPARATORS);
        let function_name = truncate_middle(&function_name, available);
        return join_components(&[&function_name, method, &hash]);
    }

    let budget = max_length - fixed;
    let mut selected: Vec<&str> = Vec::new();
    let mut used = 0;
    for segment in path_segments.iter().rev() {
        let cost = segment.chars().count() + usize::from(!selected.is_empty());
        if used + cost > budget {
            break;
        }
        selected.push(*segment);
        used += cost;
    }
    selected.reverse();

    let path_part = selected.join("_");
    join_components(&[&function_name, &path_part, method, &hash])
}

/// Append a numeric disambiguation suffix (`_2`, `_3`, ...) to an already-taken tool name.
///
/// When `max_length` is set, leading characters are dropped so the result still fits and the hash
/// at the end of a shortened name survives.
#[must_use]
pub fn with_collision_suffix(name: &str, attempt: usize, max_length: Option<usize>) -> String {
    let suffix = format!("_{attempt}");
    let len = name.chars().count() + suffix.len();
    let skip = match max_length {
        Some(max) if len > max => len - max,
        _ => 0,
    };
    let head: String = name.chars().skip(skip).collect();
    format!("{head}{suffix}")
}

fn truncate_middle(name: &str, available: usize) -> String {
    if available > 10 {
        let len = name.chars().count();
        let head_len = (available - ELLIPSIS.len()) / 2;
        let tail_len = available - head_len - ELLIPSIS.len();
        let head: String = name.chars().take(head_len).collect();
        let tail: String = name.chars().skip(len.saturating_sub(tail_len)).collect();
        format!("{head}{ELLIPSIS}{tail}")
    } else {
        name.chars().take(available).collect()
    }
}

fn join_components(components: &[&str]) -> String {
    components
        .iter()
        .filter(|c| !c.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}
