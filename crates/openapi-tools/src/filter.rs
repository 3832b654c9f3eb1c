//! Selecting which converted tools are exposed.

use crate::config::FilterConfig;
use crate::convert::ConvertedTools;
use crate::document::OpenApiDocument;
use crate::error::Result;
use api_mcp_http_tools::HttpMethod;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Apply `config` to `converted`, pruning the operation map and id mappings to match.
///
/// Operations may be named by their original operation id or by their tool name. Tag membership
/// is read from the raw document, so operations that were renamed (or skipped) do not confuse it.
/// `server_name` qualifies tool names for the `max_tool_name_length` check.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::Config`](crate::OpenApiToolsError::Config) when `config` is
/// contradictory.
pub fn filter_tools(
    converted: ConvertedTools,
    document: &OpenApiDocument,
    config: &FilterConfig,
    server_name: &str,
) -> Result<ConvertedTools> {
    config.validate()?;
    if !config.is_active() {
        return Ok(converted);
    }

    let universe: HashSet<&str> = converted.tool_names().collect();

    // original operation id (or tool name) -> tool names
    let mut by_identifier: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, entry) in &converted.operation_map {
        by_identifier.entry(name).or_default().push(name);
        if entry.original_operation_id != *name {
            by_identifier
                .entry(&entry.original_operation_id)
                .or_default()
                .push(name);
        }
    }
    let resolve = |ids: &[String]| {
        ids.iter()
            .filter_map(|id| by_identifier.get(id.as_str()))
            .flatten()
            .copied()
            .collect::<HashSet<&str>>()
    };

    let operations_by_tag = operations_by_tag(document);
    let tagged = |tags: &[String]| {
        let ids: Vec<String> = tags
            .iter()
            .filter_map(|t| operations_by_tag.get(t.as_str()))
            .flatten()
            .cloned()
            .collect();
        resolve(&ids)
    };

    let mut include: HashSet<&str> = HashSet::new();
    let mut axis_active = false;

    if let Some(ops) = &config.include_operations {
        axis_active = true;
        include.extend(resolve(ops));
    } else if let Some(ops) = &config.exclude_operations {
        axis_active = true;
        let excluded = resolve(ops);
        include.extend(universe.difference(&excluded));
    }

    if let Some(tags) = &config.include_tags {
        axis_active = true;
        include.extend(tagged(tags));
    } else if let Some(tags) = &config.exclude_tags {
        axis_active = true;
        let excluded = tagged(tags);
        include.extend(universe.difference(&excluded));
    }

    if !axis_active {
        include.clone_from(&universe);
    }

    if config.only_get_endpoints {
        include.retain(|name| {
            converted
                .operation_map
                .get(*name)
                .is_some_and(|e| e.method == HttpMethod::Get)
        });
    }

    if let Some(max) = config.max_tool_name_length {
        let too_long: Vec<&str> = include
            .iter()
            .copied()
            .filter(|name| format!("{server_name}_{name}").chars().count() > max)
            .collect();
        if !too_long.is_empty() {
            let mut dropped: Vec<&str> = too_long
                .iter()
                .map(|name| {
                    converted
                        .operation_map
                        .get(*name)
                        .map_or(*name, |e| e.original_operation_id.as_str())
                })
                .collect();
            dropped.sort_unstable();
            tracing::warn!(
                "Dropping {} tool(s) whose server-qualified name exceeds {} characters: {}",
                dropped.len(),
                max,
                dropped.join(", ")
            );
            for name in too_long {
                include.remove(name);
            }
        }
    }

    let keep: HashSet<String> = include.into_iter().map(str::to_string).collect();
    let ConvertedTools {
        tools,
        mut operation_map,
        mut operation_id_mappings,
    } = converted;

    let tools: Vec<_> = tools
        .into_iter()
        .filter(|t| keep.contains(t.name.as_ref()))
        .collect();
    operation_map.retain(|name, _| keep.contains(name));
    operation_id_mappings.retain(|name, _| keep.contains(name));

    tracing::debug!(retained = tools.len(), "Filtered tools");
    Ok(ConvertedTools {
        tools,
        operation_map,
        operation_id_mappings,
    })
}

/// Tag -> original operation ids, over every supported operation in the document.
fn operations_by_tag(document: &OpenApiDocument) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for path_item in document.paths().into_iter().flat_map(|p| p.values()) {
        let Some(path_item) = path_item.as_object() else {
            continue;
        };
        for (method, operation) in path_item {
            if HttpMethod::parse(method).is_err() {
                continue;
            }
            let Some(operation_id) = operation.get("operationId").and_then(Value::as_str) else {
                continue;
            };
            let tags = operation.get("tags").and_then(Value::as_array);
            for tag in tags.into_iter().flatten().filter_map(Value::as_str) {
                out.entry(tag.to_string())
                    .or_default()
                    .push(operation_id.to_string());
            }
        }
    }
    out
}
