//! `OpenAPI` -> MCP tool conversion.
//!
//! One tool per `(path, method)` operation, in document order. Each tool gets a flat input
//! schema (parameters and top-level request-body properties side by side), an LLM-oriented
//! description with example request/response bodies, and an [`OperationEntry`] describing how to
//! turn a call back into one HTTP request.

use crate::config::ConvertOptions;
use crate::document::OpenApiDocument;
use crate::error::{OpenApiToolsError, Result};
use crate::schema::{
    clean_schema_for_display, collapse_union_schema, generate_example_from_schema,
    get_single_param_type_from_schema, lookup_local_ref, resolve_schema_references,
};
use crate::shorten::{shorten_operation_id, with_collision_suffix};
use api_mcp_http_tools::HttpMethod;
use api_mcp_http_tools::semantics::annotations_for_method;
use rmcp::model::{JsonObject, Tool};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

/// Follow at most this many `$ref` hops when resolving parameters/bodies/responses.
const MAX_REF_HOPS: usize = 8;

/// Where an operation parameter travels in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    fn parse(location: &str) -> Option<Self> {
        match location {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParameter {
    pub name: String,
    pub location: ParamLocation,
    pub required: bool,
}

/// HTTP invocation template for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEntry {
    /// Path template with `{param}` placeholders.
    pub path: String,
    pub method: HttpMethod,
    pub parameters: Vec<OperationParameter>,
    /// The operation id as declared in the document (before shortening).
    pub original_operation_id: String,
    pub tags: Vec<String>,
    /// The request body is not an object: the `body` argument is sent as the whole payload.
    pub raw_body: bool,
}

/// Tool name -> invocation template.
pub type OperationMap = HashMap<String, OperationEntry>;

/// Output of [`convert`].
#[derive(Debug, Clone, Default)]
pub struct ConvertedTools {
    /// Tools in document order.
    pub tools: Vec<Tool>,
    pub operation_map: OperationMap,
    /// Tool name -> original operation id, only for renamed operations.
    pub operation_id_mappings: BTreeMap<String, String>,
}

impl ConvertedTools {
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|t| t.name.as_ref())
    }

    #[must_use]
    pub fn entry(&self, tool_name: &str) -> Option<&OperationEntry> {
        self.operation_map.get(tool_name)
    }
}

struct RawParameter {
    name: String,
    location: ParamLocation,
    required: bool,
    description: Option<String>,
    schema: Value,
}

struct RequestBody {
    schema: Value,
    required: bool,
}

/// Convert every supported operation of `document` into a tool.
///
/// Operations without an `operationId`, with a method other than GET/POST/PUT/DELETE/PATCH, or
/// (optionally) marked deprecated are skipped with a warning; they never fail the batch.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::Config`] if `max_operation_id_length` is zero. Any positive limit
/// is accepted; limits too small for `{method}_{hash}` yield names that keep the hash and may
/// exceed the limit.
pub fn convert(document: &OpenApiDocument, options: &ConvertOptions) -> Result<ConvertedTools> {
    if options.max_operation_id_length == Some(0) {
        return Err(OpenApiToolsError::Config(
            "max_operation_id_length must be greater than zero".to_string(),
        ));
    }

    let doc = document.as_value();
    let mut out = ConvertedTools::default();
    let Some(paths) = document.paths() else {
        tracing::warn!("OpenAPI document has no 'paths'; no tools generated");
        return Ok(out);
    };

    for (path, path_item) in paths {
        let Some(path_item) = resolve_component(path_item, doc).and_then(Value::as_object) else {
            tracing::warn!("Skipping path '{}': path item is not an object", path);
            continue;
        };

        for (key, operation) in path_item {
            if matches!(
                key.as_str(),
                "parameters" | "summary" | "description" | "servers" | "$ref"
            ) {
                continue;
            }
            let Ok(method) = HttpMethod::parse(key) else {
                tracing::warn!(
                    "Skipping {} {}: unsupported HTTP method",
                    key.to_ascii_uppercase(),
                    path
                );
                continue;
            };
            let Some(operation) = operation.as_object() else {
                continue;
            };

            let Some(operation_id) = operation
                .get("operationId")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
            else {
                tracing::warn!("Skipping {} {}: operation has no operationId", method, path);
                continue;
            };

            if options.ignore_deprecated
                && operation.get("deprecated").and_then(Value::as_bool) == Some(true)
            {
                tracing::debug!(operation_id, "Skipping deprecated operation");
                continue;
            }

            let parameters = collect_parameters(path_item, operation, doc, operation_id);
            let body = request_body(operation, doc);
            let (input_schema, raw_body) = build_input_schema(operation_id, &parameters, body.as_ref());
            let description = build_description(operation, path, body.as_ref(), doc, options);

            let name = reserve_tool_name(&out, operation_id, options.max_operation_id_length);
            if name != operation_id {
                out.operation_id_mappings
                    .insert(name.clone(), operation_id.to_string());
            }

            let tags = operation
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let mut tool = Tool::new(name.clone(), description, Arc::new(input_schema));
            tool.annotations = Some(annotations_for_method(method));
            out.tools.push(tool);

            out.operation_map.insert(
                name,
                OperationEntry {
                    path: path.clone(),
                    method,
                    parameters: parameters
                        .iter()
                        .map(|p| OperationParameter {
                            name: p.name.clone(),
                            location: p.location,
                            required: p.required,
                        })
                        .collect(),
                    original_operation_id: operation_id.to_string(),
                    tags,
                    raw_body,
                },
            );
        }
    }

    tracing::debug!(tools = out.tools.len(), "Converted OpenAPI document");
    Ok(out)
}

/// Pick the tool name for `operation_id`, shortening it and disambiguating collisions.
fn reserve_tool_name(out: &ConvertedTools, operation_id: &str, max: Option<usize>) -> String {
    let name = match max {
        Some(max) if operation_id.chars().count() > max => shorten_operation_id(operation_id, max),
        _ => operation_id.to_string(),
    };

    let Some(existing) = out.operation_map.get(&name) else {
        return name;
    };

    if name == operation_id {
        tracing::warn!(
            "Duplicate operation ID '{}' (already used by {} {}); appending a numeric suffix",
            operation_id,
            existing.method,
            existing.path
        );
    } else {
        tracing::warn!(
            "Collision detected! Shortened operation ID '{}' already exists for '{}'. \
             Original operation ID was '{}'. Consider using unique operation IDs or a larger \
             max_operation_id_length.",
            name,
            existing.original_operation_id,
            operation_id
        );
    }

    (2..)
        .map(|attempt| with_collision_suffix(&name, attempt, max))
        .find(|candidate| !out.operation_map.contains_key(candidate))
        .unwrap_or_else(|| name.clone())
}

/// Resolve a (possibly chained) local `$ref` object.
fn resolve_component<'a>(value: &'a Value, doc: &'a Value) -> Option<&'a Value> {
    let mut current = value;
    for _ in 0..MAX_REF_HOPS {
        match current.get("$ref").and_then(Value::as_str) {
            Some(reference) => current = lookup_local_ref(doc, reference)?,
            None => return Some(current),
        }
    }
    None
}

/// Path-item parameters merged with operation parameters (operation wins on name+location).
fn collect_parameters(
    path_item: &Map<String, Value>,
    operation: &Map<String, Value>,
    doc: &Value,
    operation_id: &str,
) -> Vec<RawParameter> {
    let mut merged: Vec<RawParameter> = Vec::new();
    let mut index: HashMap<(String, ParamLocation), usize> = HashMap::new();

    let declared = [path_item.get("parameters"), operation.get("parameters")];
    for param in declared
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
    {
        let Some(param) = resolve_component(param, doc) else {
            tracing::warn!(operation_id, "Skipping unresolvable parameter reference");
            continue;
        };
        let name = param.get("name").and_then(Value::as_str);
        let location = param
            .get("in")
            .and_then(Value::as_str)
            .and_then(ParamLocation::parse);
        let (Some(name), Some(location)) = (name, location) else {
            tracing::warn!(operation_id, "Skipping parameter without a valid name/location");
            continue;
        };

        let schema = param
            .get("schema")
            .or_else(|| {
                param
                    .get("content")
                    .and_then(Value::as_object)
                    .and_then(|c| c.values().next())
                    .and_then(|media| media.get("schema"))
            })
            .map(|s| resolve_schema_references(s, doc))
            .unwrap_or_else(|| json!({}));

        let raw = RawParameter {
            name: name.to_string(),
            location,
            required: location == ParamLocation::Path
                || param.get("required").and_then(Value::as_bool) == Some(true),
            description: param
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            schema,
        };

        let key = (raw.name.clone(), location);
        if let Some(i) = index.get(&key).copied() {
            merged[i] = raw;
        } else {
            index.insert(key, merged.len());
            merged.push(raw);
        }
    }

    merged
}

/// The first JSON request body schema, fully resolved.
fn request_body(operation: &Map<String, Value>, doc: &Value) -> Option<RequestBody> {
    let body = resolve_component(operation.get("requestBody")?, doc)?;
    let content = body.get("content")?.as_object()?;
    let media = content.get("application/json").or_else(|| {
        content
            .iter()
            .find(|(media_type, _)| media_type.ends_with("+json"))
            .map(|(_, media)| media)
    });
    let Some(media) = media else {
        tracing::debug!(
            media_types = ?content.keys().collect::<Vec<_>>(),
            "Ignoring non-JSON request body"
        );
        return None;
    };
    Some(RequestBody {
        schema: resolve_schema_references(media.get("schema")?, doc),
        required: body.get("required").and_then(Value::as_bool) == Some(true),
    })
}

fn is_object_schema(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("object")
        || schema.get("properties").is_some_and(Value::is_object)
}

/// Flat input schema; the bool is `true` when the body travels as a single raw `body` argument.
fn build_input_schema(
    operation_id: &str,
    parameters: &[RawParameter],
    body: Option<&RequestBody>,
) -> (JsonObject, bool) {
    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();

    for param in parameters {
        let mut prop = param.schema.as_object().cloned().unwrap_or_default();
        if prop.contains_key("anyOf") {
            collapse_union_schema(&mut prop);
        }
        if !prop.get("type").is_some_and(Value::is_string) {
            let ty = get_single_param_type_from_schema(&Value::Object(prop.clone()));
            prop.insert("type".to_string(), Value::String(ty));
        }
        prop.insert("title".to_string(), Value::String(param.name.clone()));
        if let Some(description) = &param.description {
            prop.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
        properties.insert(param.name.clone(), Value::Object(prop));
    }

    let mut raw_body = false;
    if let Some(body) = body {
        if is_object_schema(&body.schema) {
            let body_required: Vec<&str> = body
                .schema
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let body_props = body.schema.get("properties").and_then(Value::as_object);
            for (name, prop) in body_props.into_iter().flatten() {
                if properties.contains_key(name) {
                    tracing::warn!(
                        operation_id,
                        property = %name,
                        "Request body property shadows a parameter; keeping the parameter"
                    );
                    continue;
                }
                let mut prop = prop.as_object().cloned().unwrap_or_default();
                if prop.contains_key("anyOf") {
                    collapse_union_schema(&mut prop);
                }
                if body_required.contains(&name.as_str()) {
                    required.push(Value::String(name.clone()));
                }
                properties.insert(name.clone(), Value::Object(prop));
            }
        } else {
            raw_body = true;
            let mut prop = body.schema.as_object().cloned().unwrap_or_default();
            prop.entry("title")
                .or_insert_with(|| Value::String("Body".to_string()));
            properties.insert("body".to_string(), Value::Object(prop));
            if body.required {
                required.push(Value::String("body".to_string()));
            }
        }
    }

    let mut schema = JsonObject::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    schema.insert(
        "title".to_string(),
        Value::String(format!("{operation_id}Arguments")),
    );
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    (schema, raw_body)
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn build_description(
    operation: &Map<String, Value>,
    path: &str,
    body: Option<&RequestBody>,
    doc: &Value,
    options: &ConvertOptions,
) -> String {
    let text = |key: &str| {
        operation
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };

    let mut out = text("summary").unwrap_or(path).to_string();
    if let Some(description) = text("description") {
        let _ = write!(out, "\n\n{description}");
    }

    if let Some(example) = body.and_then(|b| generate_example_from_schema(&b.schema)) {
        let _ = write!(
            out,
            "\n\n### Example Request:\n```json\n{}\n```",
            pretty(&example)
        );
    }

    let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
        return out;
    };
    if responses.is_empty() {
        return out;
    }

    let success = responses.iter().find(|(code, _)| {
        code.parse::<u16>()
            .is_ok_and(|c| (200..300).contains(&c))
    });
    let selected: Vec<(&String, &Value)> = match success {
        Some(entry) if !options.describe_all_responses => vec![entry],
        _ => responses.iter().collect(),
    };

    out.push_str("\n\n### Responses:\n");
    for (code, response) in selected {
        let response = resolve_schema_references(response, doc);
        let desc = response
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let _ = write!(out, "\n**{code}**: {desc}");

        let Some(content) = response.get("content").and_then(Value::as_object) else {
            continue;
        };
        for (content_type, media) in content {
            let Some(schema) = media.get("schema") else {
                continue;
            };
            let _ = write!(out, "\nContent-Type: {content_type}");

            if let Some(example) = response_example(media, schema) {
                let _ = write!(
                    out,
                    "\n\n**Example Response:**\n```json\n{}\n```",
                    pretty(&example)
                );
            }
            if options.describe_full_response_schema {
                let _ = write!(
                    out,
                    "\n\n**Output Schema:**\n```json\n{}\n```",
                    pretty(&clean_schema_for_display(schema))
                );
            }
        }
    }

    out
}

/// Declared `example`, else the first of `examples`, else one generated from the schema.
fn response_example(media: &Value, schema: &Value) -> Option<Value> {
    if let Some(example) = media.get("example").filter(|e| !e.is_null()) {
        return Some(example.clone());
    }
    let declared = match media.get("examples") {
        Some(Value::Object(named)) => named
            .values()
            .next()
            .map(|e| e.get("value").cloned().unwrap_or_else(|| e.clone())),
        Some(Value::Array(list)) => list.first().cloned(),
        _ => None,
    };
    if let Some(example) = declared.filter(|e| !e.is_null()) {
        return Some(example);
    }
    schema
        .get("example")
        .filter(|e| !e.is_null())
        .cloned()
        .or_else(|| generate_example_from_schema(schema))
}
