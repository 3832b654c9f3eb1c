//! Pure JSON-Schema helpers used while building tool descriptions and input schemas.

use serde_json::{Map, Value, json};

/// Keywords that carry no actionable information for a tool caller.
const DISPLAY_NOISE_KEYS: [&str; 9] = [
    "allOf",
    "anyOf",
    "oneOf",
    "nullable",
    "discriminator",
    "readOnly",
    "writeOnly",
    "xml",
    "externalDocs",
];

/// Look up a local reference (`#/components/schemas/Name`) in `document`.
#[must_use]
pub fn lookup_local_ref<'a>(document: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if !pointer.starts_with('/') {
        return None;
    }
    document.pointer(pointer)
}

/// Inline every local `$ref` found anywhere inside `part`.
///
/// The referenced schema is merged over the sibling keys of the `$ref`. A reference that is
/// already being expanded further up the same branch is left in place, so self-referencing
/// schemas terminate. Unresolvable references are left untouched.
#[must_use]
pub fn resolve_schema_references(part: &Value, document: &Value) -> Value {
    let mut chain = Vec::new();
    resolve_inner(part, document, &mut chain)
}

fn resolve_inner(part: &Value, document: &Value, chain: &mut Vec<String>) -> Value {
    match part {
        Value::Object(map) => {
            let mut merged = map.clone();
            let mut expanding = false;

            if let Some(Value::String(reference)) = map.get("$ref")
                && !chain.contains(reference)
                && let Some(Value::Object(target)) = lookup_local_ref(document, reference)
            {
                merged.remove("$ref");
                for (k, v) in target {
                    merged.insert(k.clone(), v.clone());
                }
                chain.push(reference.clone());
                expanding = true;
            }

            let resolved: Map<String, Value> = merged
                .into_iter()
                .map(|(k, v)| {
                    let v = resolve_inner(&v, document, chain);
                    (k, v)
                })
                .collect();

            if expanding {
                chain.pop();
            }
            Value::Object(resolved)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_inner(item, document, chain))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Strip keywords that are noise for an LLM, recursing through properties and array items.
#[must_use]
pub fn clean_schema_for_display(schema: &Value) -> Value {
    let Value::Object(map) = schema else {
        return schema.clone();
    };
    let mut cleaned = map.clone();
    for key in DISPLAY_NOISE_KEYS {
        cleaned.remove(key);
    }

    if let Some(Value::Object(props)) = cleaned.get_mut("properties") {
        for prop in props.values_mut() {
            if prop.is_object() {
                *prop = clean_schema_for_display(prop);
            }
        }
    }

    let is_array = cleaned.get("type").and_then(Value::as_str) == Some("array");
    if is_array
        && let Some(items) = cleaned.get_mut("items")
        && items.is_object()
    {
        *items = clean_schema_for_display(items);
    }

    Value::Object(cleaned)
}

/// Synthesize one representative value for `schema`.
///
/// Returns `None` for a missing/unknown `type` (and for `null`).
#[must_use]
pub fn generate_example_from_schema(schema: &Value) -> Option<Value> {
    let map = schema.as_object().filter(|m| !m.is_empty())?;

    match map.get("type").and_then(Value::as_str)? {
        "object" => {
            let mut result = Map::new();
            if let Some(Value::Object(props)) = map.get("properties") {
                for (name, prop) in props {
                    if let Some(example) = generate_example_from_schema(prop) {
                        result.insert(name.clone(), example);
                    }
                }
            }
            Some(Value::Object(result))
        }
        "array" => {
            let item = map.get("items").and_then(generate_example_from_schema);
            Some(Value::Array(item.into_iter().collect()))
        }
        "string" => {
            let example = match map.get("format").and_then(Value::as_str) {
                Some("date-time") => json!("2023-01-01T00:00:00Z"),
                Some("date") => json!("2023-01-01"),
                Some("email") => json!("user@example.com"),
                Some("uri") => json!("https://example.com"),
                _ => map.get("title").cloned().unwrap_or_else(|| json!("string")),
            };
            Some(example)
        }
        "integer" => Some(json!(1)),
        "number" => Some(json!(1.0)),
        "boolean" => Some(json!(true)),
        _ => None,
    }
}

/// Representative scalar type name of a parameter schema.
///
/// Unions pick the first non-null member type; anything unrecognizable defaults to `"string"`.
#[must_use]
pub fn get_single_param_type_from_schema(schema: &Value) -> String {
    if let Some(Value::Array(members)) = schema.get("anyOf") {
        return members
            .iter()
            .filter_map(|m| m.get("type").and_then(Value::as_str))
            .find(|t| *t != "null")
            .unwrap_or("string")
            .to_string();
    }
    match schema.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .unwrap_or("string")
            .to_string(),
        _ => "string".to_string(),
    }
}

/// Collapse an `anyOf` union into its first non-null member, in place.
///
/// The chosen member's keywords (`type`, `items`, `format`, `enum`, constraints) are copied onto
/// the schema without overriding keys it already has, so an array member keeps its `items`.
/// A union with no usable member becomes a plain string.
pub fn collapse_union_schema(schema: &mut Map<String, Value>) {
    let Some(Value::Array(members)) = schema.remove("anyOf") else {
        return;
    };

    let chosen = members.into_iter().find(|m| {
        m.get("type")
            .and_then(Value::as_str)
            .is_some_and(|t| t != "null")
    });

    match chosen {
        Some(Value::Object(member)) => {
            for (k, v) in member {
                if k == "title" || k == "description" {
                    continue;
                }
                schema.entry(k).or_insert(v);
            }
        }
        _ => {
            schema
                .entry("type")
                .or_insert_with(|| Value::String("string".to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> Value {
        json!({
            "components": {
                "schemas": {
                    "Item": {
                        "type": "object",
                        "required": ["id", "name"],
                        "properties": {
                            "id": {"type": "integer"},
                            "name": {"type": "string", "title": "Name"},
                            "tags": {"type": "array", "items": {"type": "string"}},
                            "owner": {"$ref": "#/components/schemas/User"}
                        }
                    },
                    "User": {
                        "type": "object",
                        "properties": {
                            "email": {"type": "string", "format": "email"},
                            "friends": {"type": "array", "items": {"$ref": "#/components/schemas/User"}}
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_resolves_nested_refs_in_objects_and_arrays() {
        let doc = document();
        let part = json!({
            "content": {"application/json": {"schema": {
                "type": "array",
                "items": {"$ref": "#/components/schemas/Item"}
            }}}
        });
        let resolved = resolve_schema_references(&part, &doc);
        let item = &resolved["content"]["application/json"]["schema"]["items"];
        assert_eq!(item["type"], "object");
        assert_eq!(item["properties"]["owner"]["properties"]["email"]["format"], "email");
        assert!(item.get("$ref").is_none());
    }

    #[test]
    fn test_self_reference_terminates() {
        let doc = document();
        let resolved =
            resolve_schema_references(&json!({"$ref": "#/components/schemas/User"}), &doc);
        let friends_items = &resolved["properties"]["friends"]["items"];
        assert_eq!(friends_items["$ref"], "#/components/schemas/User");
    }

    #[test]
    fn test_unknown_ref_left_untouched() {
        let part = json!({"$ref": "#/components/schemas/Missing", "description": "d"});
        assert_eq!(resolve_schema_references(&part, &document()), part);
    }

    #[test]
    fn test_clean_schema_strips_noise_recursively() {
        let schema = json!({
            "type": "object",
            "nullable": true,
            "required": ["a"],
            "properties": {
                "a": {"type": "string", "readOnly": true, "anyOf": []},
                "list": {"type": "array", "items": {"type": "object", "xml": {}, "oneOf": []}}
            },
            "externalDocs": {"url": "x"}
        });
        let cleaned = clean_schema_for_display(&schema);
        assert_eq!(
            cleaned,
            json!({
                "type": "object",
                "required": ["a"],
                "properties": {
                    "a": {"type": "string"},
                    "list": {"type": "array", "items": {"type": "object"}}
                }
            })
        );
    }

    #[test]
    fn test_generate_example_from_object_schema() {
        let doc = document();
        let schema =
            resolve_schema_references(&json!({"$ref": "#/components/schemas/Item"}), &doc);
        let example = generate_example_from_schema(&schema).unwrap();
        assert_eq!(example["id"], json!(1));
        assert_eq!(example["name"], json!("Name"));
        assert_eq!(example["tags"], json!(["string"]));
        assert_eq!(example["owner"]["email"], json!("user@example.com"));
    }

    #[test]
    fn test_generate_example_scalars_and_formats() {
        assert_eq!(
            generate_example_from_schema(&json!({"type": "string", "format": "date-time"})),
            Some(json!("2023-01-01T00:00:00Z"))
        );
        assert_eq!(
            generate_example_from_schema(&json!({"type": "string", "format": "uri"})),
            Some(json!("https://example.com"))
        );
        assert_eq!(
            generate_example_from_schema(&json!({"type": "number"})),
            Some(json!(1.0))
        );
        assert_eq!(
            generate_example_from_schema(&json!({"type": "boolean"})),
            Some(json!(true))
        );
        assert_eq!(
            generate_example_from_schema(&json!({"type": "array"})),
            Some(json!([]))
        );
        assert_eq!(generate_example_from_schema(&json!({"type": "null"})), None);
        assert_eq!(generate_example_from_schema(&json!({})), None);
        assert_eq!(generate_example_from_schema(&json!({"format": "date"})), None);
    }

    #[test]
    fn test_single_param_type() {
        assert_eq!(get_single_param_type_from_schema(&json!({"type": "integer"})), "integer");
        assert_eq!(
            get_single_param_type_from_schema(&json!({"type": "array", "items": {"type": "string"}})),
            "array"
        );
        assert_eq!(
            get_single_param_type_from_schema(&json!({"anyOf": [{"type": "null"}, {"type": "number"}]})),
            "number"
        );
        assert_eq!(get_single_param_type_from_schema(&json!({})), "string");
        assert_eq!(
            get_single_param_type_from_schema(&json!({"type": ["null", "boolean"]})),
            "boolean"
        );
    }

    #[test]
    fn test_collapse_union_keeps_array_items() {
        let mut schema = json!({
            "title": "Tags",
            "anyOf": [
                {"type": "array", "items": {"type": "string"}},
                {"type": "null"}
            ]
        });
        let map = schema.as_object_mut().unwrap();
        collapse_union_schema(map);
        assert_eq!(
            schema,
            json!({"title": "Tags", "type": "array", "items": {"type": "string"}})
        );
    }

    #[test]
    fn test_collapse_union_picks_first_non_null_member() {
        let mut schema = json!({
            "anyOf": [{"type": "null"}, {"type": "string", "format": "uuid"}, {"type": "integer"}],
            "description": "outer"
        });
        collapse_union_schema(schema.as_object_mut().unwrap());
        assert_eq!(
            schema,
            json!({"type": "string", "format": "uuid", "description": "outer"})
        );

        let mut only_null = json!({"anyOf": [{"type": "null"}]});
        collapse_union_schema(only_null.as_object_mut().unwrap());
        assert_eq!(only_null, json!({"type": "string"}));
    }
}
