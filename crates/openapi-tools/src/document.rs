//! Loading and inspecting `OpenAPI` documents.
//!
//! Documents are kept as untyped JSON values: the converter only needs a handful of well-known
//! keys, and `OpenAPI` 3.1 documents (JSON-Schema 2020-12 `type` arrays, `examples` lists) do not
//! round-trip through the typed 3.0 models.

use crate::error::{OpenApiToolsError, Result};
use api_mcp_http_tools::{ApiClient, ApiRequest, HttpMethod};
use serde_json::{Map, Value};
use std::time::Duration;

/// A parsed `OpenAPI` document.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiDocument {
    value: Value,
}

impl OpenApiDocument {
    /// Wrap an already-parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::OpenApi`] if the value is not an object or `paths` is not an
    /// object.
    pub fn from_value(value: Value) -> Result<Self> {
        let Some(root) = value.as_object() else {
            return Err(OpenApiToolsError::OpenApi(
                "document root must be an object".to_string(),
            ));
        };
        if root.get("paths").is_some_and(|p| !p.is_object()) {
            return Err(OpenApiToolsError::OpenApi(
                "'paths' must be an object".to_string(),
            ));
        }
        Ok(Self { value })
    }

    /// Parse YAML or JSON text (JSON is a subset of YAML).
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::OpenApiParse`] when the text is not valid YAML/JSON.
    pub fn parse(text: &str, location: &str) -> Result<Self> {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|source| OpenApiToolsError::OpenApiParse {
                location: location.to_string(),
                source,
            })?;
        // Via the YAML value so unquoted integer keys (`200:`) become strings.
        let value = serde_json::to_value(yaml)?;
        Self::from_value(value)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.info_str("title")
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.info_str("description")
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.info_str("version")
    }

    /// The `paths` object, if present.
    #[must_use]
    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.value.get("paths").and_then(Value::as_object)
    }

    fn info_str(&self, key: &str) -> Option<&str> {
        self.value
            .get("info")
            .and_then(|info| info.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Load a document from a URL (`http://`, `https://`) or a file path.
///
/// # Errors
///
/// Returns an error if the document cannot be fetched/read or parsed.
pub async fn load_document(location: &str) -> Result<OpenApiDocument> {
    let text = if location.starts_with("http://") || location.starts_with("https://") {
        tracing::info!("Fetching OpenAPI document from {}", location);
        let fetch_err = |message: String| OpenApiToolsError::OpenApiFetch {
            url: location.to_string(),
            message,
        };
        let resp = reqwest::get(location)
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        resp.text().await.map_err(|e| fetch_err(e.to_string()))?
    } else {
        tracing::info!("Loading OpenAPI document from {}", location);
        tokio::fs::read_to_string(location)
            .await
            .map_err(|source| OpenApiToolsError::OpenApiReadFile {
                path: location.to_string(),
                source,
            })?
    };

    OpenApiDocument::parse(&text, location)
}

/// Fetch the document the target API serves about itself (e.g. `/openapi.json`).
///
/// # Errors
///
/// Returns an error if the call fails, answers with a non-2xx status, or the body does not parse.
pub async fn fetch_from_target(
    client: &dyn ApiClient,
    path: &str,
    timeout: Duration,
) -> Result<OpenApiDocument> {
    let resp = client
        .send(ApiRequest::new(HttpMethod::Get, path), timeout)
        .await?;
    if !(200..300).contains(&resp.status) {
        return Err(OpenApiToolsError::OpenApiFetch {
            url: path.to_string(),
            message: format!("HTTP {}", resp.status),
        });
    }
    OpenApiDocument::parse(&resp.text(), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_mcp_http_tools::RouterClient;
    use std::fs;
    use tempfile::tempdir;

    const YAML_DOC: &str = r#"
openapi: 3.1.0
info:
  title: Items API
  description: Manage items
  version: "1.0"
paths:
  /items/{item_id}:
    get:
      operationId: get_item
      responses:
        200:
          description: OK
"#;

    #[tokio::test]
    async fn test_load_document_from_yaml_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("openapi.yaml");
        fs::write(&path, YAML_DOC).unwrap();

        let doc = load_document(path.to_str().unwrap()).await.unwrap();
        assert_eq!(doc.title(), Some("Items API"));
        assert_eq!(doc.description(), Some("Manage items"));
        let paths = doc.paths().unwrap();
        let responses = &paths["/items/{item_id}"]["get"]["responses"];
        assert!(responses.get("200").is_some());
    }

    #[tokio::test]
    async fn test_load_document_missing_file() {
        let err = load_document("/definitely/not/here.json").await.unwrap_err();
        assert!(matches!(err, OpenApiToolsError::OpenApiReadFile { .. }));
    }

    #[test]
    fn test_rejects_non_object_documents() {
        assert!(OpenApiDocument::parse("- a\n- b\n", "inline").is_err());
        assert!(OpenApiDocument::parse("paths: []\n", "inline").is_err());
        assert!(matches!(
            OpenApiDocument::parse("{ not yaml", "inline"),
            Err(OpenApiToolsError::OpenApiParse { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_from_target_router() {
        let client = RouterClient::new(api_mcp_test_support::items_api_router());
        let doc = fetch_from_target(&client, "/openapi.json", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(doc.title(), Some("Items API"));

        let err = fetch_from_target(&client, "/nope.json", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, OpenApiToolsError::OpenApiFetch { .. }));
    }
}
