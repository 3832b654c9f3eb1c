use crate::error::{OpenApiToolsError, Result};
use serde::{Deserialize, Serialize};

/// Default upper bound for tool names derived from operation ids.
pub const DEFAULT_MAX_OPERATION_ID_LENGTH: usize = 60;

/// Default timeout for one tool call against the API.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_max_operation_id_length() -> Option<usize> {
    Some(DEFAULT_MAX_OPERATION_ID_LENGTH)
}

fn default_headers_to_forward() -> Vec<String> {
    vec!["authorization".to_string()]
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Knobs for the `OpenAPI` -> tool conversion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Describe every documented status code, not only the first 2xx.
    #[serde(default)]
    pub describe_all_responses: bool,

    /// Append the resolved response JSON schema to each described response.
    #[serde(default)]
    pub describe_full_response_schema: bool,

    /// Operation ids longer than this are shortened. `None` disables shortening.
    #[serde(default = "default_max_operation_id_length")]
    pub max_operation_id_length: Option<usize>,

    /// Skip operations marked `deprecated: true`.
    #[serde(default)]
    pub ignore_deprecated: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            describe_all_responses: false,
            describe_full_response_schema: false,
            max_operation_id_length: default_max_operation_id_length(),
            ignore_deprecated: false,
        }
    }
}

/// Which converted tools are exposed.
///
/// `None` on an axis means "no filter on this axis"; an empty list is honored literally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    #[serde(default)]
    pub include_operations: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_operations: Option<Vec<String>>,
    #[serde(default)]
    pub include_tags: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_tags: Option<Vec<String>>,
    #[serde(default)]
    pub only_get_endpoints: bool,
    /// Drop tools whose server-qualified name is longer than this.
    #[serde(default)]
    pub max_tool_name_length: Option<usize>,
}

impl FilterConfig {
    /// Reject include+exclude on the same axis.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::Config`] on conflicting options.
    pub fn validate(&self) -> Result<()> {
        if self.include_operations.is_some() && self.exclude_operations.is_some() {
            return Err(OpenApiToolsError::Config(
                "Cannot specify both include_operations and exclude_operations".to_string(),
            ));
        }
        if self.include_tags.is_some() && self.exclude_tags.is_some() {
            return Err(OpenApiToolsError::Config(
                "Cannot specify both include_tags and exclude_tags".to_string(),
            ));
        }
        if self.max_tool_name_length == Some(0) {
            return Err(OpenApiToolsError::Config(
                "max_tool_name_length must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether any filter would change the converted catalog.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.include_operations.is_some()
            || self.exclude_operations.is_some()
            || self.include_tags.is_some()
            || self.exclude_tags.is_some()
            || self.only_get_endpoints
            || self.max_tool_name_length.is_some()
    }
}

/// How tool calls reach the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOptions {
    /// Inbound header names (case-insensitive) copied onto outbound calls.
    #[serde(default = "default_headers_to_forward")]
    pub headers_to_forward: Vec<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            headers_to_forward: default_headers_to_forward(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}
