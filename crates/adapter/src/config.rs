//! Bridge configuration.
//!
//! Loaded from a YAML/JSON file (camelCase keys) or built in code. The converter, filter and
//! execution knobs live in `api-mcp-openapi-tools` and are flattened into one document here.

use crate::error::{AdapterError, Result};
use api_mcp_openapi_tools::{ConvertOptions, ExecutionOptions, FilterConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// MCP server name. Defaults to the document's `info.title`.
    #[serde(default)]
    pub name: Option<String>,

    /// Server instructions. Defaults to the document's `info.description`.
    #[serde(default)]
    pub description: Option<String>,

    /// Suppress the setup warnings (tool count, non-GET tools, auto-generated ids).
    #[serde(default)]
    pub disable_warnings: bool,

    #[serde(flatten)]
    pub convert: ConvertOptions,

    #[serde(flatten)]
    pub filter: FilterConfig,

    #[serde(flatten)]
    pub execution: ExecutionOptions,
}

impl BridgeConfig {
    /// Load configuration from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the filter options conflict.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check option combinations that can only fail at setup time.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Config`] when filters conflict or a limit is zero.
    pub fn validate(&self) -> Result<()> {
        self.filter
            .validate()
            .map_err(|e| AdapterError::Config(e.to_string()))?;
        if self.execution.timeout_secs == 0 {
            return Err(AdapterError::Config(
                "timeoutSecs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
