//! Read-only protocol resources.

use std::path::PathBuf;

use tracing::warn;

use crate::protocol::{JsonRpcError, ReadResourceResult, Resource, ResourceContents};

/// URI of the default inventory file.
pub const DEFAULT_INVENTORY_URI: &str = "sysoperator://inventory/default";

const TEXT_PLAIN: &str = "text/plain";

/// Serves the default inventory file when it exists.
#[derive(Debug, Clone)]
pub struct ResourceProvider {
    default_inventory: PathBuf,
}

impl ResourceProvider {
    pub fn new(default_inventory: impl Into<PathBuf>) -> Self {
        Self {
            default_inventory: default_inventory.into(),
        }
    }

    async fn inventory_exists(&self) -> bool {
        tokio::fs::try_exists(&self.default_inventory)
            .await
            .unwrap_or(false)
    }

    /// Resources currently available. The inventory is listed only if present.
    pub async fn list(&self) -> Vec<Resource> {
        if !self.inventory_exists().await {
            return Vec::new();
        }
        vec![Resource {
            uri: DEFAULT_INVENTORY_URI.to_string(),
            name: "Default Ansible inventory".to_string(),
            mime_type: Some(TEXT_PLAIN.to_string()),
            description: Some(format!(
                "Default Ansible inventory file at {}",
                self.default_inventory.display()
            )),
        }]
    }

    pub async fn read(&self, uri: &str) -> Result<ReadResourceResult, JsonRpcError> {
        if uri != DEFAULT_INVENTORY_URI {
            return Err(JsonRpcError::invalid_request(format!("Unknown resource: {}", uri)));
        }
        if !self.inventory_exists().await {
            return Err(JsonRpcError::invalid_request("Default inventory file not found"));
        }

        let text = tokio::fs::read_to_string(&self.default_inventory)
            .await
            .map_err(|e| {
                warn!(path = %self.default_inventory.display(), error = %e, "Failed to read inventory");
                JsonRpcError::internal(format!("Failed to read inventory: {}", e))
            })?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some(TEXT_PLAIN.to_string()),
                text,
            }],
        })
    }
}
