use serde::{Deserialize, Serialize};

use crate::types::ModelInfo;

/// Response from the models listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListResponse {
    /// Object type, `"list"` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    /// Models the backend reports as available.
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

impl ModelListResponse {
    /// Returns the model identifiers in listing order.
    pub fn ids(&self) -> Vec<String> {
        self.data.iter().map(|info| info.id.clone()).collect()
    }
}
