use serde::{Deserialize, Serialize};

/// Information about a model served by the backend.
///
/// Only the `id` field is required; the remaining fields mirror the
/// OpenAI-compatible models listing and are optional because servers
/// vary in what they report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Unique model identifier.
    pub id: String,

    /// Object type, `"model"` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,

    /// Unix timestamp of when the model was registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,

    /// Organization that owns the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_by: Option<String>,
}
