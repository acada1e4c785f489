use serde::{Deserialize, Serialize};

/// One streamed event from the chat completions endpoint.
///
/// Servers emit one chunk per `data:` line. Only the delta content is
/// interesting to this crate; every other field is tolerated and
/// ignored so that heartbeat or vendor-extended chunks do not abort
/// the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Completion choices; streaming responses carry exactly one.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

/// A single choice within a streamed chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// The incremental update for this choice.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Reason the stream finished, present on the final content chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The incremental content update within a choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Text produced since the previous chunk, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Returns the delta content of the first choice, if present and non-empty.
    pub fn delta_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}
