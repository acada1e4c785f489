use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Request body for the chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionParams {
    /// The model to generate with.
    pub model: String,

    /// The conversation so far, oldest first.
    pub messages: Vec<Message>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Whether to stream the response as server-sent events.
    pub stream: bool,
}

impl ChatCompletionParams {
    /// Creates streaming request parameters.
    pub fn new(
        model: impl Into<String>,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            max_tokens,
            stream: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_request_body() {
        let params = ChatCompletionParams::new("llama-3", vec![Message::user("ping")], 0.5, 16);
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "llama-3",
                "messages": [{"role": "user", "content": "ping"}],
                "temperature": 0.5,
                "max_tokens": 16,
                "stream": true
            })
        );
    }
}
