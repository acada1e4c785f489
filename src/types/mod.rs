//! Wire types for the OpenAI-compatible completion API.

mod chat_completion_chunk;
mod chat_completion_params;
mod message;
mod model_info;
mod model_list_response;

pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use chat_completion_params::ChatCompletionParams;
pub use message::{Message, Role};
pub use model_info::ModelInfo;
pub use model_list_response::ModelListResponse;
