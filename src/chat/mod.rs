//! Terminal chat application support.
//!
//! This module contains the pieces of the `vllm-chat` binary that are
//! useful as a library: configuration, slash command parsing, output
//! rendering, and session management.

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer};
pub use session::ChatSession;
