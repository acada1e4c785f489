// Public modules
pub mod availability;
pub mod chat;
pub mod client;
pub mod error;
pub mod observability;
pub mod sse;
pub mod think;
pub mod types;

// Re-exports
pub use availability::{Availability, Phase, PollConfig};
pub use client::{Timeouts, VllmClient};
pub use error::{Error, Result};
pub use think::{strip_think, visible_prefix_len};
pub use types::*;
