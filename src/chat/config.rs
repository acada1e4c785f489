//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and
//! configuration structures for controlling chat behavior.

use std::time::Duration;

use arrrg_derive::CommandLine;

/// Default sampling temperature.
pub(crate) const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default maximum tokens per response.
const DEFAULT_MAX_TOKENS: u32 = 1536;

/// Default seconds between startup poll attempts.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// Default seconds to wait for the server at startup.
const DEFAULT_STARTUP_TIMEOUT_SECS: u64 = 180;

/// Command-line arguments for the vllm-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Base URL of the completion server.
    #[arrrg(optional, "Server base URL (default: $OPENAI_BASE_URL)", "URL")]
    pub base_url: Option<String>,

    /// Preferred model.
    #[arrrg(optional, "Preferred model (default: $DEFAULT_MODEL)", "MODEL")]
    pub model: Option<String>,

    /// Sampling temperature. Parsed when the config is resolved.
    #[arrrg(optional, "Sampling temperature (default: 0.7)", "TEMP")]
    pub temperature: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 1536)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Seconds between startup poll attempts.
    #[arrrg(optional, "Startup poll interval in seconds (default: 2)", "SECONDS")]
    pub poll_interval: Option<u64>,

    /// Seconds to keep polling at startup before degrading.
    #[arrrg(optional, "Startup timeout in seconds (default: 180)", "SECONDS")]
    pub startup_timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// Holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Server base URL override. `None` defers to the environment and
    /// the built-in local default.
    pub base_url: Option<String>,

    /// Preferred model. `None` defers to the DEFAULT_MODEL environment
    /// variable, then the catalog's first entry.
    pub model: Option<String>,

    /// Sampling temperature.
    pub temperature: f32,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Sleep between startup poll attempts.
    pub poll_interval: Duration,

    /// Total time to keep polling at startup.
    pub startup_timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    pub fn new() -> Self {
        Self {
            base_url: None,
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            startup_timeout: Duration::from_secs(DEFAULT_STARTUP_TIMEOUT_SECS),
            use_color: true,
        }
    }

    /// Sets the server base URL.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Sets the preferred model.
    pub fn with_model(mut self, model: String) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the startup poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the startup timeout.
    pub fn with_startup_timeout(mut self, startup_timeout: Duration) -> Self {
        self.startup_timeout = startup_timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            base_url: args.base_url,
            model: args.model,
            temperature: args
                .temperature
                .as_deref()
                .and_then(|t| t.parse().ok())
                .unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: args.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            poll_interval: Duration::from_secs(
                args.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            startup_timeout: Duration::from_secs(
                args.startup_timeout.unwrap_or(DEFAULT_STARTUP_TIMEOUT_SECS),
            ),
            use_color: !args.no_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert!(config.base_url.is_none());
        assert!(config.model.is_none());
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 1536);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.startup_timeout, Duration::from_secs(180));
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let args = ChatArgs::default();
        let config = ChatConfig::from(args);
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            base_url: Some("http://gpu-box:8000/v1".to_string()),
            model: Some("qwen3".to_string()),
            temperature: Some("0.2".to_string()),
            max_tokens: Some(4096),
            poll_interval: Some(1),
            startup_timeout: Some(30),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.base_url.as_deref(), Some("http://gpu-box:8000/v1"));
        assert_eq!(config.model.as_deref(), Some("qwen3"));
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.startup_timeout, Duration::from_secs(30));
        assert!(!config.use_color);
    }

    #[test]
    fn config_from_args_unparseable_temperature_falls_back() {
        let args = ChatArgs {
            temperature: Some("warm".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_base_url("http://localhost:8000/v1".to_string())
            .with_model("llama-3".to_string())
            .with_temperature(0.5)
            .with_max_tokens(256)
            .with_poll_interval(Duration::from_millis(100))
            .with_startup_timeout(Duration::from_secs(5))
            .without_color();

        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8000/v1"));
        assert_eq!(config.model.as_deref(), Some("llama-3"));
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.max_tokens, 256);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.startup_timeout, Duration::from_secs(5));
        assert!(!config.use_color);
    }
}
