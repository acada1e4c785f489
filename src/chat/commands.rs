//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the server.

use crate::chat::config::DEFAULT_TEMPERATURE;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the
/// server.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the conversation history.
    Clear,

    /// List the cached model catalog.
    Models,

    /// Change the model.
    Model(String),

    /// Retarget the client to a different server base URL.
    Server(String),

    /// Re-check health and refresh the model catalog once.
    Refresh,

    /// Set the sampling temperature.
    Temperature(f32),

    /// Set the maximum tokens per response.
    MaxTokens(u32),

    /// Save the transcript to a file.
    Save(String),

    /// Load conversation history from a file.
    Load(String),

    /// Display session status (server, health, model, settings).
    Status,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if
/// it should be treated as a regular message.
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "models" => ChatCommand::Models,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "server" => match argument {
            Some(url) => ChatCommand::Server(url.to_string()),
            None => ChatCommand::Invalid("/server requires a base URL".to_string()),
        },
        "refresh" => ChatCommand::Refresh,
        "temperature" => match argument {
            Some(arg) if arg.eq_ignore_ascii_case("clear") => {
                ChatCommand::Temperature(DEFAULT_TEMPERATURE)
            }
            Some(arg) => match parse_f32_in_range(arg, 0.0, 1.0) {
                Ok(value) => ChatCommand::Temperature(value),
                Err(err) => ChatCommand::Invalid(format!("/temperature {err}")),
            },
            None => ChatCommand::Invalid("/temperature requires a value".to_string()),
        },
        "max_tokens" => match argument {
            Some(arg) => match arg.parse::<u32>() {
                Ok(value) if value > 0 => ChatCommand::MaxTokens(value),
                _ => ChatCommand::Invalid("/max_tokens expects a positive integer".to_string()),
            },
            None => ChatCommand::Invalid("/max_tokens requires a value".to_string()),
        },
        "save" => match argument {
            Some(path) => ChatCommand::Save(path.to_string()),
            None => ChatCommand::Invalid("/save requires a file path".to_string()),
        },
        "load" => match argument {
            Some(path) => ChatCommand::Load(path.to_string()),
            None => ChatCommand::Invalid("/load requires a file path".to_string()),
        },
        "status" | "stats" => ChatCommand::Status,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

fn parse_f32_in_range(arg: &str, min: f32, max: f32) -> Result<f32, String> {
    match arg.parse::<f32>() {
        Ok(value) if value >= min && value <= max => Ok(value),
        Ok(_) => Err(format!("expects a value between {min} and {max}")),
        Err(_) => Err("expects a number".to_string()),
    }
}

/// Returns the help text describing available commands.
pub fn help_text() -> String {
    [
        "/clear              Clear conversation history",
        "/models             List available models",
        "/model <name>       Change the model",
        "/server <url>       Retarget the server base URL",
        "/refresh            Re-check health and model list",
        "/temperature <v>    Set sampling temperature (0.0-1.0; 'clear' resets)",
        "/max_tokens <n>     Set max tokens per response",
        "/save <path>        Save transcript to a file",
        "/load <path>        Load transcript from a file",
        "/status             Show session status",
        "/help               Show this help",
        "/quit               Exit",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_message_is_not_a_command() {
        assert!(parse_command("hello there").is_none());
        assert!(parse_command("").is_none());
    }

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/models"), Some(ChatCommand::Models));
        assert_eq!(parse_command("/refresh"), Some(ChatCommand::Refresh));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("/status"), Some(ChatCommand::Status));
    }

    #[test]
    fn parse_model_command() {
        assert_eq!(
            parse_command("/model qwen3"),
            Some(ChatCommand::Model("qwen3".to_string()))
        );
        assert!(matches!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_server_command() {
        assert_eq!(
            parse_command("/server http://gpu-box:8000/v1"),
            Some(ChatCommand::Server("http://gpu-box:8000/v1".to_string()))
        );
        assert!(matches!(
            parse_command("/server"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn parse_temperature_command() {
        assert_eq!(
            parse_command("/temperature 0.3"),
            Some(ChatCommand::Temperature(0.3))
        );
        assert!(matches!(
            parse_command("/temperature 1.5"),
            Some(ChatCommand::Invalid(_))
        ));
        assert!(matches!(
            parse_command("/temperature warm"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn temperature_clear_resets_to_default() {
        assert_eq!(
            parse_command("/temperature clear"),
            Some(ChatCommand::Temperature(DEFAULT_TEMPERATURE))
        );
        assert_eq!(
            parse_command("/temperature CLEAR"),
            Some(ChatCommand::Temperature(DEFAULT_TEMPERATURE))
        );
    }

    #[test]
    fn parse_max_tokens_command() {
        assert_eq!(
            parse_command("/max_tokens 2048"),
            Some(ChatCommand::MaxTokens(2048))
        );
        assert!(matches!(
            parse_command("/max_tokens 0"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn unknown_command_is_invalid() {
        assert!(matches!(
            parse_command("/bogus"),
            Some(ChatCommand::Invalid(_))
        ));
    }

    #[test]
    fn command_is_case_insensitive() {
        assert_eq!(parse_command("/QUIT"), Some(ChatCommand::Quit));
    }
}
