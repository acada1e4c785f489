//! Interactive terminal chat for OpenAI-compatible completion servers.
//!
//! This binary provides a streaming REPL against a vLLM (or compatible)
//! backend. On startup it polls the server until models are available,
//! then streams responses token-by-token with `<think>` reasoning
//! sections filtered out of the transcript.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage against $OPENAI_BASE_URL (default http://127.0.0.1:8000/v1)
//! vllm-chat
//!
//! # Point at a different server and model
//! vllm-chat --base-url http://gpu-box:8000/v1 --model qwen3
//!
//! # Disable colors (useful for piping output)
//! vllm-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/models` - List available models
//! - `/model <name>` - Change the model
//! - `/server <url>` - Retarget the server
//! - `/refresh` - Re-check health and model list
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use vllm_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use vllm_chat::{Availability, PollConfig, VllmClient};

/// Main entry point for the vllm-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("vllm-chat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    let client = VllmClient::new(config.base_url.clone())?;
    let mut poll = PollConfig::new()
        .with_interval(config.poll_interval)
        .with_startup_timeout(config.startup_timeout);
    if config.model.is_some() {
        poll = poll.with_preferred_model(config.model.clone());
    }
    let availability = Availability::new(poll);
    let mut session = ChatSession::new(client, availability, config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("Waiting for {} ...", session.server());
    if session.wait_for_server().await {
        println!(
            "{} (model: {})",
            session.availability().health_text(),
            session.model().unwrap_or("none")
        );
        session.warmup().await;
    } else {
        println!(
            "{} - no models available; use /refresh once the server is up",
            session.availability().health_text()
        );
    }
    println!("Type /help for commands, /quit to exit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.clear();
                            renderer.print_info("Conversation cleared.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Models => {
                            if session.availability().selector_enabled() {
                                for model in session.availability().catalog() {
                                    println!("    {model}");
                                }
                            } else {
                                renderer.print_info("No models available.");
                            }
                        }
                        ChatCommand::Model(model) => {
                            renderer.print_info(&format!("Model changed to: {model}"));
                            session.set_model(model);
                        }
                        ChatCommand::Server(url) => {
                            session.set_server(&url);
                            session.refresh().await;
                            renderer.print_info(&format!(
                                "Server changed to: {} ({})",
                                session.server(),
                                session.availability().health_text()
                            ));
                        }
                        ChatCommand::Refresh => {
                            session.refresh().await;
                            renderer.print_info(&format!(
                                "{}; {} model(s); current: {}",
                                session.availability().health_text(),
                                session.availability().catalog().len(),
                                session.model().unwrap_or("none")
                            ));
                        }
                        ChatCommand::Temperature(value) => {
                            session.set_temperature(value);
                            renderer.print_info(&format!("Temperature set to {value}"));
                        }
                        ChatCommand::MaxTokens(value) => {
                            session.set_max_tokens(value);
                            renderer.print_info(&format!("max_tokens set to {value}"));
                        }
                        ChatCommand::Save(path) => match session.save_transcript_to(&path) {
                            Ok(()) => renderer.print_info(&format!("Transcript saved to {path}")),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Load(path) => match session.load_transcript_from(&path) {
                            Ok(()) => renderer.print_info(&format!(
                                "Transcript loaded from {path} ({} messages)",
                                session.message_count()
                            )),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Status => {
                            for line in session.status_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                print!("Assistant: ");
                if let Err(err) = session
                    .send_streaming(line, &mut renderer, &interrupted)
                    .await
                {
                    if !err.is_no_models() {
                        renderer.print_error(&err.to_string());
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at the prompt: ignore and continue
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    Ok(())
}
