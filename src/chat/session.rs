//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the
//! transcript and drives streaming requests: accumulate raw deltas,
//! re-filter the accumulated text after every delta, and update exactly
//! one assistant transcript entry per turn.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};

use crate::availability::{Availability, Phase};
use crate::chat::config::ChatConfig;
use crate::chat::render::Renderer;
use crate::client::VllmClient;
use crate::error::{Error, Result};
use crate::think::{strip_think, visible_prefix_len};
use crate::types::{ChatCompletionParams, Message};

/// A chat session that manages conversation state and streaming.
///
/// The transcript invariant: the assistant entry for a turn always
/// holds `strip_think(accumulated_raw)`, recomputed from scratch after
/// every delta. Raw accumulated text is never mutated by filtering, so
/// a think tag split across deltas is removed once enough text has
/// arrived.
pub struct ChatSession {
    client: VllmClient,
    availability: Availability,
    config: ChatConfig,
    messages: Vec<Message>,
    in_flight: bool,
}

impl ChatSession {
    /// Creates a new chat session.
    pub fn new(client: VllmClient, availability: Availability, config: ChatConfig) -> Self {
        Self {
            client,
            availability,
            config,
            messages: Vec::new(),
            in_flight: false,
        }
    }

    /// Returns the availability orchestrator.
    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    /// Returns the server base URL currently targeted.
    pub fn server(&self) -> &str {
        self.client.base_url()
    }

    /// Retargets the client to a different server. Takes effect on the
    /// next request.
    pub fn set_server(&mut self, base_url: &str) {
        self.client.set_base_url(base_url);
    }

    /// Returns the currently selected model, if any.
    pub fn model(&self) -> Option<&str> {
        self.availability.model().or(self.config.model.as_deref())
    }

    /// Selects a model. Validated against a fresh catalog on send.
    pub fn set_model(&mut self, model: String) {
        self.availability.set_model(model);
    }

    /// Sets the sampling temperature.
    pub fn set_temperature(&mut self, temperature: f32) {
        self.config.temperature = temperature;
    }

    /// Sets the maximum tokens per response.
    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.config.max_tokens = max_tokens;
    }

    /// Returns the conversation transcript.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Clears the conversation history.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Polls the server until it reports models or the startup timeout
    /// elapses. Returns true when the session is ready to send.
    pub async fn wait_for_server(&mut self) -> bool {
        self.availability.wait_for_server(&self.client).await
    }

    /// Re-checks health and the model catalog once.
    pub async fn refresh(&mut self) {
        self.availability.refresh(&self.client).await;
    }

    /// Issues a 1-token request to warm the model and reduce
    /// first-token latency. Failures are ignored.
    pub async fn warmup(&mut self) {
        let Some(model) = self.model().map(String::from) else {
            return;
        };
        let params = ChatCompletionParams::new(model, vec![Message::user("ping")], 0.0, 1);
        if let Ok(mut stream) = self.client.chat_stream(params).await {
            while stream.next().await.is_some() {}
        }
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Re-validates the model against a fresh catalog
    /// 2. Adds the user message to history
    /// 3. Appends one assistant entry and updates it per delta with the
    ///    think-filtered accumulated text
    /// 4. Renders displayable growth incrementally
    ///
    /// Transport failures are surfaced as an error marker inside the
    /// assistant entry rather than an `Err`; the transcript is always
    /// left in a re-enterable state.
    ///
    /// # Errors
    ///
    /// Returns an error when a stream is already in flight, when the
    /// server reports no models, or when the input is empty after
    /// trimming (silently, as `Ok`).
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        interrupted: &AtomicBool,
    ) -> Result<()> {
        if self.in_flight {
            return Err(Error::busy("a response is already streaming"));
        }
        let input = user_input.trim();
        if input.is_empty() {
            return Ok(());
        }

        let candidate = self.model().unwrap_or_default().to_string();
        let model = match self
            .availability
            .validate_for_send(&self.client, &candidate)
            .await
        {
            Ok(model) => model,
            Err(err) => {
                renderer.print_info("Server has no models yet.");
                return Err(err);
            }
        };
        self.availability.set_model(model.clone());

        self.messages.push(Message::user(input));
        let params = ChatCompletionParams::new(
            model,
            self.messages.clone(),
            self.config.temperature,
            self.config.max_tokens,
        );

        self.in_flight = true;
        self.stream_turn(params, renderer, interrupted).await;
        self.in_flight = false;
        Ok(())
    }

    /// Consumes the delta stream for one turn, maintaining the filtered
    /// assistant entry and rendering monotonic displayable growth.
    async fn stream_turn(
        &mut self,
        params: ChatCompletionParams,
        renderer: &mut dyn Renderer,
        interrupted: &AtomicBool,
    ) {
        self.messages.push(Message::assistant(""));
        let slot = self.messages.len() - 1;

        let mut raw = String::new();
        let mut printed = 0usize;

        match self.client.chat_stream(params).await {
            Ok(mut stream) => {
                while let Some(item) = stream.next().await {
                    if interrupted.load(Ordering::Relaxed) {
                        // Dropping the stream closes the response body.
                        renderer.print_interrupted();
                        break;
                    }
                    match item {
                        Ok(delta) => raw.push_str(&delta),
                        Err(err) => raw.push_str(&format!("\n\n[Error] {err}")),
                    }
                    let filtered = strip_think(&raw);
                    let stable = displayable_len(&filtered);
                    if stable > printed {
                        renderer.print_text(&filtered[printed..stable]);
                        printed = stable;
                    }
                    self.messages[slot].content = filtered.into_owned();
                }
            }
            Err(err) => {
                raw.push_str(&format!("[Request error] {err}"));
                self.messages[slot].content = raw.clone();
                renderer.print_text(&raw);
                printed = raw.len();
            }
        }

        // Flush anything held back (an unclosed reasoning section stays
        // visible, matching the stored transcript).
        let final_text = &self.messages[slot].content;
        if printed < final_text.len() && final_text.is_char_boundary(printed) {
            let remainder = final_text[printed..].to_string();
            renderer.print_text(&remainder);
        }
        renderer.finish_response();
    }

    /// Saves the transcript to the specified path.
    pub fn save_transcript_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let transcript = TranscriptFile::new(&self.messages);
        let file = File::create(path.as_ref())
            .map_err(|err| Error::io("failed to create transcript file", err))?;
        let writer = BufWriter::new(file);
        to_writer_pretty(writer, &transcript).map_err(|err| {
            Error::serialization("failed to serialize transcript", Some(Box::new(err)))
        })
    }

    /// Loads a transcript from disk, replacing the current history.
    pub fn load_transcript_from<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path.as_ref())
            .map_err(|err| Error::io("failed to open transcript file", err))?;
        let reader = BufReader::new(file);
        let transcript: TranscriptFile = from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse transcript", Some(Box::new(err)))
        })?;
        self.messages = transcript.messages;
        Ok(())
    }

    /// Returns a multi-line status summary for display.
    pub fn status_text(&self) -> String {
        let phase = match self.availability.phase() {
            Phase::Polling => "polling",
            Phase::Ready => "ready",
            Phase::Degraded => "degraded",
        };
        format!(
            "Server: {}\n{}\nPhase: {}\nModel: {}\nModels available: {}\nMessages: {}\nTemperature: {}\nMax tokens: {}",
            self.server(),
            self.availability.health_text(),
            phase,
            self.model().unwrap_or("none"),
            self.availability.catalog().len(),
            self.message_count(),
            self.config.temperature,
            self.config.max_tokens,
        )
    }
}

/// Length of the filtered prefix that is safe to print now: stops at
/// the first unmatched opening tag and additionally holds back a
/// trailing partial opening tag, so printed output is always a prefix
/// of the final filtered text.
fn displayable_len(filtered: &str) -> usize {
    let stable = visible_prefix_len(filtered);
    let bytes = filtered.as_bytes();
    let open = b"<think>";
    for k in (1..open.len()).rev() {
        if stable >= k && bytes[stable - k..stable].eq_ignore_ascii_case(&open[..k]) {
            return stable - k;
        }
    }
    stable
}

#[derive(Serialize, Deserialize)]
struct TranscriptFile {
    version: u8,
    messages: Vec<Message>,
}

impl TranscriptFile {
    fn new(messages: &[Message]) -> Self {
        Self {
            version: 1,
            messages: messages.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::PollConfig;

    fn test_session() -> ChatSession {
        let client = VllmClient::new(Some("http://127.0.0.1:9".to_string())).unwrap();
        let availability = Availability::new(PollConfig::new().with_preferred_model(None));
        ChatSession::new(client, availability, ChatConfig::new())
    }

    #[test]
    fn new_session_empty() {
        let session = test_session();
        assert_eq!(session.message_count(), 0);
        assert!(session.model().is_none());
    }

    #[test]
    fn clear_session() {
        let mut session = test_session();
        session.messages.push(Message::user("test"));
        assert_eq!(session.message_count(), 1);
        session.clear();
        assert_eq!(session.message_count(), 0);
    }

    #[test]
    fn set_model_and_server() {
        let mut session = test_session();
        session.set_model("qwen3".to_string());
        assert_eq!(session.model(), Some("qwen3"));
        session.set_server("http://other:8000/v1/");
        assert_eq!(session.server(), "http://other:8000/v1");
    }

    #[test]
    fn transcript_save_load_round_trip() {
        let mut session = test_session();
        session.messages.push(Message::user("hi"));
        session.messages.push(Message::assistant("hello"));

        let path = std::env::temp_dir().join(format!(
            "vllm-chat-transcript-{}.json",
            std::process::id()
        ));
        session.save_transcript_to(&path).unwrap();

        let mut restored = test_session();
        restored.load_transcript_from(&path).unwrap();
        assert_eq!(restored.messages(), session.messages());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn displayable_len_plain_text() {
        assert_eq!(displayable_len("hello"), 5);
    }

    #[test]
    fn displayable_len_holds_back_unmatched_open() {
        assert_eq!(displayable_len("ab<think>pending"), 2);
    }

    #[test]
    fn displayable_len_holds_back_partial_open() {
        assert_eq!(displayable_len("ab<thi"), 2);
        assert_eq!(displayable_len("ab<"), 2);
        assert_eq!(displayable_len("ab<other"), 8);
    }
}
