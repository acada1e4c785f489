//! Server availability and model catalog orchestration.
//!
//! Tracks whether the backend is reachable and which models it serves.
//! On startup the orchestrator polls until the server reports a
//! non-empty catalog or a startup timeout elapses; afterwards the user
//! can trigger single-shot refreshes. The health indicator is purely
//! presentational: every send independently re-validates the catalog
//! via [`Availability::validate_for_send`].

use std::env;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::client::VllmClient;
use crate::error::{Error, Result};
use crate::observability::{POLL_ATTEMPTS, POLL_TIMEOUTS, REFRESHES};

/// Environment variable naming the preferred default model.
const PREFERRED_MODEL_ENV: &str = "DEFAULT_MODEL";

/// Availability phase.
///
/// `Polling` only occurs during startup. `Degraded` is entered when the
/// startup timeout elapses without models, or when a refresh finds an
/// empty catalog; a later successful refresh returns to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Startup polling is still in progress.
    Polling,
    /// A non-empty model catalog has been observed.
    Ready,
    /// No models are available; the model selector is disabled.
    Degraded,
}

/// Knobs for startup polling and default model selection.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Sleep between startup poll attempts.
    pub interval: Duration,

    /// Total time to keep polling before giving up.
    pub startup_timeout: Duration,

    /// Model to prefer when the catalog offers a choice.
    pub preferred_model: Option<String>,
}

impl PollConfig {
    /// Creates a config with default knobs, reading the preferred model
    /// from the DEFAULT_MODEL environment variable.
    pub fn new() -> Self {
        let preferred_model = env::var(PREFERRED_MODEL_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self {
            interval: Duration::from_secs(2),
            startup_timeout: Duration::from_secs(180),
            preferred_model,
        }
    }

    /// Sets the poll interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the startup timeout.
    pub fn with_startup_timeout(mut self, startup_timeout: Duration) -> Self {
        self.startup_timeout = startup_timeout;
        self
    }

    /// Sets the preferred model, overriding the environment.
    pub fn with_preferred_model(mut self, preferred_model: Option<String>) -> Self {
        self.preferred_model = preferred_model;
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Availability state machine over the backend's health and catalog.
#[derive(Debug, Clone)]
pub struct Availability {
    config: PollConfig,
    phase: Phase,
    healthy: bool,
    catalog: Vec<String>,
    model: Option<String>,
}

impl Availability {
    /// Creates a new orchestrator in the polling phase.
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            phase: Phase::Polling,
            healthy: false,
            catalog: Vec::new(),
            model: None,
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the last observed health state.
    pub fn healthy(&self) -> bool {
        self.healthy
    }

    /// Returns the current model catalog, replaced wholesale on every
    /// poll or refresh.
    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    /// Returns the currently selected model, if any.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Selects a model explicitly. The choice is re-validated against a
    /// fresh catalog before every send.
    pub fn set_model(&mut self, model: String) {
        self.model = Some(model);
    }

    /// Whether a model selector should be interactive.
    pub fn selector_enabled(&self) -> bool {
        !self.catalog.is_empty()
    }

    /// Presentation string derived from the last health probe. Does not
    /// gate whether a send may be attempted.
    pub fn health_text(&self) -> &'static str {
        if self.healthy {
            "Health: OK"
        } else {
            "Health: DOWN"
        }
    }

    /// Polls health and catalog until the server reports models or the
    /// startup timeout elapses.
    ///
    /// Returns true when a non-empty catalog was observed (phase
    /// `Ready`); false on timeout (phase `Degraded`, empty catalog).
    pub async fn wait_for_server(&mut self, client: &VllmClient) -> bool {
        self.phase = Phase::Polling;
        let deadline = Instant::now() + self.config.startup_timeout;

        while Instant::now() < deadline {
            POLL_ATTEMPTS.click();
            self.healthy = client.health().await;
            if self.healthy {
                let models = client.list_models().await;
                if !models.is_empty() {
                    self.become_ready(models);
                    return true;
                }
            }
            sleep(self.config.interval).await;
        }

        POLL_TIMEOUTS.click();
        self.become_degraded();
        false
    }

    /// Re-checks health and catalog once.
    ///
    /// On a non-empty catalog the current selection is kept if still
    /// present, else falls back to preferred-or-first and the phase
    /// returns to `Ready`. On failure or an empty catalog the phase
    /// moves to `Degraded` and the selector is disabled.
    pub async fn refresh(&mut self, client: &VllmClient) {
        REFRESHES.click();
        self.healthy = client.health().await;
        let models = client.list_models().await;
        if models.is_empty() {
            self.become_degraded();
        } else {
            self.become_ready(models);
        }
    }

    /// Re-validates a candidate model against a freshly fetched catalog.
    ///
    /// An empty catalog rejects the send. A candidate absent from a
    /// non-empty catalog is silently substituted with the catalog's
    /// first entry.
    pub async fn validate_for_send(
        &mut self,
        client: &VllmClient,
        candidate: &str,
    ) -> Result<String> {
        let models = client.list_models().await;
        if models.is_empty() {
            self.catalog.clear();
            return Err(Error::no_models("server has no models yet"));
        }
        let validated = if models.iter().any(|model| model == candidate) {
            candidate.to_string()
        } else {
            models[0].clone()
        };
        self.catalog = models;
        Ok(validated)
    }

    fn become_ready(&mut self, models: Vec<String>) {
        self.model = Some(select_model(
            self.model.as_deref(),
            self.config.preferred_model.as_deref(),
            &models,
        ));
        self.catalog = models;
        self.phase = Phase::Ready;
    }

    fn become_degraded(&mut self) {
        self.phase = Phase::Degraded;
        self.catalog.clear();
        self.model = None;
    }
}

/// Keep the current selection if still listed, else the preferred model
/// if listed, else the catalog's first entry.
fn select_model(current: Option<&str>, preferred: Option<&str>, models: &[String]) -> String {
    if let Some(current) = current
        && models.iter().any(|model| model == current)
    {
        return current.to_string();
    }
    if let Some(preferred) = preferred
        && models.iter().any(|model| model == preferred)
    {
        return preferred.to_string();
    }
    models[0].clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn initial_state_is_polling() {
        let availability = Availability::new(PollConfig::new().with_preferred_model(None));
        assert_eq!(availability.phase(), Phase::Polling);
        assert!(!availability.healthy());
        assert!(availability.catalog().is_empty());
        assert!(availability.model().is_none());
        assert!(!availability.selector_enabled());
        assert_eq!(availability.health_text(), "Health: DOWN");
    }

    #[test]
    fn select_model_prefers_current() {
        let models = catalog(&["a", "b", "c"]);
        assert_eq!(select_model(Some("b"), Some("c"), &models), "b");
    }

    #[test]
    fn select_model_falls_back_to_preferred() {
        let models = catalog(&["a", "b", "c"]);
        assert_eq!(select_model(Some("gone"), Some("c"), &models), "c");
        assert_eq!(select_model(None, Some("b"), &models), "b");
    }

    #[test]
    fn select_model_falls_back_to_first() {
        let models = catalog(&["a", "b"]);
        assert_eq!(select_model(Some("gone"), Some("also-gone"), &models), "a");
        assert_eq!(select_model(None, None, &models), "a");
    }

    #[test]
    fn become_ready_replaces_catalog_wholesale() {
        let mut availability = Availability::new(PollConfig::new().with_preferred_model(None));
        availability.become_ready(catalog(&["a", "b"]));
        assert_eq!(availability.phase(), Phase::Ready);
        assert_eq!(availability.model(), Some("a"));
        assert!(availability.selector_enabled());

        availability.become_ready(catalog(&["c"]));
        assert_eq!(availability.catalog(), &["c"]);
        assert_eq!(availability.model(), Some("c"));
    }

    #[test]
    fn degraded_clears_selection() {
        let mut availability = Availability::new(PollConfig::new().with_preferred_model(None));
        availability.become_ready(catalog(&["a"]));
        availability.become_degraded();
        assert_eq!(availability.phase(), Phase::Degraded);
        assert!(availability.catalog().is_empty());
        assert!(availability.model().is_none());
        assert!(!availability.selector_enabled());
    }
}
