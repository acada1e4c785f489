use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("vllm_chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("vllm_chat.client.request_errors");
pub(crate) static CLIENT_REQUEST_RETRIES: Counter = Counter::new("vllm_chat.client.retries");
pub(crate) static CLIENT_RETRY_BACKOFF: Moments =
    Moments::new("vllm_chat.client.retry_backoff_seconds");

pub(crate) static STREAM_DELTAS: Counter = Counter::new("vllm_chat.stream.deltas");
pub(crate) static STREAM_SKIPPED_LINES: Counter = Counter::new("vllm_chat.stream.skipped_lines");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("vllm_chat.stream.errors");
pub(crate) static STREAM_CHUNKS: Counter = Counter::new("vllm_chat.stream.chunks");

pub(crate) static POLL_ATTEMPTS: Counter = Counter::new("vllm_chat.availability.poll_attempts");
pub(crate) static POLL_TIMEOUTS: Counter = Counter::new("vllm_chat.availability.poll_timeouts");
pub(crate) static REFRESHES: Counter = Counter::new("vllm_chat.availability.refreshes");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_REQUEST_RETRIES);
    collector.register_moments(&CLIENT_RETRY_BACKOFF);

    collector.register_counter(&STREAM_DELTAS);
    collector.register_counter(&STREAM_SKIPPED_LINES);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_CHUNKS);

    collector.register_counter(&POLL_ATTEMPTS);
    collector.register_counter(&POLL_TIMEOUTS);
    collector.register_counter(&REFRESHES);
}
