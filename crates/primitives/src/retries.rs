use std::time::Duration;

use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use tokio_retry::strategy::FixedInterval;

/// The default number of attempts for a single fetch, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// The default pause between two attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);

/// The pauses between attempts of one fetch.
pub trait Strategy: Iterator<Item = Duration> + Clone + Send + Sync + 'static {}

/// Any `tokio_retry` backoff, bounded or not, is a [`Strategy`].
impl<T> Strategy for T where T: Iterator<Item = Duration> + Clone + Send + Sync + 'static {}

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause before each new attempt
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, backoff: DEFAULT_BACKOFF }
    }
}

impl RetryPolicy {
    /// Create a new policy. `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff }
    }

    /// The pauses to take between attempts: one fewer than the number of attempts.
    pub fn strategy(&self) -> impl Strategy + use<> {
        let retries = self.max_attempts.saturating_sub(1) as usize;
        FixedInterval::new(self.backoff).take(retries)
    }
}

/// Returns true if `error` means the connection to the node went away.
///
/// Only these failures are worth a reconnect and retry. Error responses, malformed payloads and
/// local serialization failures are deterministic and are reported as is.
pub fn is_connection_closed(error: &TransportError) -> bool {
    match error {
        RpcError::Transport(
            TransportErrorKind::BackendGone | TransportErrorKind::PubsubUnavailable,
        ) => true,
        RpcError::Transport(kind) => {
            let message = kind.to_string().to_lowercase();
            is_connection_refused(&message)
                || ["connection closed", "connection reset", "broken pipe"]
                    .iter()
                    .any(|needle| message.contains(needle))
        }
        _ => false,
    }
}

/// Checks whether the error message contains "connection refused".
#[inline]
pub fn is_connection_refused<S: ToString>(e: S) -> bool {
    e.to_string().to_lowercase().contains("connection refused")
}
