//! State: published state of a synchronized resource
//!
//! This module provides the [`Snapshot`] handed to callers, the [`Phase`] of the
//! per-instance state machine, the [`FetchOutcome`] of a gated fetch and the
//! [`AsyncState`] trait for working with them uniformly.

use tokio::time::Instant;

/// Common trait for async state types that represent loading, success, and error states
pub trait AsyncState {
    /// The type of successful data
    type Data;
    /// The type of error
    type Error;

    /// Returns true if the state is currently loading
    fn is_loading(&self) -> bool;

    /// Returns true if the state contains successful data
    fn is_success(&self) -> bool;

    /// Returns true if the state contains an error
    fn is_error(&self) -> bool;

    /// Returns the data if available, None otherwise
    fn data(&self) -> Option<&Self::Data>;

    /// Returns the error if failed, None otherwise
    fn error(&self) -> Option<&Self::Error>;
}

/// Lifecycle phase of one resource instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing is known yet and no fetch is running
    #[default]
    Idle,
    /// A fetch is running and no value is known yet
    Loading,
    /// No value is known and the last fetch failed
    Error,
    /// A value is known, from the cache or a fetch
    Ready,
}

/// What a caller observes about a resource at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T, E> {
    /// Current value; may be the seed value before anything resolved
    pub data: Option<T>,
    /// True until the first resolution from cache or network
    pub loading: bool,
    /// Set only when no value is known and a fetch failed
    pub error: Option<E>,
    pub phase: Phase,
    /// When the last successful fetch completed
    pub last_success: Option<Instant>,
}

impl<T, E> Snapshot<T, E> {
    /// Initial snapshot before the cache was consulted
    pub fn seeded(initial: Option<T>) -> Self {
        Self {
            data: initial,
            loading: true,
            error: None,
            phase: Phase::Idle,
            last_success: None,
        }
    }

    /// Maps the contained data, keeping every other field
    pub fn map<U, F>(self, op: F) -> Snapshot<U, E>
    where
        F: FnOnce(T) -> U,
    {
        Snapshot {
            data: self.data.map(op),
            loading: self.loading,
            error: self.error,
            phase: self.phase,
            last_success: self.last_success,
        }
    }
}

impl<T, E> AsyncState for Snapshot<T, E> {
    type Data = T;
    type Error = E;

    fn is_loading(&self) -> bool {
        self.loading
    }

    fn is_success(&self) -> bool {
        self.phase == Phase::Ready
    }

    fn is_error(&self) -> bool {
        self.error.is_some()
    }

    fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }
}

/// Why a gated fetch did not reach the network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another fetch for the same instance is outstanding
    InFlight,
    /// The last success is more recent than the debounce window
    Debounced,
    /// The resource depends on auth and no user is signed in
    Unauthenticated,
    /// The instance has been released
    TornDown,
}

/// Result of one gated fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A new value was persisted and published
    Updated,
    /// The fetched value equals the current one
    Unchanged,
    /// The fetch failed
    Failed,
    /// The attempt never started
    Skipped(SkipReason),
    /// The result arrived after teardown and was dropped
    Discarded,
}

impl FetchOutcome {
    /// Returns true if the remote call was actually made
    pub fn reached_network(&self) -> bool {
        !matches!(self, FetchOutcome::Skipped(_))
    }
}
