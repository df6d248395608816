//! ProviderState: per-instance state machine behind a synchronized resource
//!
//! Every change goes through a guarded transition so that single-flight, debounce and
//! error suppression can be checked without any I/O.

use std::time::Duration;

use tokio::time::Instant;

use crate::state::{Phase, SkipReason, Snapshot};

#[derive(Debug)]
pub(crate) struct ProviderState<T, E> {
    phase: Phase,
    data: Option<T>,
    error: Option<E>,
    last_failure: Option<E>,
    loading: bool,
    in_flight: bool,
    cache_loaded: bool,
    has_fetched: bool,
    last_success: Option<Instant>,
    authenticated: bool,
    torn_down: bool,
}

impl<T: Clone, E: Clone> ProviderState<T, E> {
    pub fn new(initial: Option<T>) -> Self {
        Self {
            phase: Phase::Idle,
            data: initial,
            error: None,
            last_failure: None,
            loading: true,
            in_flight: false,
            cache_loaded: false,
            has_fetched: false,
            last_success: None,
            authenticated: false,
            torn_down: false,
        }
    }

    pub fn snapshot(&self) -> Snapshot<T, E> {
        Snapshot {
            data: self.data.clone(),
            loading: self.loading,
            error: self.error.clone(),
            phase: self.phase,
            last_success: self.last_success,
        }
    }

    /// Value obtained from the cache or a fetch; the seed value does not count
    pub fn known_value(&self) -> Option<&T> {
        match self.phase {
            Phase::Ready => self.data.as_ref(),
            _ => None,
        }
    }

    pub fn cache_loaded(&self) -> bool {
        self.cache_loaded
    }

    pub fn has_fetched(&self) -> bool {
        self.has_fetched
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn last_failure(&self) -> Option<&E> {
        self.last_failure.as_ref()
    }

    /// Records the result of the one-time cache read.
    ///
    /// Returns false if the cache was already consulted for this instance.
    pub fn hydrate(&mut self, cached: Option<T>) -> bool {
        if self.cache_loaded {
            return false;
        }
        self.cache_loaded = true;
        if let Some(value) = cached {
            self.data = Some(value);
            self.phase = Phase::Ready;
            self.loading = false;
        }
        true
    }

    /// Result of the last auth check; true for resources that never consult it
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// The auth check reported no user: nothing will be fetched, loading ends.
    pub fn settle_unauthenticated(&mut self) {
        self.authenticated = false;
        self.loading = false;
    }

    /// Guards entry into a network fetch.
    pub fn begin_fetch(
        &mut self,
        force: bool,
        now: Instant,
        debounce: Duration,
    ) -> Result<(), SkipReason> {
        if self.torn_down {
            return Err(SkipReason::TornDown);
        }
        if self.in_flight {
            return Err(SkipReason::InFlight);
        }
        if !force
            && let Some(last) = self.last_success
            && now.saturating_duration_since(last) < debounce
        {
            return Err(SkipReason::Debounced);
        }
        self.in_flight = true;
        if self.phase != Phase::Ready {
            self.phase = Phase::Loading;
        }
        Ok(())
    }

    /// Completes a fetch that succeeded; `changed` carries the new value if it differs.
    pub fn finish_success(&mut self, changed: Option<T>, now: Instant) {
        if let Some(value) = changed {
            self.data = Some(value);
        }
        self.phase = Phase::Ready;
        self.error = None;
        self.has_fetched = true;
        self.last_success = Some(now);
        self.loading = false;
        self.in_flight = false;
    }

    /// Completes a fetch that failed. The error is surfaced only when no value is known.
    pub fn finish_failure(&mut self, error: E) {
        self.last_failure = Some(error.clone());
        if self.phase != Phase::Ready {
            self.phase = Phase::Error;
            self.error = Some(error);
        }
        self.loading = false;
        self.in_flight = false;
    }

    /// Drops a fetch whose result arrived after teardown
    pub fn abandon_fetch(&mut self) {
        self.in_flight = false;
    }

    pub fn tear_down(&mut self) {
        self.torn_down = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEBOUNCE: Duration = Duration::from_secs(5);

    fn state() -> ProviderState<u32, String> {
        ProviderState::new(None)
    }

    #[test]
    fn hydrate_happens_once() {
        let mut s = state();
        assert!(s.hydrate(Some(1)));
        assert!(!s.hydrate(Some(2)));
        assert_eq!(s.known_value(), Some(&1));
        assert!(!s.snapshot().loading);
        assert!(s.cache_loaded());
    }

    #[test]
    fn cache_miss_keeps_loading() {
        let mut s = state();
        s.hydrate(None);
        let snap = s.snapshot();
        assert!(snap.loading);
        assert_eq!(snap.phase, Phase::Idle);
    }

    #[test]
    fn second_fetch_is_rejected_while_in_flight() {
        let mut s = state();
        let now = Instant::now();
        assert_eq!(s.begin_fetch(true, now, DEBOUNCE), Ok(()));
        assert_eq!(s.snapshot().phase, Phase::Loading);
        assert_eq!(s.begin_fetch(true, now, DEBOUNCE), Err(SkipReason::InFlight));
        s.finish_success(Some(3), now);
        assert_eq!(s.begin_fetch(true, now, DEBOUNCE), Ok(()));
    }

    #[test]
    fn debounce_applies_only_to_unforced_fetches() {
        let mut s = state();
        let now = Instant::now();
        s.begin_fetch(false, now, DEBOUNCE).unwrap();
        s.finish_success(Some(1), now);

        let soon = now + Duration::from_secs(2);
        assert_eq!(
            s.begin_fetch(false, soon, DEBOUNCE),
            Err(SkipReason::Debounced)
        );
        assert_eq!(s.begin_fetch(true, soon, DEBOUNCE), Ok(()));
        s.finish_success(None, soon);

        let later = soon + DEBOUNCE;
        assert_eq!(s.begin_fetch(false, later, DEBOUNCE), Ok(()));
    }

    #[test]
    fn failure_without_value_surfaces_error() {
        let mut s = ProviderState::<u32, String>::new(Some(9));
        s.hydrate(None);
        s.begin_fetch(false, Instant::now(), DEBOUNCE).unwrap();
        s.finish_failure("offline".to_string());

        let snap = s.snapshot();
        assert_eq!(snap.phase, Phase::Error);
        assert_eq!(snap.error.as_deref(), Some("offline"));
        assert_eq!(snap.data, Some(9));
        assert!(!snap.loading);
    }

    #[test]
    fn failure_with_known_value_is_suppressed() {
        let mut s = state();
        s.hydrate(Some(4));
        s.begin_fetch(false, Instant::now(), DEBOUNCE).unwrap();
        s.finish_failure("offline".to_string());

        let snap = s.snapshot();
        assert_eq!(snap.phase, Phase::Ready);
        assert_eq!(snap.error, None);
        assert_eq!(snap.data, Some(4));
        assert_eq!(s.last_failure().map(String::as_str), Some("offline"));
    }

    #[test]
    fn success_clears_previous_error() {
        let mut s = state();
        let now = Instant::now();
        s.begin_fetch(false, now, DEBOUNCE).unwrap();
        s.finish_failure("offline".to_string());
        s.begin_fetch(false, now, DEBOUNCE).unwrap();
        s.finish_success(Some(5), now);

        let snap = s.snapshot();
        assert_eq!(snap.error, None);
        assert_eq!(snap.last_success, Some(now));
        assert!(s.has_fetched());
    }

    #[test]
    fn torn_down_state_refuses_fetches() {
        let mut s = state();
        s.tear_down();
        assert_eq!(
            s.begin_fetch(true, Instant::now(), DEBOUNCE),
            Err(SkipReason::TornDown)
        );
        assert!(s.is_torn_down());
    }
}
