//! One logical connection to a remote endpoint (§4.7): state machine, pending-request table, and
//! continuation-point cache.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    service::ServiceResponse,
    transport::Transport,
    ua::{NodeId, StatusCode},
};

/// `Idle → Discovering → Connecting → Active → (Faulted | Closing) → Closed` (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Discovering,
    Connecting,
    Active,
    Faulted,
    Closing,
    Closed,
}

enum Slot {
    Pending { deadline: Instant },
    Done(Result<ServiceResponse>),
}

/// One entry of the client-side continuation-point cache (§4.7).
pub struct ContinuationCacheEntry {
    pub bytes: Vec<u8>,
    pub source_node_id: NodeId,
    pub issuing_request_id: u64,
    pub expiry: Instant,
}

struct Inner {
    state: SessionState,
    pending: HashMap<u64, Slot>,
    continuation_cache: VecDeque<ContinuationCacheEntry>,
    transport: Option<Box<dyn Transport>>,
}

/// A client session (§4.7, §3 Ownership: "the session manager exclusively owns client sessions").
pub struct Session {
    pub endpoint_uri: String,
    request_timeout: Duration,
    max_continuation_points: usize,
    inner: Mutex<Inner>,
}

impl Session {
    #[must_use]
    pub fn new(endpoint_uri: impl Into<String>, request_timeout: Duration, max_continuation_points: usize) -> Self {
        Self {
            endpoint_uri: endpoint_uri.into(),
            request_timeout,
            max_continuation_points,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                pending: HashMap::new(),
                continuation_cache: VecDeque::new(),
                transport: None,
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// `Idle → Discovering` (§4.7).
    pub fn start_discovery(&self) {
        self.transition(SessionState::Discovering);
    }

    /// `Discovering → Connecting` (§4.7).
    pub fn start_connecting(&self) {
        self.transition(SessionState::Connecting);
    }

    /// `Connecting → Active` (§4.7): installs the open transport handle.
    pub fn activate(&self, transport: Box<dyn Transport>) {
        let mut inner = self.inner.lock();
        inner.transport = Some(transport);
        inner.state = SessionState::Active;
    }

    /// `Active → Faulted` (§4.7): pending requests are retained so the application can drain
    /// their eventual `BadTimeout`/`BadSessionClosed` completions.
    pub fn fault(&self) {
        self.transition(SessionState::Faulted);
    }

    fn transition(&self, state: SessionState) {
        self.inner.lock().state = state;
    }

    /// Explicit disconnect (§5 "the cancellation primitive"): moves to `Closing`, completes every
    /// pending request with `BadSessionClosed`, then closes the transport and moves to `Closed`.
    pub fn disconnect(&self) {
        let mut inner = self.inner.lock();
        inner.state = SessionState::Closing;
        for slot in inner.pending.values_mut() {
            *slot = Slot::Done(Err(Error::SessionClosed));
        }
        inner.transport = None;
        inner.state = SessionState::Closed;
    }

    /// Registers a pending request's deadline (§4.7 default `requestTimeout` 60 s).
    pub fn register_pending(&self, message_id: u64) {
        let mut inner = self.inner.lock();
        inner.pending.insert(
            message_id,
            Slot::Pending {
                deadline: Instant::now() + self.request_timeout,
            },
        );
    }

    /// Completes a pending slot with its response or transport error.
    pub fn complete_pending(&self, message_id: u64, outcome: Result<ServiceResponse>) {
        let mut inner = self.inner.lock();
        if let Some(slot) = inner.pending.get_mut(&message_id) {
            *slot = Slot::Done(outcome);
        }
    }

    /// Takes a completed slot's result, if any, removing it from the table.
    pub fn take_completed(&self, message_id: u64) -> Option<Result<ServiceResponse>> {
        let mut inner = self.inner.lock();
        match inner.pending.get(&message_id) {
            Some(Slot::Done(_)) => match inner.pending.remove(&message_id) {
                Some(Slot::Done(outcome)) => Some(outcome),
                _ => None,
            },
            _ => None,
        }
    }

    /// Sweeps expired pending slots, completing them with `BadTimeout` (§4.7). The transport
    /// handle is kept open; a timeout is not itself a transport error.
    pub fn expire_timed_out(&self) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        for slot in inner.pending.values_mut() {
            if let Slot::Pending { deadline } = slot {
                if *deadline <= now {
                    *slot = Slot::Done(Err(Error::StatusCode(StatusCode::BAD_TIMEOUT)));
                }
            }
        }
    }

    /// Runs `f` against the session's open transport handle, if any (§3 Ownership: "owns the
    /// transport channel").
    pub fn with_transport<T>(&self, f: impl FnOnce(&dyn Transport) -> T) -> Option<T> {
        let inner = self.inner.lock();
        inner.transport.as_deref().map(f)
    }

    /// Pushes a continuation point, capped by the server-advertised limit (§4.7).
    pub fn push_continuation(&self, entry: ContinuationCacheEntry) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.continuation_cache.len() >= self.max_continuation_points {
            return Err(Error::StatusCode(StatusCode::BAD_NO_CONTINUATION_POINTS));
        }
        inner.continuation_cache.push_back(entry);
        Ok(())
    }

    /// Consumes the oldest continuation point (§4.7 "consumed ... in FIFO order").
    pub fn pop_continuation(&self) -> Option<ContinuationCacheEntry> {
        self.inner.lock().continuation_cache.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionState};
    use std::time::Duration;

    #[test]
    fn disconnect_completes_pending_requests_with_session_closed() {
        let session = Session::new("opc.tcp://localhost", Duration::from_secs(60), 10);
        session.register_pending(1);
        session.disconnect();
        assert_eq!(session.state(), SessionState::Closed);
        let outcome = session.take_completed(1).unwrap();
        assert!(outcome.is_err());
    }

    #[test]
    fn state_machine_follows_discovery_to_active() {
        let session = Session::new("opc.tcp://localhost", Duration::from_secs(60), 10);
        assert_eq!(session.state(), SessionState::Idle);
        session.start_discovery();
        assert_eq!(session.state(), SessionState::Discovering);
        session.start_connecting();
        assert_eq!(session.state(), SessionState::Connecting);
    }

    #[test]
    fn expired_pending_request_completes_with_timeout() {
        let session = Session::new("opc.tcp://localhost", Duration::from_millis(0), 10);
        session.register_pending(1);
        std::thread::sleep(Duration::from_millis(5));
        session.expire_timed_out();
        assert!(session.take_completed(1).unwrap().is_err());
    }
}
