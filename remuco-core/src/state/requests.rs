//! Request correlation.
//!
//! Replies carry no request id, only the id of the request class, so at
//! most one request per [`ReqId`] may be outstanding. A second request of
//! the same class fails fast with [`RemucoError::RequestInFlight`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::error::RemucoError;
use crate::message::ReqId;
use crate::protocol::Payload;

/// Where the reply (or failure) of a request is delivered.
pub type ReplySender = oneshot::Sender<Result<Payload, RemucoError>>;

// ── TrackedRequest ───────────────────────────────────────────────

/// An outstanding request that may expire after a deadline.
#[derive(Debug)]
pub struct TrackedRequest {
    reply: ReplySender,
    /// When the request was written.
    pub sent_at: Instant,
    /// `None` means the request never expires.
    pub deadline: Option<Duration>,
}

impl TrackedRequest {
    pub fn is_expired(&self) -> bool {
        match self.deadline {
            Some(d) => self.sent_at.elapsed() > d,
            None => false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }

    /// Hands the outcome to the requester. A requester that gave up is ignored.
    pub fn complete(self, result: Result<Payload, RemucoError>) {
        let _ = self.reply.send(result);
    }
}

// ── RequestTracker ───────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RequestTracker {
    requests: HashMap<ReqId, TrackedRequest>,
    default_timeout: Option<Duration>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_timeout(timeout: Option<Duration>) -> Self {
        Self {
            requests: HashMap::new(),
            default_timeout: timeout,
        }
    }

    /// Track a request with the default timeout.
    ///
    /// If a request of the same class is outstanding, the new requester
    /// is failed with `RequestInFlight` and the same error is returned.
    pub fn track(&mut self, class: ReqId, reply: ReplySender) -> Result<(), RemucoError> {
        self.track_with_deadline(class, reply, self.default_timeout)
    }

    pub fn track_with_deadline(
        &mut self,
        class: ReqId,
        reply: ReplySender,
        deadline: Option<Duration>,
    ) -> Result<(), RemucoError> {
        if self.requests.contains_key(&class) {
            let _ = reply.send(Err(RemucoError::RequestInFlight(class)));
            return Err(RemucoError::RequestInFlight(class));
        }
        self.requests.insert(
            class,
            TrackedRequest {
                reply,
                sent_at: Instant::now(),
                deadline,
            },
        );
        Ok(())
    }

    /// Remove the outstanding request of `class`, if any.
    pub fn resolve(&mut self, class: ReqId) -> Option<TrackedRequest> {
        self.requests.remove(&class)
    }

    pub fn pending_count(&self) -> usize {
        self.requests.len()
    }

    /// Classes whose deadline has passed. Does not remove them.
    pub fn check_timeouts(&self) -> Vec<ReqId> {
        self.requests
            .iter()
            .filter(|(_, req)| req.is_expired())
            .map(|(&class, _)| class)
            .collect()
    }

    /// Remove and return all expired requests.
    pub fn drain_expired(&mut self) -> Vec<(ReqId, TrackedRequest)> {
        self.check_timeouts()
            .into_iter()
            .filter_map(|class| self.requests.remove(&class).map(|r| (class, r)))
            .collect()
    }

    /// Fail every outstanding request with `ConnectionClosed`.
    pub fn fail_all(&mut self) -> usize {
        let n = self.requests.len();
        for (_, req) in self.requests.drain() {
            req.complete(Err(RemucoError::ConnectionClosed));
        }
        n
    }
}

// ── Tests ────────────────────────────────────────────────────────
