use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::answer::{parse_answer, Answer};
use crate::error::{PeerError, Result};

/// Default number of unclaimed answers kept around.
pub const DEFAULT_MAX_RETAINED: usize = 64;

/// Default time a request waits for its answer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for a [`Correlator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatorConfig {
    /// Unclaimed answers kept before the oldest is evicted (at least 1).
    pub max_retained: usize,
    /// Timeout used by [`Client::request`](crate::Client::request).
    pub default_timeout: Duration,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            max_retained: DEFAULT_MAX_RETAINED,
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl CorrelatorConfig {
    pub fn with_max_retained(mut self, max_retained: usize) -> Self {
        self.max_retained = max_retained;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

struct Inner {
    config: CorrelatorConfig,
    answers: Mutex<VecDeque<Answer>>,
    arrived: Notify,
}

/// Matches request texts with server answers.
///
/// Answers are kept in arrival order, bounded by `max_retained`. A waiter
/// claims the newest answer whose request echo equals its request text
/// byte for byte. Waiters on identical request texts race for answers:
/// the protocol carries no per-request tag to tell them apart.
///
/// Cloning yields another handle to the same answer list.
#[derive(Clone)]
pub struct Correlator {
    inner: Arc<Inner>,
}

impl Correlator {
    pub fn new(config: CorrelatorConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                answers: Mutex::new(VecDeque::new()),
                arrived: Notify::new(),
            }),
        }
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.inner.config
    }

    fn answers(&self) -> MutexGuard<'_, VecDeque<Answer>> {
        self.inner
            .answers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue an answer and wake every waiter.
    pub fn push(&self, answer: Answer) {
        let max = self.inner.config.max_retained.max(1);
        {
            let mut answers = self.answers();
            answers.push_back(answer);
            while answers.len() > max {
                if let Some(evicted) = answers.pop_front() {
                    debug!(req = %evicted.req, "evicting unclaimed answer");
                }
            }
        }
        self.inner.arrived.notify_waiters();
    }

    /// Parse `!server.msg` content and queue the resulting answer.
    pub fn push_content(&self, content: &str) -> Answer {
        let answer = parse_answer(content);
        trace!(req = %answer.req, "answer received");
        self.push(answer.clone());
        answer
    }

    /// Remove and return the newest answer to `request`, if any.
    pub fn claim(&self, request: &str) -> Option<String> {
        let mut answers = self.answers();
        let idx = answers.iter().rposition(|answer| answer.req == request)?;
        answers.remove(idx).map(|answer| answer.rsp)
    }

    /// Wait until an answer to `request` can be claimed.
    ///
    /// Dropping the returned future abandons the wait; nothing is left
    /// running in the background.
    pub async fn wait_for(&self, request: &str, timeout: Duration) -> Result<String> {
        let wait = async {
            loop {
                let arrived = self.inner.arrived.notified();
                tokio::pin!(arrived);
                // Register before scanning so a push between the scan and
                // the await is not missed.
                arrived.as_mut().enable();
                if let Some(rsp) = self.claim(request) {
                    return rsp;
                }
                arrived.await;
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| PeerError::Timeout {
                request: request.to_string(),
                after: timeout,
            })
    }

    /// Number of unclaimed answers.
    pub fn len(&self) -> usize {
        self.answers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the unclaimed answers, oldest first.
    pub fn pending(&self) -> Vec<Answer> {
        self.answers().iter().cloned().collect()
    }
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("config", &self.inner.config)
            .field("unclaimed", &self.len())
            .finish()
    }
}
