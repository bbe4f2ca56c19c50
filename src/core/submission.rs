//! Double-submission guard.
//!
//! Each logical operation moves through `Idle -> Submitting -> Done | Failed`, keyed either by
//! a caller-supplied request id or by `operation:contact`. A key that is already submitting
//! is rejected. A request id that already completed is rejected as a duplicate, while an
//! operation key may run again once done. Failed keys may always be retried.

use crate::errors::{Error, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// State of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    /// Never seen
    #[default]
    Idle,
    /// In flight
    Submitting,
    /// Finished successfully
    Done,
    /// Finished with an error
    Failed,
}

/// What a submission is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionKey {
    key: String,
    explicit: bool,
}

impl SubmissionKey {
    /// Idempotency key supplied by the caller
    #[must_use]
    pub fn request(id: &str) -> Self {
        Self {
            key: id.to_string(),
            explicit: true,
        }
    }

    /// Derived key for an operation on a contact or row
    #[must_use]
    pub fn operation(operation: &str, subject: &str) -> Self {
        Self {
            key: format!("{operation}:{subject}"),
            explicit: false,
        }
    }

    /// Request id when given, else the derived operation key.
    #[must_use]
    pub fn for_request(request_id: Option<&str>, operation: &str, subject: &str) -> Self {
        request_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| Self::operation(operation, subject), Self::request)
    }

    /// Key text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

/// Tracks submission state per key for one process.
#[derive(Debug, Default)]
pub struct SubmissionTracker {
    states: Mutex<HashMap<String, SubmissionState>>,
}

impl SubmissionTracker {
    /// Empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, key: &str, state: SubmissionState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), state);
    }

    /// Current state of `key`
    #[must_use]
    pub fn state(&self, key: &SubmissionKey) -> SubmissionState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key.as_str())
            .copied()
            .unwrap_or_default()
    }

    /// Moves `key` to `Submitting`. The returned guard marks it `Failed` when dropped without
    /// [`SubmissionGuard::complete`].
    pub fn begin(&self, key: &SubmissionKey) -> Result<SubmissionGuard<'_>> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        match states.get(key.as_str()) {
            Some(SubmissionState::Submitting) => {
                return Err(Error::AlreadySubmitting {
                    key: key.key.clone(),
                });
            }
            Some(SubmissionState::Done) if key.explicit => {
                return Err(Error::DuplicateSubmission {
                    key: key.key.clone(),
                });
            }
            _ => {}
        }
        states.insert(key.key.clone(), SubmissionState::Submitting);
        debug!("Submission {} started", key.key);
        Ok(SubmissionGuard {
            tracker: self,
            key: key.key.clone(),
            finished: false,
        })
    }

    /// Runs `operation` under `key`, recording `Done` or `Failed` from its result.
    pub async fn run<T, Fut>(&self, key: &SubmissionKey, operation: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.begin(key)?;
        let result = operation.await;
        if result.is_ok() {
            guard.complete();
        }
        result
    }
}

/// Marks a key as in flight until completed or dropped.
#[derive(Debug)]
pub struct SubmissionGuard<'a> {
    tracker: &'a SubmissionTracker,
    key: String,
    finished: bool,
}

impl SubmissionGuard<'_> {
    /// Marks the submission `Done`.
    pub fn complete(mut self) {
        self.tracker.set(&self.key, SubmissionState::Done);
        self.finished = true;
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Submission {} failed", self.key);
            self.tracker.set(&self.key, SubmissionState::Failed);
        }
    }
}
