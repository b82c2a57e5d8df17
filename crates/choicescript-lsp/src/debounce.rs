//! Debounced per-document tasks and the diagnostics lifecycle.
//!
//! Content changes schedule validation and index refreshes after a delay.
//! Each (document, task kind) pair has at most one pending deadline, and
//! rescheduling replaces it, so a burst of edits yields one run. Time is
//! passed in by the caller.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Delay before re-validating a changed document.
pub const VALIDATE_DELAY: Duration = Duration::from_millis(500);

/// Delay before re-indexing a changed document.
pub const INDEX_DELAY: Duration = Duration::from_millis(1000);

/// Kinds of debounced work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// Re-validate and publish diagnostics.
    Validate,
    /// Refresh the project index entry.
    Index,
}

impl TaskKind {
    /// How long after the last edit the task runs.
    pub const fn delay(self) -> Duration {
        match self {
            Self::Validate => VALIDATE_DELAY,
            Self::Index => INDEX_DELAY,
        }
    }
}

/// Pending deadlines, keyed by document URI and task kind.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: HashMap<(String, TaskKind), Instant>,
}

impl Debouncer {
    /// Create an empty debouncer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a task `kind.delay()` after `now`, replacing any pending one.
    pub fn schedule(&mut self, uri: &str, kind: TaskKind, now: Instant) {
        self.pending
            .insert((uri.to_string(), kind), now + kind.delay());
    }

    /// Cancel one pending task. Returns whether it was pending.
    pub fn cancel(&mut self, uri: &str, kind: TaskKind) -> bool {
        self.pending.remove(&(uri.to_string(), kind)).is_some()
    }

    /// Cancel every pending task of a document.
    pub fn cancel_document(&mut self, uri: &str) {
        self.pending.retain(|(pending, _), _| pending != uri);
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().min().copied()
    }

    /// Remove and return every task due at `now`, ordered by deadline.
    pub fn take_due(&mut self, now: Instant) -> Vec<(String, TaskKind)> {
        let mut due: Vec<(Instant, String, TaskKind)> = self
            .pending
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|((uri, kind), deadline)| (*deadline, uri.clone(), *kind))
            .collect();
        due.sort();

        for (_, uri, kind) in &due {
            self.pending.remove(&(uri.clone(), *kind));
        }
        due.into_iter().map(|(_, uri, kind)| (uri, kind)).collect()
    }

    /// Whether a task is pending.
    pub fn is_pending(&self, uri: &str, kind: TaskKind) -> bool {
        self.pending.contains_key(&(uri.to_string(), kind))
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Diagnostics state of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticsState {
    /// Content changed since the last validation.
    Unvalidated,
    /// A validation pass is running.
    Validating,
    /// Diagnostics match the content.
    Validated,
    /// The document was closed. Terminal.
    Disposed,
}

/// Tracks the [`DiagnosticsState`] of every document.
#[derive(Debug, Default)]
pub struct Lifecycle {
    states: HashMap<String, DiagnosticsState>,
}

impl Lifecycle {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// A document was opened (or reopened after disposal).
    pub fn open(&mut self, uri: &str) {
        self.states
            .insert(uri.to_string(), DiagnosticsState::Unvalidated);
    }

    /// A document's content changed. Ignored for unknown or disposed documents.
    pub fn changed(&mut self, uri: &str) {
        if let Some(state) = self.states.get_mut(uri) {
            if *state != DiagnosticsState::Disposed {
                *state = DiagnosticsState::Unvalidated;
            }
        }
    }

    /// Enter `Validating`. Returns `false` if the document is unknown or disposed.
    pub fn begin(&mut self, uri: &str) -> bool {
        match self.states.get_mut(uri) {
            Some(state) if *state != DiagnosticsState::Disposed => {
                *state = DiagnosticsState::Validating;
                true
            }
            _ => false,
        }
    }

    /// Leave `Validating` for `Validated`. Returns `false` if validation was
    /// not in progress, e.g. the document was disposed meanwhile.
    pub fn finish(&mut self, uri: &str) -> bool {
        match self.states.get_mut(uri) {
            Some(state) if *state == DiagnosticsState::Validating => {
                *state = DiagnosticsState::Validated;
                true
            }
            _ => false,
        }
    }

    /// A document was closed.
    pub fn dispose(&mut self, uri: &str) {
        self.states
            .insert(uri.to_string(), DiagnosticsState::Disposed);
    }

    /// The state of a document.
    pub fn state(&self, uri: &str) -> Option<DiagnosticsState> {
        self.states.get(uri).copied()
    }
}
