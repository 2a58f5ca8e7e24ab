//! Per-request hedge bookkeeping.

use std::{sync::OnceLock, time::Duration};

use tokio::time::Instant;

use crate::resolver::{Call, Completion};

/// Which call of a hedged request produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// The call issued as soon as the request arrived.
    Primary,
    /// The call issued after the hedge delay elapsed.
    Backup,
}

impl Branch {
    /// Short lowercase name, for logs and display.
    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Primary => "primary",
            Branch::Backup => "backup",
        }
    }
}

/// Single-assignment destination of a request's outcome.
///
/// The first [`try_complete`](ResultSlot::try_complete) wins; later attempts are
/// rejected and leave the stored value untouched. Completion is atomic, so the
/// slot can be shared between racing threads.
#[derive(Debug)]
pub struct ResultSlot<T> {
    cell: OnceLock<T>,
}

impl<T> ResultSlot<T> {
    /// Creates an open slot.
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Stores `value` if the slot is still open. Returns whether it was stored.
    pub fn try_complete(&self, value: T) -> bool {
        self.cell.set(value).is_ok()
    }

    /// Returns `true` once a value has been stored.
    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The stored value, if any.
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Consumes the slot, returning the stored value.
    pub fn into_inner(self) -> Option<T> {
        self.cell.into_inner()
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The calls of one hedged request and the slot their race resolves.
///
/// Fields are disjoint so the race loop can borrow each call independently.
pub(crate) struct HedgeAttempt<T, E> {
    pub(crate) primary: Option<Call<T, E>>,
    pub(crate) backup: Option<Call<T, E>>,
    pub(crate) slot: ResultSlot<(Branch, Completion<T, E>)>,
    started: Instant,
}

impl<T, E> HedgeAttempt<T, E> {
    pub(crate) fn new(primary: Call<T, E>) -> Self {
        Self {
            started: primary.started(),
            primary: Some(primary),
            backup: None,
            slot: ResultSlot::new(),
        }
    }

    /// Time since the request entered the orchestrator.
    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Cancels whatever is still in flight once the slot holds the outcome.
    pub(crate) fn finish(mut self) -> Option<(Branch, Completion<T, E>)> {
        if let Some(backup) = self.backup.take() {
            backup.cancel();
        }
        if let Some(primary) = self.primary.take() {
            primary.cancel();
        }
        self.slot.into_inner()
    }
}
