use std::collections::HashMap;
use std::fmt;

use shared::domain::{CourseId, SequenceId};

/// Fetch lifecycle of one resource. `Denied` is success-shaped: the server
/// answered, the payload said access is not granted. `Failed` means a
/// load-critical request did not produce a usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Idle,
    Pending,
    Loaded,
    Denied,
    Failed,
}

impl ResourceStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Loaded | Self::Denied | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Course(CourseId),
    Sequence(SequenceId),
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Course(id) => write!(f, "course {id}"),
            Self::Sequence(id) => write!(f, "sequence {id}"),
        }
    }
}

/// Token identifying one fetch attempt. Monotonic across the tracker, so a
/// terminal write from a superseded attempt is distinguishable from the
/// current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchAttempt(u64);

#[derive(Debug, Default)]
pub struct StatusTracker {
    statuses: HashMap<ResourceKey, (ResourceStatus, FetchAttempt)>,
    last_attempt: u64,
}

impl StatusTracker {
    pub fn status(&self, key: &ResourceKey) -> ResourceStatus {
        self.statuses
            .get(key)
            .map(|(status, _)| *status)
            .unwrap_or(ResourceStatus::Idle)
    }

    /// Enters `Pending` for `key` and returns the attempt token the eventual
    /// terminal write must present.
    pub fn begin(&mut self, key: ResourceKey) -> FetchAttempt {
        self.last_attempt += 1;
        let attempt = FetchAttempt(self.last_attempt);
        self.statuses.insert(key, (ResourceStatus::Pending, attempt));
        attempt
    }

    /// Records a terminal status for `attempt`. Returns `false` and leaves
    /// the tracker untouched when a newer attempt for the same key has begun
    /// since; the stale settlement must not clobber the live one.
    pub fn settle(
        &mut self,
        key: &ResourceKey,
        attempt: FetchAttempt,
        status: ResourceStatus,
    ) -> bool {
        debug_assert!(status.is_terminal());
        match self.statuses.get_mut(key) {
            Some((current, current_attempt)) if *current_attempt == attempt => {
                *current = status;
                true
            }
            _ => false,
        }
    }
}
