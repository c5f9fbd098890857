//! Inactivity rules for group chats.
//!
//! A group is stale once more than the threshold has passed since its last
//! message (or its creation, if nobody has written yet). Pruning only
//! partitions a snapshot; the store does the deleting and must treat a
//! delete of an already-gone group as a no-op.

use echo_types::models::{Group, Millis};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{EngagementError, Result};

/// 24 hours.
pub const DEFAULT_STALE_AFTER_MS: Millis = 24 * 60 * 60 * 1000;

/// Whether `group` has been quiet for strictly longer than `threshold_ms`.
pub fn is_stale(group: &Group, now: Millis, threshold_ms: Millis) -> Result<bool> {
    let last_activity = group
        .last_activity()
        .ok_or(EngagementError::MissingTimestamp(group.id))?;
    Ok(now.saturating_sub(last_activity) > threshold_ms)
}

/// Activity before this instant is stale: `is_stale` holds exactly when
/// `last_activity < stale_cutoff(now, threshold_ms)`. Stores use it to
/// re-check staleness inside their delete statement.
pub fn stale_cutoff(now: Millis, threshold_ms: Millis) -> Millis {
    now.saturating_sub(threshold_ms)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub retained: Vec<Group>,
    pub removed: Vec<Group>,
    /// Groups without any timestamp. They stay in `retained`; these ids
    /// are reported so the record can be repaired.
    pub malformed: Vec<Uuid>,
}

impl PruneOutcome {
    pub fn removed_ids(&self) -> Vec<Uuid> {
        self.removed.iter().map(|g| g.id).collect()
    }
}

/// Split `groups` into those to keep and those to delete. Same input, same
/// partition; running it again over the retained half removes nothing.
pub fn prune_stale(groups: &[Group], now: Millis, threshold_ms: Millis) -> PruneOutcome {
    let mut outcome = PruneOutcome::default();

    for group in groups {
        match is_stale(group, now, threshold_ms) {
            Ok(true) => outcome.removed.push(group.clone()),
            Ok(false) => outcome.retained.push(group.clone()),
            Err(e) => {
                warn!("Skipping prune of malformed group: {}", e);
                outcome.malformed.push(group.id);
                outcome.retained.push(group.clone());
            }
        }
    }

    debug!(
        "Prune sweep: {} retained, {} stale, {} malformed",
        outcome.retained.len(),
        outcome.removed.len(),
        outcome.malformed.len()
    );
    outcome
}
