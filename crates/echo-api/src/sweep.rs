use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use echo_engagement::lifecycle;
use echo_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::{AppState, now_millis, run_db};

/// Background task that prunes inactive group chats.
pub async fn run_prune_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        if let Err(e) = prune_inactive_groups(&state).await {
            warn!("Group prune error: {}", e);
        }
    }
}

/// Delete every group quiet for longer than the configured window and tell
/// connected clients. Safe to run from several places at once: the store
/// re-checks staleness as it deletes, and a group already gone is skipped.
/// Returns the ids this call removed.
pub async fn prune_inactive_groups(state: &AppState) -> Result<Vec<Uuid>, ApiError> {
    let now = now_millis();
    let threshold = state.stale_after_ms;

    let groups = run_db(state, |db| db.list_groups()).await?;
    let outcome = lifecycle::prune_stale(&groups, now, threshold);

    if !outcome.malformed.is_empty() {
        warn!(
            "{} groups have no activity timestamp and were kept: {:?}",
            outcome.malformed.len(),
            outcome.malformed
        );
    }
    if outcome.removed.is_empty() {
        return Ok(vec![]);
    }

    let stale_ids = outcome.removed_ids();
    let cutoff = lifecycle::stale_cutoff(now, threshold);
    let deleted = run_db(state, move |db| db.delete_stale_groups(&stale_ids, cutoff)).await?;

    for group_id in &deleted {
        state
            .dispatcher
            .broadcast(GatewayEvent::GroupDelete { group_id: *group_id });
    }
    if !deleted.is_empty() {
        info!("Pruned {} inactive groups", deleted.len());
    }

    Ok(deleted)
}
