//! Keeping a [`SceneCache`] in step with an item store

use sightline_core::SceneCache;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::error::HostResult;
use crate::host::ItemApi;

/// Feed every item batch of `items` into `cache` until the store goes away
///
/// Subscribes before the initial load so no change is missed in between.
/// A lagging receiver skips to the newest batch, which holds the full list.
pub async fn follow_scene<A: ItemApi>(items: &A, cache: &SceneCache) -> HostResult<()> {
    let mut changes = items.subscribe();
    let initial = items.get_items(None).await?;
    let report = cache.update_items(&initial);
    debug!("Loaded {} scene item(s), changed: {}", initial.len(), report.changed());

    loop {
        match changes.recv().await {
            Ok(batch) => {
                let report = cache.update_items(&batch);
                for rejected in &report.rejected {
                    warn!("Scene item ignored: {}", rejected);
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                debug!("Skipped {} stale scene batch(es)", skipped);
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}
