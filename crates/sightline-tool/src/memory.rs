//! In-memory host
//!
//! Two item stores, square-cell snapping and both interaction flavors.
//! Gates let a caller hold back snapping or interaction setup to replay
//! out-of-order completions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::DVec2;
use parking_lot::{Mutex, RwLock};
use sightline_core::{GridInfo, Item, ItemId};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::control_items::ControlItems;
use crate::error::{HostError, HostResult};
use crate::host::{Host, Interaction, ItemApi, StoreKind};

const CHANGE_CAPACITY: usize = 64;

/// Open/closed latch that suspends callers while closed
#[derive(Debug, Clone)]
pub struct Gate {
    state: Arc<watch::Sender<bool>>,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            state: Arc::new(watch::Sender::new(true)),
        }
    }
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.state.send_replace(false);
    }

    pub fn open(&self) {
        self.state.send_replace(true);
    }

    pub fn is_open(&self) -> bool {
        *self.state.borrow()
    }

    /// Wait until the gate is open
    pub async fn pass(&self) {
        let mut rx = self.state.subscribe();
        // The sender outlives `rx`, so this only returns once open
        let _ = rx.wait_for(|open| *open).await;
    }
}

/// Item store kept in a `Vec`, in insertion order
#[derive(Debug)]
pub struct MemoryItemStore {
    items: Mutex<Vec<Item>>,
    changes: broadcast::Sender<Vec<Item>>,
    clock: AtomicU64,
    failure: Mutex<Option<HostError>>,
    gate: Gate,
}

impl Default for MemoryItemStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            items: Mutex::new(Vec::new()),
            changes,
            clock: AtomicU64::new(0),
            failure: Mutex::new(None),
            gate: Gate::new(),
        }
    }
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `error` until cleared with `None`
    pub fn fail_with(&self, error: Option<HostError>) {
        *self.failure.lock() = error;
    }

    /// Gate every call passes before touching the store
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Current items without going through the async API
    pub fn items(&self) -> Vec<Item> {
        self.items.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    async fn enter(&self) -> HostResult<()> {
        self.gate.pass().await;
        match self.failure.lock().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn publish(&self) {
        let items = self.items.lock().clone();
        // No subscribers is fine
        let _ = self.changes.send(items);
    }
}

impl ItemApi for MemoryItemStore {
    async fn get_items(&self, ids: Option<&[ItemId]>) -> HostResult<Vec<Item>> {
        self.enter().await?;
        let items = self.items.lock();
        Ok(match ids {
            Some(ids) => ids
                .iter()
                .filter_map(|id| items.iter().find(|item| item.id == *id).cloned())
                .collect(),
            None => items.clone(),
        })
    }

    async fn add_items(&self, items: Vec<Item>) -> HostResult<()> {
        self.enter().await?;
        self.items.lock().extend(items);
        self.publish();
        Ok(())
    }

    async fn update_items<F>(&self, ids: &[ItemId], mutate: F) -> HostResult<Vec<Item>>
    where
        F: FnOnce(&mut [Item]) + Send,
    {
        self.enter().await?;
        let updated = {
            let mut items = self.items.lock();
            let mut selected: Vec<Item> = ids
                .iter()
                .filter_map(|id| items.iter().find(|item| item.id == *id).cloned())
                .collect();
            mutate(&mut selected);

            let stamp = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
            for item in &mut selected {
                item.last_modified = item.last_modified.max(stamp);
                if let Some(slot) = items.iter_mut().find(|slot| slot.id == item.id) {
                    *slot = item.clone();
                }
            }
            selected
        };
        self.publish();
        Ok(updated)
    }

    async fn delete_items(&self, ids: &[ItemId]) -> HostResult<()> {
        self.enter().await?;
        self.items.lock().retain(|item| !ids.contains(&item.id));
        self.publish();
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<Item>> {
        self.changes.subscribe()
    }
}

/// Host backed by two [`MemoryItemStore`]s
#[derive(Debug)]
pub struct MemoryHost {
    shared: Arc<MemoryItemStore>,
    local: Arc<MemoryItemStore>,
    grid: RwLock<GridInfo>,
    snap_gate: Gate,
    interaction_gate: Gate,
}

impl MemoryHost {
    pub fn new(grid: GridInfo) -> Self {
        Self {
            shared: Arc::new(MemoryItemStore::new()),
            local: Arc::new(MemoryItemStore::new()),
            grid: RwLock::new(grid),
            snap_gate: Gate::new(),
            interaction_gate: Gate::new(),
        }
    }

    pub fn shared(&self) -> &Arc<MemoryItemStore> {
        &self.shared
    }

    pub fn local(&self) -> &Arc<MemoryItemStore> {
        &self.local
    }

    pub fn grid(&self) -> GridInfo {
        *self.grid.read()
    }

    pub fn set_grid(&self, grid: GridInfo) {
        *self.grid.write() = grid;
    }

    /// Held-back snapping
    pub fn snap_gate(&self) -> &Gate {
        &self.snap_gate
    }

    /// Held-back interaction setup
    pub fn interaction_gate(&self) -> &Gate {
        &self.interaction_gate
    }

    fn store(&self, store: StoreKind) -> &Arc<MemoryItemStore> {
        match store {
            StoreKind::Shared => &self.shared,
            StoreKind::Local => &self.local,
        }
    }
}

/// Center of the cell containing `position`
///
/// Every grid type snaps to square cells of `dpi` here.
pub fn snap_to_cell(position: DVec2, grid: &GridInfo) -> DVec2 {
    (position / grid.dpi).floor() * grid.dpi + DVec2::splat(grid.dpi / 2.0)
}

impl Host for MemoryHost {
    type Items = MemoryItemStore;
    type Interaction = MemoryInteraction;

    fn items(&self, store: StoreKind) -> &MemoryItemStore {
        self.store(store)
    }

    async fn snap_position(&self, position: DVec2) -> HostResult<DVec2> {
        self.snap_gate.pass().await;
        Ok(snap_to_cell(position, &self.grid()))
    }

    async fn start_interaction(
        &self,
        store: StoreKind,
        items: ControlItems,
    ) -> HostResult<MemoryInteraction> {
        self.interaction_gate.pass().await;
        let backing = self.store(store).clone();

        let added = match store {
            StoreKind::Shared => Vec::new(),
            StoreKind::Local => {
                let ids = items.ids();
                let existing: Vec<ItemId> = backing
                    .get_items(Some(ids.as_slice()))
                    .await?
                    .iter()
                    .map(|item| item.id)
                    .collect();
                let fresh: Vec<Item> = items
                    .iter()
                    .filter(|item| !existing.contains(&item.id))
                    .cloned()
                    .collect();
                let added = fresh.iter().map(|item| item.id).collect();
                backing.add_items(fresh).await?;
                added
            }
        };

        debug!("Started {:?} interaction over {} item(s)", store, items.ids().len());
        Ok(MemoryInteraction {
            inner: Arc::new(InteractionInner {
                kind: store,
                store: backing,
                draft: Mutex::new(Some(items)),
                added: Mutex::new(added),
            }),
        })
    }
}

#[derive(Debug)]
struct InteractionInner {
    kind: StoreKind,
    store: Arc<MemoryItemStore>,
    /// `None` once stopped
    draft: Mutex<Option<ControlItems>>,
    /// Items the local flavor put in its store
    added: Mutex<Vec<ItemId>>,
}

/// Interaction over one of the [`MemoryHost`] stores
///
/// The shared flavor keeps edits in a transient draft until
/// `keep_and_stop`. The local flavor writes every edit to the local store.
#[derive(Debug, Clone)]
pub struct MemoryInteraction {
    inner: Arc<InteractionInner>,
}

impl MemoryInteraction {
    pub fn store(&self) -> StoreKind {
        self.inner.kind
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.draft.lock().is_none()
    }

    /// Current draft items
    pub fn draft(&self) -> Option<ControlItems> {
        self.inner.draft.lock().clone()
    }

    fn stopped() -> HostError {
        HostError::Rejected("interaction already stopped".to_string())
    }

    fn deleted() -> HostError {
        HostError::Rejected("interaction items were deleted".to_string())
    }

    fn update_draft<F>(&self, mutate: F) -> HostResult<ControlItems>
    where
        F: FnOnce(&mut ControlItems),
    {
        let mut draft = self.inner.draft.lock();
        let items = draft.as_mut().ok_or_else(Self::stopped)?;
        mutate(items);
        Ok(items.clone())
    }

    async fn update_local<F>(&self, mutate: F) -> HostResult<ControlItems>
    where
        F: FnOnce(&mut ControlItems) + Send,
    {
        let ids = self.inner.draft.lock().as_ref().map(ControlItems::ids);
        let ids = ids.ok_or_else(Self::stopped)?;

        let mut edited = None;
        self.inner
            .store
            .update_items(&ids, |items| {
                if let Some(mut controls) = ControlItems::from_items(items.to_vec()) {
                    mutate(&mut controls);
                    for (slot, item) in items.iter_mut().zip(controls.iter()) {
                        *slot = item.clone();
                    }
                    edited = Some(controls);
                }
            })
            .await?;
        let edited = edited.ok_or_else(Self::deleted)?;

        // Line count changed: store the new lines and drop the surplus ones
        let fresh: Vec<Item> = edited
            .iter()
            .filter(|item| !ids.contains(&item.id))
            .cloned()
            .collect();
        let edited_ids = edited.ids();
        let dropped: Vec<ItemId> = ids
            .iter()
            .filter(|id| !edited_ids.contains(id))
            .copied()
            .collect();
        if !fresh.is_empty() {
            self.inner.added.lock().extend(fresh.iter().map(|item| item.id));
            self.inner.store.add_items(fresh).await?;
        }
        if !dropped.is_empty() {
            self.inner.added.lock().retain(|id| !dropped.contains(id));
            self.inner.store.delete_items(&dropped).await?;
        }

        let stored = self.inner.store.get_items(Some(edited_ids.as_slice())).await?;
        let controls = ControlItems::from_items(stored).ok_or_else(Self::deleted)?;
        let mut draft = self.inner.draft.lock();
        match draft.as_mut() {
            Some(current) => {
                *current = controls.clone();
                Ok(controls)
            }
            None => Err(Self::stopped()),
        }
    }
}

impl Interaction for MemoryInteraction {
    async fn update<F>(&self, mutate: F) -> HostResult<ControlItems>
    where
        F: FnOnce(&mut ControlItems) + Send,
    {
        match self.inner.kind {
            StoreKind::Shared => self.update_draft(mutate),
            StoreKind::Local => self.update_local(mutate).await,
        }
    }

    async fn keep_and_stop(&self, keep: Vec<Item>) -> HostResult<()> {
        let was_open = self.inner.draft.lock().take().is_some();
        if !was_open {
            return Ok(());
        }
        match self.inner.kind {
            StoreKind::Shared => {
                if !keep.is_empty() {
                    self.inner.store.add_items(keep).await?;
                }
            }
            StoreKind::Local => {
                let discard: Vec<ItemId> = self
                    .inner
                    .added
                    .lock()
                    .iter()
                    .filter(|id| !keep.iter().any(|item| item.id == **id))
                    .copied()
                    .collect();
                if !discard.is_empty() {
                    self.inner.store.delete_items(&discard).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sightline_core::GridType;

    fn grid() -> GridInfo {
        GridInfo::new(GridType::Square, 100.0)
    }

    #[tokio::test]
    async fn test_store_crud() {
        let store = MemoryItemStore::new();
        let a = Item::label("a");
        let b = Item::label("b");
        store.add_items(vec![a.clone(), b.clone()]).await.unwrap();

        let found = store.get_items(Some(&[b.id][..])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, b.id);

        let updated = store
            .update_items(&[a.id], |items| items[0].position = DVec2::ONE)
            .await
            .unwrap();
        assert_eq!(updated[0].position, DVec2::ONE);
        assert!(updated[0].last_modified > 0);

        store.delete_items(&[a.id, uuid::Uuid::new_v4()]).await.unwrap();
        assert_eq!(store.get_items(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = MemoryItemStore::new();
        let mut rx = store.subscribe();
        store.add_items(vec![Item::label("x")]).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let store = MemoryItemStore::new();
        store.fail_with(Some(HostError::Rejected("offline".into())));
        assert!(store.add_items(vec![Item::label("x")]).await.is_err());
        store.fail_with(None);
        assert!(store.add_items(vec![Item::label("x")]).await.is_ok());
    }

    #[tokio::test]
    async fn test_gate_holds_callers() {
        let gate = Gate::new();
        gate.close();
        assert!(!gate.is_open());

        let (passed, ()) = tokio::join!(
            async {
                gate.pass().await;
                true
            },
            async {
                for _ in 0..4 {
                    tokio::task::yield_now().await;
                }
                gate.open();
            }
        );
        assert!(passed);
    }

    #[test]
    fn test_snap_to_cell() {
        assert_eq!(snap_to_cell(DVec2::new(10.0, 190.0), &grid()), DVec2::new(50.0, 150.0));
        assert_eq!(snap_to_cell(DVec2::new(-10.0, 0.0), &grid()), DVec2::new(-50.0, 50.0));
    }

    #[tokio::test]
    async fn test_shared_interaction_commits_kept_items() {
        let host = MemoryHost::new(grid());
        let items = ControlItems::new(2);
        let interaction = host.start_interaction(StoreKind::Shared, items.clone()).await.unwrap();
        assert!(host.shared().is_empty());

        let updated = interaction
            .update(|items| items.label.position = DVec2::new(5.0, 5.0))
            .await
            .unwrap();
        assert_eq!(updated.label.position, DVec2::new(5.0, 5.0));

        interaction.keep_and_stop(updated.into_items()).await.unwrap();
        assert_eq!(host.shared().len(), 4);
        assert!(interaction.is_stopped());
        assert!(interaction.update(|_| {}).await.is_err());
    }

    #[tokio::test]
    async fn test_local_interaction_discards_unkept() {
        let host = MemoryHost::new(grid());
        let items = ControlItems::new(1);
        let interaction = host.start_interaction(StoreKind::Local, items.clone()).await.unwrap();
        assert_eq!(host.local().len(), 3);

        let updated = interaction
            .update(|items| items.highlight.position = DVec2::new(1.0, 2.0))
            .await
            .unwrap();
        assert_eq!(updated.highlight.position, DVec2::new(1.0, 2.0));
        assert_eq!(updated.ids(), items.ids());
        let stored = host.local().items();
        assert!(stored.iter().any(|i| i.position == DVec2::new(1.0, 2.0)));

        interaction.keep_and_stop(Vec::new()).await.unwrap();
        assert!(host.local().is_empty());
        interaction.keep_and_stop(Vec::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_interaction_follows_line_count() {
        let host = MemoryHost::new(grid());
        let interaction = host
            .start_interaction(StoreKind::Local, ControlItems::new(1))
            .await
            .unwrap();

        let grown = interaction
            .update(|items| items.lines.extend(ControlItems::new(3).lines))
            .await
            .unwrap();
        assert_eq!(grown.lines.len(), 4);
        assert_eq!(host.local().len(), 6);
        assert_eq!(interaction.draft().unwrap().ids(), grown.ids());

        let shrunk = interaction
            .update(|items| items.lines.truncate(2))
            .await
            .unwrap();
        assert_eq!(shrunk.lines.len(), 2);
        let stored: Vec<ItemId> = host.local().items().iter().map(|item| item.id).collect();
        assert_eq!(stored, shrunk.ids());

        interaction.keep_and_stop(Vec::new()).await.unwrap();
        assert!(host.local().is_empty());
    }
}
