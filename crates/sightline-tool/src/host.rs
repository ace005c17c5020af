//! Host collaborator contracts
//!
//! The tool never talks to a scene directly. It goes through these traits:
//! two item stores of identical shape (shared and local), an interaction
//! transaction that batches indicator edits, and the grid snapping service.

use std::future::Future;

use glam::DVec2;
use sightline_core::{Item, ItemId};
use tokio::sync::broadcast;

use crate::control_items::ControlItems;
use crate::error::HostResult;

/// Which item store a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    /// Networked scene visible to every player
    Shared,
    /// Items only this player sees
    Local,
}

impl StoreKind {
    pub fn from_private(private: bool) -> Self {
        if private {
            StoreKind::Local
        } else {
            StoreKind::Shared
        }
    }

    pub fn is_private(&self) -> bool {
        *self == StoreKind::Local
    }
}

/// Asynchronous item CRUD
pub trait ItemApi: Send + Sync + 'static {
    /// Items with the given ids, or every item when `ids` is `None`
    fn get_items(
        &self,
        ids: Option<&[ItemId]>,
    ) -> impl Future<Output = HostResult<Vec<Item>>> + Send;

    fn add_items(&self, items: Vec<Item>) -> impl Future<Output = HostResult<()>> + Send;

    /// Apply `mutate` to the matching items and return them
    fn update_items<F>(
        &self,
        ids: &[ItemId],
        mutate: F,
    ) -> impl Future<Output = HostResult<Vec<Item>>> + Send
    where
        F: FnOnce(&mut [Item]) + Send;

    /// Unknown ids are ignored
    fn delete_items(&self, ids: &[ItemId]) -> impl Future<Output = HostResult<()>> + Send;

    /// Full item list after every change; dropping the receiver unsubscribes
    fn subscribe(&self) -> broadcast::Receiver<Vec<Item>>;
}

/// An open transaction over the indicator items
///
/// Clones are handles to the same transaction.
pub trait Interaction: Clone + Send + Sync + 'static {
    /// Apply a draft mutation and return the committed items
    fn update<F>(&self, mutate: F) -> impl Future<Output = HostResult<ControlItems>> + Send
    where
        F: FnOnce(&mut ControlItems) + Send;

    /// End the transaction, persisting `keep` and discarding everything else
    fn keep_and_stop(&self, keep: Vec<Item>) -> impl Future<Output = HostResult<()>> + Send;
}

/// Everything the drag tool needs from its environment
pub trait Host: Send + Sync + 'static {
    type Items: ItemApi;
    type Interaction: Interaction;

    fn items(&self, store: StoreKind) -> &Self::Items;

    /// Snap a point to the center of its grid cell
    fn snap_position(&self, position: DVec2) -> impl Future<Output = HostResult<DVec2>> + Send;

    /// Open an interaction over `items` backed by `store`
    fn start_interaction(
        &self,
        store: StoreKind,
        items: ControlItems,
    ) -> impl Future<Output = HostResult<Self::Interaction>> + Send;
}
