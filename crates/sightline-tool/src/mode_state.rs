//! Drag tool mode state
//!
//! Transitions are pure: each consumes the state and returns the next one
//! plus a [`Teardown`] listing the host calls that release what the old
//! state owned. Callers swap the state under a lock and run the teardown
//! after releasing it.

use sightline_core::{Item, ItemId};

use crate::control_items::ControlItems;
use crate::host::StoreKind;
use crate::pin::Pin;

/// Drag tool state, generic over the host's interaction handle
#[derive(Debug, Clone)]
pub enum ModeState<I> {
    /// Nothing to show
    Idle,
    /// Pins of the last drag, kept to redisplay it on activation
    RememberingPreviousDrag {
        start: Pin,
        end: Pin,
        was_private: bool,
    },
    /// A finished drag whose indicator items stay in a store
    DisplayingPreviousDrag {
        start: Pin,
        end: Pin,
        start_icon_id: Option<ItemId>,
        end_icon_id: Option<ItemId>,
        display_items: Vec<ItemId>,
        store: StoreKind,
    },
    /// Drag started, interaction not yet open
    InitializingDrag {
        start: Pin,
        start_icon_id: Option<ItemId>,
        /// Latest pointer seen while initializing
        last_pointer: Option<glam::DVec2>,
    },
    Dragging {
        start: Pin,
        end: Pin,
        /// End of the latest update handed to the interaction
        displayed_end: Pin,
        start_icon_id: Option<ItemId>,
        end_icon_id: Option<ItemId>,
        last_updated_items: ControlItems,
        interaction: I,
        /// Store the items persist to when kept
        store: StoreKind,
    },
}

impl<I> Default for ModeState<I> {
    fn default() -> Self {
        ModeState::Idle
    }
}

/// Discriminant of [`ModeState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeKind {
    Idle,
    RememberingPreviousDrag,
    DisplayingPreviousDrag,
    InitializingDrag,
    Dragging,
}

/// Host calls owed by a transition
#[derive(Debug)]
pub struct Teardown<I> {
    /// Interaction to stop and the items it keeps
    pub stop: Option<(I, Vec<Item>)>,
    /// Displayed items to delete and their store
    pub display: Option<(StoreKind, Vec<ItemId>)>,
    /// Marker icons to delete from the local store
    pub icons: Vec<ItemId>,
}

impl<I> Default for Teardown<I> {
    fn default() -> Self {
        Self {
            stop: None,
            display: None,
            icons: Vec::new(),
        }
    }
}

impl<I> Teardown<I> {
    pub fn is_empty(&self) -> bool {
        self.stop.is_none() && self.display.is_none() && self.icons.is_empty()
    }

    fn icons(start: Option<ItemId>, end: Option<ItemId>) -> Self {
        Self {
            icons: start.into_iter().chain(end).collect(),
            ..Self::default()
        }
    }
}

impl<I: Clone> ModeState<I> {
    pub fn kind(&self) -> ModeKind {
        match self {
            ModeState::Idle => ModeKind::Idle,
            ModeState::RememberingPreviousDrag { .. } => ModeKind::RememberingPreviousDrag,
            ModeState::DisplayingPreviousDrag { .. } => ModeKind::DisplayingPreviousDrag,
            ModeState::InitializingDrag { .. } => ModeKind::InitializingDrag,
            ModeState::Dragging { .. } => ModeKind::Dragging,
        }
    }

    /// Start and end pins, if any
    pub fn pins(&self) -> Option<(Pin, Option<Pin>)> {
        match self {
            ModeState::Idle => None,
            ModeState::RememberingPreviousDrag { start, end, .. }
            | ModeState::DisplayingPreviousDrag { start, end, .. }
            | ModeState::Dragging { start, end, .. } => Some((*start, Some(*end))),
            ModeState::InitializingDrag { start, .. } => Some((*start, None)),
        }
    }

    /// Pins to redisplay, if remembering
    pub fn remembered(&self) -> Option<(Pin, Pin, bool)> {
        match self {
            ModeState::RememberingPreviousDrag {
                start,
                end,
                was_private,
            } => Some((*start, *end, *was_private)),
            _ => None,
        }
    }

    /// Start pin, committed and displayed end pins and interaction, if dragging
    pub fn dragging(&self) -> Option<(Pin, Pin, Pin, I)> {
        match self {
            ModeState::Dragging {
                start,
                end,
                displayed_end,
                interaction,
                ..
            } => Some((*start, *end, *displayed_end, interaction.clone())),
            _ => None,
        }
    }

    /// Release everything on screen, keeping the pins where possible
    ///
    /// Displayed and in-progress drags fall back to remembering their pins.
    /// An initializing drag has no end pin and goes idle.
    pub fn dismiss(self) -> (Self, Teardown<I>) {
        match self {
            ModeState::DisplayingPreviousDrag {
                start,
                end,
                start_icon_id,
                end_icon_id,
                display_items,
                store,
            } => (
                ModeState::RememberingPreviousDrag {
                    start,
                    end,
                    was_private: store.is_private(),
                },
                Teardown {
                    display: Some((store, display_items)),
                    ..Teardown::icons(start_icon_id, end_icon_id)
                },
            ),
            ModeState::Dragging {
                start,
                end,
                start_icon_id,
                end_icon_id,
                interaction,
                store,
                ..
            } => (
                ModeState::RememberingPreviousDrag {
                    start,
                    end,
                    was_private: store.is_private(),
                },
                Teardown {
                    stop: Some((interaction, Vec::new())),
                    ..Teardown::icons(start_icon_id, end_icon_id)
                },
            ),
            ModeState::InitializingDrag { start_icon_id, .. } => {
                (ModeState::Idle, Teardown::icons(start_icon_id, None))
            }
            other => (other, Teardown::default()),
        }
    }

    /// Finish the gesture in progress
    ///
    /// A kept drag moves its items into the store and stays on display.
    /// Otherwise everything is released and the tool goes idle.
    pub fn stop(self, keep: bool) -> (Self, Teardown<I>) {
        match self {
            ModeState::Dragging {
                start,
                end,
                start_icon_id,
                end_icon_id,
                last_updated_items,
                interaction,
                store,
                ..
            } if keep => (
                ModeState::DisplayingPreviousDrag {
                    start,
                    end,
                    start_icon_id,
                    end_icon_id,
                    display_items: last_updated_items.ids(),
                    store,
                },
                Teardown {
                    stop: Some((interaction, last_updated_items.into_items())),
                    ..Teardown::default()
                },
            ),
            ModeState::Dragging {
                start_icon_id,
                end_icon_id,
                interaction,
                ..
            } => (
                ModeState::Idle,
                Teardown {
                    stop: Some((interaction, Vec::new())),
                    ..Teardown::icons(start_icon_id, end_icon_id)
                },
            ),
            ModeState::InitializingDrag { start_icon_id, .. } => {
                (ModeState::Idle, Teardown::icons(start_icon_id, None))
            }
            other => (other, Teardown::default()),
        }
    }
}
