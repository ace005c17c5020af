//! Line-of-sight drag tool
//!
//! Handlers take `&self`, so a new gesture can arrive while an older one is
//! still waiting on the host. Each suspending step holds cancel tokens from
//! the gesture and move sequences and checks them after every await; a
//! superseded step unwinds with [`DragError::Cancelled`], which the public
//! handlers swallow.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::DVec2;
use parking_lot::Mutex;
use sightline_core::{Item, ItemId, SceneCache, SceneSnapshot};
use tracing::{debug, info};

use crate::cancel::{CancelSequence, CancelToken, check_all};
use crate::cast::cast_to_cell;
use crate::control_items::{ControlItems, make_icon};
use crate::error::{DragError, DragResult, HostResult, finish_gesture};
use crate::host::{Host, Interaction, ItemApi, StoreKind};
use crate::mode_state::{ModeKind, ModeState, Teardown};
use crate::pin::{Pin, refresh_pin};
use crate::settings::{SharedSettings, SnapOrigin, ToolSettings};

/// Pointer position plus the item under it
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub position: DVec2,
    pub target: Option<Item>,
}

impl PointerEvent {
    pub fn at(position: DVec2) -> Self {
        Self {
            position,
            target: None,
        }
    }

    pub fn on(position: DVec2, target: Item) -> Self {
        Self {
            position,
            target: Some(target),
        }
    }
}

/// Fail with `Cancelled` if any token was superseded, else pass `result` on
fn settle<T>(result: HostResult<T>, tokens: &[&CancelToken]) -> DragResult<T> {
    check_all(tokens)?;
    Ok(result?)
}

/// Destination pin for a snapped pointer
fn resolve_end(scene: &SceneSnapshot, snapped: DVec2) -> Pin {
    match scene.characters.hit(snapped) {
        Some(shape) => Pin::on_shape(snapped, shape),
        None => Pin::Location(snapped),
    }
}

enum IconOp {
    Add(Item),
    Move(ItemId, DVec2),
    Delete(ItemId),
}

pub struct DragTool<H: Host> {
    host: Arc<H>,
    scene: Arc<SceneCache>,
    settings: SharedSettings,
    state: Mutex<ModeState<H::Interaction>>,
    gestures: CancelSequence,
    moves: CancelSequence,
    /// Number of the latest interaction update issued
    issued: AtomicU64,
    /// Newest update number applied so far
    shown: AtomicU64,
}

impl<H: Host> DragTool<H> {
    pub fn new(host: Arc<H>, scene: Arc<SceneCache>, settings: SharedSettings) -> Self {
        Self {
            host,
            scene,
            settings,
            state: Mutex::new(ModeState::Idle),
            gestures: CancelSequence::new(),
            moves: CancelSequence::new(),
            issued: AtomicU64::new(0),
            shown: AtomicU64::new(0),
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn scene(&self) -> &Arc<SceneCache> {
        &self.scene
    }

    pub fn mode(&self) -> ModeKind {
        self.state.lock().kind()
    }

    /// Start and end pins of the current or remembered drag
    pub fn pins(&self) -> Option<(Pin, Option<Pin>)> {
        self.state.lock().pins()
    }

    /// Indicator items of the drag in progress
    pub fn current_items(&self) -> Option<ControlItems> {
        match &*self.state.lock() {
            ModeState::Dragging {
                last_updated_items, ..
            } => Some(last_updated_items.clone()),
            _ => None,
        }
    }

    fn tool_settings(&self) -> ToolSettings {
        self.settings.read().settings().clone()
    }

    /// Redisplay the remembered drag, if any
    pub async fn activate(&self) -> DragResult<()> {
        finish_gesture(self.redisplay().await)
    }

    /// Take everything off screen, remembering the pins
    pub async fn deactivate(&self) -> DragResult<()> {
        self.gestures.cancel_all();
        self.moves.cancel_all();
        let teardown = {
            let mut state = self.state.lock();
            let (next, teardown) = std::mem::take(&mut *state).dismiss();
            *state = next;
            teardown
        };
        debug!("Tool deactivated");
        self.run_teardown(teardown).await
    }

    pub async fn drag_start(&self, event: PointerEvent) -> DragResult<()> {
        finish_gesture(self.start_drag(event).await)
    }

    pub async fn drag_move(&self, event: PointerEvent) -> DragResult<()> {
        finish_gesture(self.move_drag(event.position).await)
    }

    /// Finish the drag, keeping it on display unless hidden on stop
    pub async fn drag_end(&self, _event: PointerEvent) -> DragResult<()> {
        let keep = !self.tool_settings().hide_on_drag_stop;
        self.stop_drag(keep).await
    }

    pub async fn drag_cancel(&self) -> DragResult<()> {
        self.stop_drag(false).await
    }

    async fn stop_drag(&self, keep: bool) -> DragResult<()> {
        self.gestures.cancel_all();
        self.moves.cancel_all();
        let teardown = {
            let mut state = self.state.lock();
            let (next, teardown) = std::mem::take(&mut *state).stop(keep);
            *state = next;
            teardown
        };
        self.run_teardown(teardown).await
    }

    async fn run_teardown(&self, teardown: Teardown<H::Interaction>) -> DragResult<()> {
        if let Some((interaction, keep)) = teardown.stop {
            interaction.keep_and_stop(keep).await?;
        }
        if let Some((store, ids)) = teardown.display {
            if !ids.is_empty() {
                self.host.items(store).delete_items(&ids).await?;
            }
        }
        if !teardown.icons.is_empty() {
            self.host
                .items(StoreKind::Local)
                .delete_items(&teardown.icons)
                .await?;
        }
        Ok(())
    }

    async fn start_drag(&self, event: PointerEvent) -> DragResult<()> {
        let gesture = self.gestures.begin();
        self.moves.cancel_all();

        let start = Pin::from_pointer(event.position, event.target.as_ref());
        let start_icon = start.icon_position().map(make_icon);
        let teardown = {
            let mut state = self.state.lock();
            let (_, teardown) = std::mem::take(&mut *state).dismiss();
            *state = ModeState::InitializingDrag {
                start,
                start_icon_id: None,
                last_pointer: None,
            };
            teardown
        };
        debug!("Drag started at {:?}", start.location());

        self.run_teardown(teardown).await?;
        gesture.check()?;
        if let Some(icon) = start_icon {
            let id = icon.id;
            let added = self.host.items(StoreKind::Local).add_items(vec![icon]).await;
            if let Err(e) = added {
                gesture.check()?;
                return Err(e.into());
            }
            self.claim_icon(id, &[&gesture], |state| match state {
                ModeState::InitializingDrag { start_icon_id, .. } if start_icon_id.is_none() => {
                    *start_icon_id = Some(id);
                    true
                }
                _ => false,
            })
            .await?;
        }

        let settings = self.tool_settings();
        let store = StoreKind::from_private(settings.private);
        let snapped = settle(self.host.snap_position(event.position).await, &[&gesture])?;
        let origins = self.origins(&start, settings.snap_origin, &[&gesture]).await?;

        let scene = self.scene.snapshot();
        let end = resolve_end(&scene, snapped);
        let result = cast_to_cell(
            &scene,
            &origins,
            end.location(),
            settings.measure_to,
            start.token_id(),
            end.token_id(),
        );
        let items = ControlItems::build(&result, &scene.grid);

        let interaction = match self.host.start_interaction(store, items.clone()).await {
            Ok(interaction) => interaction,
            Err(e) => {
                gesture.check()?;
                return Err(e.into());
            }
        };

        let opened = {
            let mut state = self.state.lock();
            match std::mem::take(&mut *state) {
                ModeState::InitializingDrag {
                    start,
                    start_icon_id,
                    last_pointer,
                } if !gesture.is_cancelled() => {
                    *state = ModeState::Dragging {
                        start,
                        end,
                        displayed_end: end,
                        start_icon_id,
                        end_icon_id: None,
                        last_updated_items: items,
                        interaction,
                        store,
                    };
                    Ok(last_pointer)
                }
                other => {
                    *state = other;
                    Err(interaction)
                }
            }
        };

        let last_pointer = match opened {
            Ok(last_pointer) => last_pointer,
            Err(stale) => {
                debug!("Discarding interaction of a superseded drag");
                stale.keep_and_stop(Vec::new()).await?;
                return Err(DragError::Cancelled);
            }
        };
        info!("Dragging with {:?} indicator items", store);

        if let Some(pointer) = last_pointer {
            let step = self.moves.begin();
            self.update_drag(pointer, &gesture, &step).await?;
        }
        Ok(())
    }

    async fn move_drag(&self, position: DVec2) -> DragResult<()> {
        let step = self.moves.begin();
        let gesture = self.gestures.current();
        {
            let mut state = self.state.lock();
            match &mut *state {
                ModeState::InitializingDrag { last_pointer, .. } => {
                    *last_pointer = Some(position);
                    return Ok(());
                }
                ModeState::Dragging { .. } => {}
                _ => return Ok(()),
            }
        }
        self.update_drag(position, &gesture, &step).await
    }

    /// Re-cast towards `pointer` and push the result into the interaction
    async fn update_drag(
        &self,
        pointer: DVec2,
        gesture: &CancelToken,
        step: &CancelToken,
    ) -> DragResult<()> {
        let tokens = [gesture, step];
        let Some((start, current_end, displayed_end, interaction)) = self.state.lock().dragging()
        else {
            return Ok(());
        };

        let snapped = settle(self.host.snap_position(pointer).await, &tokens)?;
        let scene = self.scene.snapshot();
        let end = resolve_end(&scene, snapped);
        // A superseded update may have landed after the last commit
        if end.location() == current_end.location() && end.location() == displayed_end.location() {
            return Ok(());
        }

        let settings = self.tool_settings();
        let origins = self.origins(&start, settings.snap_origin, &tokens).await?;
        let result = cast_to_cell(
            &scene,
            &origins,
            end.location(),
            settings.measure_to,
            start.token_id(),
            end.token_id(),
        );

        self.fix_end_icon(&end, &tokens).await?;

        let issue = {
            let mut state = self.state.lock();
            check_all(&tokens)?;
            let ModeState::Dragging { displayed_end, .. } = &mut *state else {
                return Err(DragError::Cancelled);
            };
            *displayed_end = end;
            self.issued.fetch_add(1, Ordering::SeqCst) + 1
        };
        let shown = &self.shown;
        let grid = scene.grid;
        let updated = interaction
            .update(move |items| {
                // Updates landing out of order never overwrite a newer one
                if shown.fetch_max(issue, Ordering::SeqCst) < issue {
                    items.fix(&result, &grid);
                }
            })
            .await;
        let updated = settle(updated, &tokens)?;

        let mut state = self.state.lock();
        check_all(&tokens)?;
        if let ModeState::Dragging {
            end: current,
            last_updated_items,
            ..
        } = &mut *state
        {
            *current = end;
            *last_updated_items = updated;
        }
        Ok(())
    }

    /// Cast origins for `start` under the snapping setting
    async fn origins(
        &self,
        start: &Pin,
        snap: SnapOrigin,
        tokens: &[&CancelToken],
    ) -> DragResult<Vec<DVec2>> {
        let location = start.location();
        match snap {
            SnapOrigin::Disabled => Ok(vec![location]),
            SnapOrigin::Center => {
                let center = settle(self.host.snap_position(location).await, tokens)?;
                Ok(vec![center])
            }
            SnapOrigin::Corners => {
                let center = settle(self.host.snap_position(location).await, tokens)?;
                Ok(self.scene.snapshot().grid.corners(center))
            }
        }
    }

    /// Keep the end marker icon on the pinned token, if any
    async fn fix_end_icon(&self, end: &Pin, tokens: &[&CancelToken]) -> DragResult<()> {
        let op = {
            let mut state = self.state.lock();
            let ModeState::Dragging { end_icon_id, .. } = &mut *state else {
                return Ok(());
            };
            match (end.icon_position(), *end_icon_id) {
                (Some(position), Some(id)) => Some(IconOp::Move(id, position)),
                (Some(position), None) => Some(IconOp::Add(make_icon(position))),
                (None, Some(id)) => {
                    *end_icon_id = None;
                    Some(IconOp::Delete(id))
                }
                (None, None) => None,
            }
        };

        let local = self.host.items(StoreKind::Local);
        match op {
            Some(IconOp::Add(icon)) => {
                let id = icon.id;
                if let Err(e) = local.add_items(vec![icon]).await {
                    check_all(tokens)?;
                    return Err(e.into());
                }
                self.claim_icon(id, tokens, |state| match state {
                    ModeState::Dragging { end_icon_id, .. } if end_icon_id.is_none() => {
                        *end_icon_id = Some(id);
                        true
                    }
                    _ => false,
                })
                .await
            }
            Some(IconOp::Move(id, position)) => {
                let moved = local
                    .update_items(&[id], move |icons| {
                        for icon in icons {
                            icon.position = position;
                        }
                    })
                    .await;
                settle(moved, tokens).map(|_| ())
            }
            Some(IconOp::Delete(id)) => settle(local.delete_items(&[id]).await, tokens),
            None => Ok(()),
        }
    }

    /// Record a marker icon that just landed in the local store
    ///
    /// `claim` stores the id in the state. When the tokens were superseded
    /// or the state has moved on, the icon is deleted again instead.
    async fn claim_icon<F>(&self, id: ItemId, tokens: &[&CancelToken], claim: F) -> DragResult<()>
    where
        F: FnOnce(&mut ModeState<H::Interaction>) -> bool,
    {
        let claimed = {
            let mut state = self.state.lock();
            check_all(tokens).is_ok() && claim(&mut *state)
        };
        if claimed {
            return Ok(());
        }
        debug!("Removing marker icon of a superseded step");
        self.host.items(StoreKind::Local).delete_items(&[id]).await?;
        Err(DragError::Cancelled)
    }

    async fn redisplay(&self) -> DragResult<()> {
        let gesture = self.gestures.begin();
        let Some((start, end, was_private)) = self.state.lock().remembered() else {
            return Ok(());
        };

        let shared = self.host.items(StoreKind::Shared);
        let start = settle(refresh_pin(start, shared).await, &[&gesture])?;
        let end = settle(refresh_pin(end, shared).await, &[&gesture])?;

        let settings = self.tool_settings();
        let origins = self.origins(&start, settings.snap_origin, &[&gesture]).await?;
        let scene = self.scene.snapshot();
        let result = cast_to_cell(
            &scene,
            &origins,
            end.location(),
            settings.measure_to,
            start.token_id(),
            end.token_id(),
        );
        let items = ControlItems::build(&result, &scene.grid);
        let store = StoreKind::from_private(was_private);
        let start_icon = start.icon_position().map(make_icon);
        let end_icon = end.icon_position().map(make_icon);

        {
            let state = self.state.lock();
            gesture.check()?;
            if state.remembered().is_none() {
                return Err(DragError::Cancelled);
            }
        }

        let display_items = items.ids();
        let display = self.host.items(store);
        if let Err(e) = display.add_items(items.into_items()).await {
            gesture.check()?;
            return Err(e.into());
        }
        let start_icon_id = start_icon.as_ref().map(|icon| icon.id);
        let end_icon_id = end_icon.as_ref().map(|icon| icon.id);
        let icons: Vec<Item> = start_icon.into_iter().chain(end_icon).collect();
        let icon_ids: Vec<ItemId> = icons.iter().map(|icon| icon.id).collect();
        let local = self.host.items(StoreKind::Local);
        if !icons.is_empty() {
            if let Err(e) = local.add_items(icons).await {
                display.delete_items(&display_items).await?;
                gesture.check()?;
                return Err(e.into());
            }
        }

        let committed = {
            let mut state = self.state.lock();
            let current = !gesture.is_cancelled() && state.remembered().is_some();
            if current {
                *state = ModeState::DisplayingPreviousDrag {
                    start,
                    end,
                    start_icon_id,
                    end_icon_id,
                    display_items: display_items.clone(),
                    store,
                };
            }
            current
        };
        if committed {
            debug!("Redisplaying previous drag");
            return Ok(());
        }

        debug!("Removing items of a superseded redisplay");
        display.delete_items(&display_items).await?;
        if !icon_ids.is_empty() {
            local.delete_items(&icon_ids).await?;
        }
        Err(DragError::Cancelled)
    }
}
