//! Derived State Cache
//!
//! Turns raw scene item batches into the read-only [`SceneSnapshot`] the
//! raycaster works on. Each derived view is recomputed only when its inputs
//! changed and is shared by `Arc` otherwise, so callers can compare
//! snapshots with [`Arc::ptr_eq`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use glam::{DAffine2, DVec2};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::geometry::{
    GeometryError, RaycastGeometry, close_ring, extract_world_geometry, wall_world_points,
};
use crate::grid::GridInfo;
use crate::obstruction::{classify_obstruction, is_wall};
use crate::room::RoomMetadata;
use crate::types::{Bounds, Item, ItemId, ItemKind};

/// Identity of the wall set a [`DerivedWalls`] was built from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WallFingerprint {
    pub last_modified: u64,
    pub ids: BTreeSet<ItemId>,
}

impl WallFingerprint {
    pub fn of(walls: &[&Item]) -> Self {
        Self {
            last_modified: walls.iter().map(|w| w.last_modified).max().unwrap_or(0),
            ids: walls.iter().map(|w| w.id).collect(),
        }
    }

    /// Whether `next` requires a rebuild
    pub fn is_stale(&self, next: &WallFingerprint) -> bool {
        next.last_modified > self.last_modified || next.ids != self.ids
    }
}

/// World-space wall polylines, always fully solid
#[derive(Debug, Clone, Default)]
pub struct DerivedWalls {
    pub fingerprint: WallFingerprint,
    pub rings: Vec<Vec<DVec2>>,
}

impl DerivedWalls {
    pub fn from_rings(rings: Vec<Vec<DVec2>>) -> Self {
        Self {
            fingerprint: WallFingerprint::default(),
            rings,
        }
    }
}

/// One configured obstruction
#[derive(Debug, Clone, PartialEq)]
pub struct CoverEntry {
    pub last_modified: u64,
    pub solidity: f64,
    pub geometry: RaycastGeometry,
}

impl CoverEntry {
    pub fn new(solidity: f64, geometry: RaycastGeometry) -> Self {
        Self {
            last_modified: 0,
            solidity,
            geometry,
        }
    }
}

/// Configured obstructions by source item id
pub type PartialCover = HashMap<ItemId, CoverEntry>;

/// `(last_modified, solidity)` of obstructions whose geometry was rejected
type RejectedCover = HashMap<ItemId, (u64, f64)>;

/// World footprint of a character token
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterShape {
    pub id: ItemId,
    /// Token item position
    pub position: DVec2,
    /// Closed world ring
    pub ring: Vec<DVec2>,
    pub bounds: Bounds,
}

impl CharacterShape {
    pub fn center(&self) -> DVec2 {
        self.bounds.center()
    }
}

/// Character footprints and the inputs they were built from
#[derive(Debug, Clone, Default)]
pub struct CharacterShapes {
    fingerprint: Vec<(ItemId, u64)>,
    dpi: f64,
    pub shapes: Vec<CharacterShape>,
}

impl CharacterShapes {
    pub fn from_shapes(shapes: Vec<CharacterShape>) -> Self {
        Self {
            fingerprint: Vec::new(),
            dpi: 0.0,
            shapes,
        }
    }

    /// First token footprint containing `point`
    pub fn hit(&self, point: DVec2) -> Option<&CharacterShape> {
        self.shapes.iter().find(|s| s.bounds.contains(point))
    }
}

/// Everything the raycaster reads, replaced as a whole
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub walls: Arc<DerivedWalls>,
    pub partial_cover: Arc<PartialCover>,
    pub characters: Arc<CharacterShapes>,
    pub room: Arc<RoomMetadata>,
    pub grid: GridInfo,
}

/// What an update changed
#[derive(Debug, Default)]
pub struct CacheReport {
    pub walls_recomputed: bool,
    pub cover_changed: bool,
    pub characters_recomputed: bool,
    /// Items skipped because their geometry is unusable
    pub rejected: Vec<GeometryError>,
}

impl CacheReport {
    pub fn changed(&self) -> bool {
        self.walls_recomputed || self.cover_changed || self.characters_recomputed
    }
}

/// Session-owned cache of derived scene state
#[derive(Debug, Default)]
pub struct SceneCache {
    snapshot: RwLock<Arc<SceneSnapshot>>,
    /// Only locked while `snapshot` is write-locked
    rejected_cover: Mutex<RejectedCover>,
}

impl SceneCache {
    pub fn new(grid: GridInfo, room: RoomMetadata) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(SceneSnapshot {
                grid,
                room: Arc::new(room),
                ..Default::default()
            })),
            rejected_cover: Mutex::new(RejectedCover::new()),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<SceneSnapshot> {
        self.snapshot.read().clone()
    }

    /// Ingest a full scene item batch
    pub fn update_items(&self, items: &[Item]) -> CacheReport {
        let mut guard = self.snapshot.write();
        let current = guard.clone();
        let mut report = CacheReport::default();

        let walls = derive_walls(&current.walls, items, &mut report);
        let partial_cover = derive_partial_cover(
            &current.partial_cover,
            &mut self.rejected_cover.lock(),
            items,
            &mut report,
        );
        let characters =
            derive_characters(&current.characters, items, current.grid.dpi, &mut report);

        if report.changed() {
            *guard = Arc::new(SceneSnapshot {
                walls,
                partial_cover,
                characters,
                room: current.room.clone(),
                grid: current.grid,
            });
        }
        report
    }

    /// Ingest a grid change, rebuilding token footprints from `items`
    pub fn set_grid(&self, grid: GridInfo, items: &[Item]) {
        let mut guard = self.snapshot.write();
        let current = guard.clone();
        let mut report = CacheReport::default();
        let characters = derive_characters(&current.characters, items, grid.dpi, &mut report);
        *guard = Arc::new(SceneSnapshot {
            characters,
            grid,
            ..(*current).clone()
        });
    }

    pub fn set_room(&self, room: RoomMetadata) {
        let mut guard = self.snapshot.write();
        let current = guard.clone();
        *guard = Arc::new(SceneSnapshot {
            room: Arc::new(room),
            ..(*current).clone()
        });
    }
}

fn derive_walls(
    current: &Arc<DerivedWalls>,
    items: &[Item],
    report: &mut CacheReport,
) -> Arc<DerivedWalls> {
    let walls: Vec<&Item> = items.iter().filter(|i| is_wall(i)).collect();
    let fingerprint = WallFingerprint::of(&walls);
    if !current.fingerprint.is_stale(&fingerprint) {
        return current.clone();
    }

    let mut rings = Vec::with_capacity(walls.len());
    for wall in walls {
        match wall_world_points(wall) {
            Ok(points) => rings.push(points),
            Err(e) => {
                warn!("Rejecting wall: {}", e);
                report.rejected.push(e);
            }
        }
    }
    debug!("Rebuilt {} wall ring(s)", rings.len());
    report.walls_recomputed = true;
    Arc::new(DerivedWalls { fingerprint, rings })
}

/// Rebuild the obstruction map if any obstruction was added, edited or removed
///
/// Obstructions rejected earlier are skipped until they are edited, so an
/// unchanged batch neither rebuilds nor reports them again.
fn derive_partial_cover(
    current: &Arc<PartialCover>,
    rejected: &mut RejectedCover,
    items: &[Item],
    report: &mut CacheReport,
) -> Arc<PartialCover> {
    let mut next = PartialCover::new();
    let mut next_rejected = RejectedCover::new();
    let mut changed = false;

    for obstruction in items.iter().filter_map(classify_obstruction) {
        let item = obstruction.item;
        let stamp = (item.last_modified, obstruction.solidity);
        if let Some(entry) = current.get(&item.id)
            && (entry.last_modified, entry.solidity) == stamp
        {
            next.insert(item.id, entry.clone());
            continue;
        }
        if rejected.get(&item.id) == Some(&stamp) {
            next_rejected.insert(item.id, stamp);
            continue;
        }
        changed = true;
        match extract_world_geometry(item) {
            Ok(geometry) => {
                next.insert(
                    item.id,
                    CoverEntry {
                        last_modified: item.last_modified,
                        solidity: obstruction.solidity,
                        geometry,
                    },
                );
            }
            Err(e) => {
                warn!("Rejecting cover: {}", e);
                report.rejected.push(e);
                next_rejected.insert(item.id, stamp);
            }
        }
    }
    *rejected = next_rejected;

    if !changed && next.len() == current.len() {
        return current.clone();
    }
    debug!("Rebuilt partial cover with {} entries", next.len());
    report.cover_changed = true;
    Arc::new(next)
}

fn derive_characters(
    current: &Arc<CharacterShapes>,
    items: &[Item],
    dpi: f64,
    report: &mut CacheReport,
) -> Arc<CharacterShapes> {
    let tokens: Vec<&Item> = items.iter().filter(|i| i.is_token()).collect();
    let fingerprint: Vec<(ItemId, u64)> = tokens.iter().map(|t| (t.id, t.last_modified)).collect();
    if fingerprint == current.fingerprint && dpi == current.dpi {
        return current.clone();
    }

    let shapes: Vec<CharacterShape> = tokens
        .into_iter()
        .filter_map(|token| character_shape(token, dpi))
        .collect();
    debug!("Rebuilt {} character shape(s)", shapes.len());
    report.characters_recomputed = true;
    Arc::new(CharacterShapes {
        fingerprint,
        dpi,
        shapes,
    })
}

/// World footprint of a token image scaled onto a grid of `grid_dpi`
pub fn character_shape(item: &Item, grid_dpi: f64) -> Option<CharacterShape> {
    let ItemKind::Image { content, grid } = &item.kind else {
        return None;
    };
    if grid.dpi <= 0.0 {
        return None;
    }
    let dpi_scaling = grid_dpi / grid.dpi;
    let (w, h) = (content.width, content.height);

    // Square images are assumed round and keep a cell-aligned box
    let rotation = if w == h { 0.0 } else { item.rotation.to_radians() };
    let transform = DAffine2::from_scale_angle_translation(item.scale, rotation, item.position);

    let mut ring: Vec<DVec2> = [
        DVec2::ZERO,
        DVec2::new(0.0, h),
        DVec2::new(w, h),
        DVec2::new(w, 0.0),
    ]
    .iter()
    .map(|p| transform.transform_point2((*p - grid.offset) * dpi_scaling))
    .collect();
    let bounds = Bounds::from_points(&ring)?;
    close_ring(&mut ring);

    Some(CharacterShape {
        id: item.id,
        position: item.position,
        ring,
        bounds,
    })
}
