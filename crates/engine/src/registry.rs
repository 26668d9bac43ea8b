use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DoorwayConfig;
use crate::content::{catalog_fingerprint, ExitDescriptor, OverrideTable, SceneCatalog, SceneDef};
use crate::doorway::{Direction, Doorway, DoorwayKind, DoorwayState, WallSide};
use crate::geometry::GridPos;
use crate::scene::{SceneId, SceneManager};
use crate::spatial::{DoorwayRef, SpatialIndex};

const DEFAULT_WALL_POSITION: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingDirection,
    UnknownDirection(String),
    MissingTarget,
    UnknownKind(String),
    MissingFloorPosition,
    NonFinitePosition,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDirection => f.write_str("missing direction"),
            Self::UnknownDirection(raw) => write!(f, "unknown direction '{raw}'"),
            Self::MissingTarget => f.write_str("missing target scene"),
            Self::UnknownKind(raw) => write!(f, "unknown doorway kind '{raw}'"),
            Self::MissingFloorPosition => {
                f.write_str("floor portal needs gridX and gridY or an override")
            }
            Self::NonFinitePosition => f.write_str("resolved grid position is not finite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedExit {
    pub scene: SceneId,
    pub index: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub scenes: usize,
    pub doorways: usize,
    pub overridden: usize,
    /// Doorways sharing a wall side and grid position with an earlier doorway of the same scene.
    pub duplicate_placements: usize,
    pub skipped: Vec<SkippedExit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoorwayDebugEntry {
    pub slot: usize,
    pub direction: Direction,
    pub target: SceneId,
    pub kind: DoorwayKind,
    pub wall_side: WallSide,
    pub grid: GridPos,
    pub state: DoorwayState,
    pub close_deadline: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoorwayDebugSnapshot {
    pub scene: SceneId,
    pub transition_cooldown: f32,
    pub doorways: Vec<DoorwayDebugEntry>,
}

/// Builds every scene's doorways from the catalog and drives them each frame.
///
/// The transition cooldown is shared by all doorways, so at most one scene load
/// is requested per cooldown window no matter how many portals the player touches.
#[derive(Debug)]
pub struct DoorwayRegistry {
    config: DoorwayConfig,
    overrides: OverrideTable,
    doorways_by_scene: BTreeMap<SceneId, Vec<Doorway>>,
    transition_cooldown: f32,
    catalog_fingerprint: Option<String>,
}

impl Default for DoorwayRegistry {
    fn default() -> Self {
        Self::new(DoorwayConfig::default())
    }
}

impl DoorwayRegistry {
    pub fn new(config: DoorwayConfig) -> Self {
        Self::with_overrides(config, OverrideTable::authored())
    }

    pub fn with_overrides(config: DoorwayConfig, overrides: OverrideTable) -> Self {
        Self {
            config,
            overrides,
            doorways_by_scene: BTreeMap::new(),
            transition_cooldown: 0.0,
            catalog_fingerprint: None,
        }
    }

    pub fn config(&self) -> &DoorwayConfig {
        &self.config
    }

    /// Rebuilds every scene from `catalog`, replacing whatever was built before.
    pub fn initialize(
        &mut self,
        catalog: &SceneCatalog,
        spatial_index: &mut dyn SpatialIndex,
    ) -> BuildReport {
        let overrides = self.overrides.with_catalog_entries(catalog);
        let mut report = BuildReport::default();
        for scene_id in self.doorways_by_scene.keys() {
            spatial_index.remove_scene(scene_id);
        }
        for scene_id in catalog.scene_ids() {
            spatial_index.remove_scene(scene_id);
        }
        self.doorways_by_scene.clear();

        for scene in &catalog.scenes {
            let doorways = self.build_scene(scene, &overrides, spatial_index, &mut report);
            self.doorways_by_scene.insert(scene.id.clone(), doorways);
        }

        let fingerprint = catalog_fingerprint(catalog);
        info!(
            scenes = report.scenes,
            doorways = report.doorways,
            overridden = report.overridden,
            skipped = report.skipped.len(),
            fingerprint = %fingerprint,
            "doorway_registry_built"
        );
        self.catalog_fingerprint = Some(fingerprint);
        report
    }

    /// Rebuilds one scene's doorways, leaving the others untouched.
    pub fn initialize_scene(
        &mut self,
        scene_id: &str,
        catalog: &SceneCatalog,
        spatial_index: &mut dyn SpatialIndex,
    ) -> BuildReport {
        let mut report = BuildReport::default();
        let Some(scene) = catalog.scene(scene_id) else {
            warn!(scene = scene_id, "doorway_scene_missing_from_catalog");
            return report;
        };
        let overrides = self.overrides.with_catalog_entries(catalog);
        spatial_index.remove_scene(&scene.id);
        let doorways = self.build_scene(scene, &overrides, spatial_index, &mut report);
        self.doorways_by_scene.insert(scene.id.clone(), doorways);
        debug!(
            scene = scene_id,
            doorways = report.doorways,
            skipped = report.skipped.len(),
            "doorway_scene_rebuilt"
        );
        report
    }

    fn build_scene(
        &self,
        scene: &SceneDef,
        overrides: &OverrideTable,
        spatial_index: &mut dyn SpatialIndex,
        report: &mut BuildReport,
    ) -> Vec<Doorway> {
        report.scenes += 1;
        let mut doorways = Vec::<Doorway>::with_capacity(scene.exits.len());
        let mut placements = HashSet::<(WallSide, u32, u32)>::new();

        for (index, exit) in scene.exits.iter().enumerate() {
            let (doorway, overridden) = match build_doorway(scene, exit, overrides, &self.config) {
                Ok(built) => built,
                Err(reason) => {
                    warn!(
                        scene = %scene.id,
                        index,
                        reason = %reason,
                        "doorway_descriptor_skipped"
                    );
                    report.skipped.push(SkippedExit {
                        scene: scene.id.clone(),
                        index,
                        reason,
                    });
                    continue;
                }
            };

            let grid = doorway.grid();
            if !placements.insert((doorway.wall_side(), grid.x.to_bits(), grid.y.to_bits())) {
                warn!(
                    scene = %scene.id,
                    index,
                    grid_x = grid.x,
                    grid_y = grid.y,
                    "doorway_placement_duplicate"
                );
                report.duplicate_placements += 1;
            }

            let handle = DoorwayRef {
                scene: scene.id.clone(),
                slot: doorways.len(),
            };
            doorway.register_in_index(handle, &self.config.projection, spatial_index);
            if overridden {
                report.overridden += 1;
            }
            report.doorways += 1;
            doorways.push(doorway);
        }

        doorways
    }

    /// Advances the cooldown and every doorway of `current_scene_id`, and asks the
    /// scene manager for a load when the player stands on a floor portal.
    /// Returns the scene that was requested this frame, if any.
    pub fn update(
        &mut self,
        delta_seconds: f32,
        player_grid_x: f32,
        player_grid_y: f32,
        current_scene_id: &str,
        scene_manager: &mut dyn SceneManager,
    ) -> Option<SceneId> {
        let delta_seconds = if delta_seconds.is_finite() {
            delta_seconds.max(0.0)
        } else {
            0.0
        };
        self.transition_cooldown = (self.transition_cooldown - delta_seconds).max(0.0);

        let doorways = self.doorways_by_scene.get_mut(current_scene_id)?;
        let mut requested = None;
        for (slot, doorway) in doorways.iter_mut().enumerate() {
            let is_near = doorway.is_player_colliding(player_grid_x, player_grid_y);
            if let Some(event) = doorway.update_state(delta_seconds, is_near) {
                debug!(
                    scene = current_scene_id,
                    slot,
                    target = %doorway.target_scene(),
                    event = ?event,
                    "doorway_state_changed"
                );
            }

            // Wall doorways only animate; floor portals are the only transition trigger.
            if is_near
                && doorway.kind() == DoorwayKind::FloorPortal
                && self.transition_cooldown <= 0.0
            {
                info!(
                    scene = current_scene_id,
                    slot,
                    target = %doorway.target_scene(),
                    "scene_transition_requested"
                );
                scene_manager.load_scene(doorway.target_scene());
                self.transition_cooldown = self.config.transition_cooldown_seconds;
                requested = Some(doorway.target_scene().clone());
            }
        }
        requested
    }

    pub fn get_active_doorways(&self, scene_id: &str) -> &[Doorway] {
        self.doorways_by_scene
            .get(scene_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn transition_cooldown(&self) -> f32 {
        self.transition_cooldown
    }

    pub fn catalog_fingerprint(&self) -> Option<&str> {
        self.catalog_fingerprint.as_deref()
    }

    pub fn scene_count(&self) -> usize {
        self.doorways_by_scene.len()
    }

    pub fn doorway_count(&self) -> usize {
        self.doorways_by_scene.values().map(Vec::len).sum()
    }

    /// Where a player arriving in `target_scene` from `from_scene` should stand:
    /// just inside the doorway that leads back, clear of its trigger radius.
    pub fn arrival_point(&self, target_scene: &str, from_scene: &str) -> Option<GridPos> {
        let doorway = self
            .get_active_doorways(target_scene)
            .iter()
            .find(|doorway| doorway.target_scene().as_str() == from_scene)?;
        let inward = match doorway.kind() {
            DoorwayKind::WallDoorway => match doorway.wall_side() {
                WallSide::North => GridPos::new(0.0, 1.0),
                WallSide::West => GridPos::new(1.0, 0.0),
            },
            DoorwayKind::FloorPortal => {
                let outward = doorway.direction().outward();
                GridPos::new(-outward.x, -outward.y)
            }
        };
        let grid = doorway.grid();
        let offset = self.config.arrival_offset;
        Some(GridPos::new(
            grid.x + inward.x * offset,
            grid.y + inward.y * offset,
        ))
    }

    pub fn debug_snapshot(&self, scene_id: &str) -> DoorwayDebugSnapshot {
        DoorwayDebugSnapshot {
            scene: SceneId::from(scene_id),
            transition_cooldown: self.transition_cooldown,
            doorways: self
                .get_active_doorways(scene_id)
                .iter()
                .enumerate()
                .map(|(slot, doorway)| DoorwayDebugEntry {
                    slot,
                    direction: doorway.direction(),
                    target: doorway.target_scene().clone(),
                    kind: doorway.kind(),
                    wall_side: doorway.wall_side(),
                    grid: doorway.grid(),
                    state: doorway.state(),
                    close_deadline: doorway.close_deadline(),
                })
                .collect(),
        }
    }
}

fn build_doorway(
    scene: &SceneDef,
    exit: &ExitDescriptor,
    overrides: &OverrideTable,
    config: &DoorwayConfig,
) -> Result<(Doorway, bool), SkipReason> {
    let raw_direction = exit
        .direction
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or(SkipReason::MissingDirection)?;
    let direction = Direction::parse(raw_direction)
        .ok_or_else(|| SkipReason::UnknownDirection(raw_direction.to_string()))?;
    let target = exit
        .target_scene_id
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or(SkipReason::MissingTarget)?;

    let kind = match exit.kind.as_deref() {
        Some(raw) => {
            DoorwayKind::parse(raw).ok_or_else(|| SkipReason::UnknownKind(raw.to_string()))?
        }
        None if exit.grid_x.is_some() && exit.grid_y.is_some() => DoorwayKind::FloorPortal,
        None => DoorwayKind::WallDoorway,
    };

    let overridden = overrides.lookup(scene.id.as_str(), direction);
    let grid = match (overridden, exit.grid_x, exit.grid_y) {
        (Some(grid), _, _) => grid,
        (None, Some(x), Some(y)) => GridPos::new(x, y),
        (None, _, _) if kind == DoorwayKind::FloorPortal => {
            return Err(SkipReason::MissingFloorPosition)
        }
        (None, _, _) => wall_grid(
            direction.wall_side(),
            exit.position.unwrap_or(DEFAULT_WALL_POSITION),
            scene,
        ),
    };
    if !grid.is_finite() {
        return Err(SkipReason::NonFinitePosition);
    }

    let doorway = Doorway::new(direction, SceneId::from(target), kind, grid, config);
    Ok((doorway, overridden.is_some()))
}

/// North-group doorways sit on row 0, West-group doorways on column 0; `position`
/// picks the tile along that wall.
fn wall_grid(side: WallSide, position: f32, scene: &SceneDef) -> GridPos {
    let position = position.clamp(0.0, 1.0);
    match side {
        WallSide::North => {
            let span = scene.width.saturating_sub(1) as f32;
            GridPos::new((position * span).round(), 0.0)
        }
        WallSide::West => {
            let span = scene.height.saturating_sub(1) as f32;
            GridPos::new(0.0, (position * span).round())
        }
    }
}
