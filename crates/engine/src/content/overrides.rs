use std::collections::HashMap;

use crate::doorway::Direction;
use crate::geometry::GridPos;
use crate::scene::SceneId;

use super::catalog::SceneCatalog;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthoredOverride {
    pub scene: &'static str,
    pub direction: Direction,
    pub grid: GridPos,
}

/// Scenes whose art places a doorway off the generic wall derivation.
pub const AUTHORED_DOORWAY_OVERRIDES: &[AuthoredOverride] = &[
    AuthoredOverride {
        scene: "hallway",
        direction: Direction::West,
        grid: GridPos::new(0.0, 2.0),
    },
    AuthoredOverride {
        scene: "arcade",
        direction: Direction::North,
        grid: GridPos::new(2.0, 0.0),
    },
    AuthoredOverride {
        scene: "garden",
        direction: Direction::East,
        grid: GridPos::new(0.0, 9.0),
    },
];

/// Fixed doorway positions keyed by `(scene, direction)`, consulted once per
/// descriptor at build time.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    by_scene: HashMap<SceneId, HashMap<Direction, GridPos>>,
}

impl OverrideTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn authored() -> Self {
        let mut table = Self::default();
        for entry in AUTHORED_DOORWAY_OVERRIDES {
            table.insert(SceneId::from(entry.scene), entry.direction, entry.grid);
        }
        table
    }

    /// This table's entries plus the catalog's own, which replace existing ones.
    pub fn with_catalog_entries(&self, catalog: &SceneCatalog) -> Self {
        let mut table = self.clone();
        for entry in &catalog.overrides {
            table.insert(
                entry.scene.clone(),
                entry.direction,
                GridPos::new(entry.grid_x, entry.grid_y),
            );
        }
        table
    }

    pub fn insert(
        &mut self,
        scene: SceneId,
        direction: Direction,
        grid: GridPos,
    ) -> Option<GridPos> {
        self.by_scene
            .entry(scene)
            .or_default()
            .insert(direction, grid)
    }

    pub fn lookup(&self, scene: &str, direction: Direction) -> Option<GridPos> {
        self.by_scene
            .get(scene)
            .and_then(|entries| entries.get(&direction))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.by_scene.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
