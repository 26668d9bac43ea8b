use serde::{Deserialize, Serialize};

use crate::doorway::Direction;
use crate::scene::SceneId;

pub const DEFAULT_SCENE_EXTENT: u32 = 10;

/// Authored exit as it appears in scene data. Fields stay optional and loosely
/// typed here; the registry validates them and skips what it cannot use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, alias = "to", skip_serializing_if = "Option::is_none")]
    pub target_scene_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_y: Option<f32>,
    /// Fraction along the doorway's wall, 0.0 at the corner and 1.0 at the far end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDef {
    pub id: SceneId,
    #[serde(default = "default_extent")]
    pub width: u32,
    #[serde(default = "default_extent")]
    pub height: u32,
    #[serde(default)]
    pub exits: Vec<ExitDescriptor>,
}

impl SceneDef {
    pub fn new(id: impl Into<SceneId>) -> Self {
        Self {
            id: id.into(),
            width: DEFAULT_SCENE_EXTENT,
            height: DEFAULT_SCENE_EXTENT,
            exits: Vec::new(),
        }
    }

    pub fn with_extent(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_exit(mut self, exit: ExitDescriptor) -> Self {
        self.exits.push(exit);
        self
    }
}

fn default_extent() -> u32 {
    DEFAULT_SCENE_EXTENT
}

/// Catalog-supplied replacement for a derived doorway position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorwayOverride {
    pub scene: SceneId,
    pub direction: Direction,
    pub grid_x: f32,
    pub grid_y: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneCatalog {
    #[serde(default)]
    pub scenes: Vec<SceneDef>,
    #[serde(default)]
    pub overrides: Vec<DoorwayOverride>,
}

impl SceneCatalog {
    pub fn scene(&self, id: &str) -> Option<&SceneDef> {
        self.scenes.iter().find(|scene| scene.id.as_str() == id)
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = &SceneId> {
        self.scenes.iter().map(|scene| &scene.id)
    }

    pub fn exit_count(&self) -> usize {
        self.scenes.iter().map(|scene| scene.exits.len()).sum()
    }
}

impl ExitDescriptor {
    pub fn floor_portal(direction: &str, to: &str, grid_x: f32, grid_y: f32) -> Self {
        Self {
            direction: Some(direction.to_string()),
            target_scene_id: Some(to.to_string()),
            grid_x: Some(grid_x),
            grid_y: Some(grid_y),
            ..Self::default()
        }
    }

    pub fn wall(direction: &str, to: &str, position: Option<f32>) -> Self {
        Self {
            direction: Some(direction.to_string()),
            target_scene_id: Some(to.to_string()),
            position,
            ..Self::default()
        }
    }
}
