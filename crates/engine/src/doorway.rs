use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DoorwayConfig;
use crate::geometry::{GridPos, IsoProjection, WorldPos};
use crate::scene::SceneId;
use crate::spatial::{DoorwayRef, SpatialIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Accepts `north`/`n` style names in any case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Some(Self::North),
            "south" | "s" => Some(Self::South),
            "east" | "e" => Some(Self::East),
            "west" | "w" => Some(Self::West),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::North => "north",
            Self::South => "south",
            Self::East => "east",
            Self::West => "west",
        }
    }

    /// Scenes have exactly two doorway-bearing walls, so opposite directions share one.
    pub fn wall_side(self) -> WallSide {
        match self {
            Self::North | Self::South => WallSide::North,
            Self::East | Self::West => WallSide::West,
        }
    }

    /// Unit step in grid space pointing out of the scene through this exit.
    pub fn outward(self) -> GridPos {
        match self {
            Self::North => GridPos::new(0.0, -1.0),
            Self::South => GridPos::new(0.0, 1.0),
            Self::East => GridPos::new(1.0, 0.0),
            Self::West => GridPos::new(-1.0, 0.0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WallSide {
    North,
    West,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DoorwayKind {
    WallDoorway,
    FloorPortal,
}

impl DoorwayKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wall" | "walldoorway" | "wall_doorway" => Some(Self::WallDoorway),
            "floor" | "portal" | "floorportal" | "floor_portal" => Some(Self::FloorPortal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum DoorwayState {
    #[default]
    Closed,
    Open,
}

/// What a single `update_state` call changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorwayEvent {
    Opened,
    CloseScheduled,
    CloseCancelled,
    Closed,
}

/// One traversable connection out of a scene.
///
/// Position, kind and target are fixed at construction; only `state` and the
/// pending close change at runtime.
#[derive(Debug, Clone)]
pub struct Doorway {
    direction: Direction,
    target_scene: SceneId,
    kind: DoorwayKind,
    wall_side: WallSide,
    grid: GridPos,
    state: DoorwayState,
    /// Seconds left before an Open doorway closes. Only set while Open and the player is away.
    close_deadline: Option<f32>,
    close_delay_seconds: f32,
    proximity_radius: f32,
    corridor_half_depth: f32,
}

impl Doorway {
    pub fn new(
        direction: Direction,
        target_scene: SceneId,
        kind: DoorwayKind,
        grid: GridPos,
        config: &DoorwayConfig,
    ) -> Self {
        Self {
            direction,
            target_scene,
            kind,
            wall_side: direction.wall_side(),
            grid,
            state: DoorwayState::Closed,
            close_deadline: None,
            close_delay_seconds: config.close_delay_seconds.max(0.0),
            proximity_radius: config.proximity_radius,
            corridor_half_depth: config.wall_corridor_half_depth,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn target_scene(&self) -> &SceneId {
        &self.target_scene
    }

    pub fn kind(&self) -> DoorwayKind {
        self.kind
    }

    pub fn wall_side(&self) -> WallSide {
        self.wall_side
    }

    pub fn grid(&self) -> GridPos {
        self.grid
    }

    pub fn state(&self) -> DoorwayState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DoorwayState::Open
    }

    pub fn close_deadline(&self) -> Option<f32> {
        self.close_deadline
    }

    pub fn update_state(
        &mut self,
        delta_seconds: f32,
        is_player_near: bool,
    ) -> Option<DoorwayEvent> {
        let delta_seconds = delta_seconds.max(0.0);
        match (is_player_near, self.state) {
            (true, DoorwayState::Closed) => {
                self.state = DoorwayState::Open;
                self.close_deadline = None;
                Some(DoorwayEvent::Opened)
            }
            (true, DoorwayState::Open) => self
                .close_deadline
                .take()
                .map(|_| DoorwayEvent::CloseCancelled),
            (false, DoorwayState::Open) => match self.close_deadline {
                None => {
                    self.close_deadline = Some(self.close_delay_seconds);
                    Some(DoorwayEvent::CloseScheduled)
                }
                Some(remaining) => {
                    let remaining = remaining - delta_seconds;
                    if remaining <= 0.0 {
                        self.state = DoorwayState::Closed;
                        self.close_deadline = None;
                        Some(DoorwayEvent::Closed)
                    } else {
                        self.close_deadline = Some(remaining);
                        None
                    }
                }
            },
            (false, DoorwayState::Closed) => None,
        }
    }

    pub fn is_player_colliding(&self, player_grid_x: f32, player_grid_y: f32) -> bool {
        let player = GridPos::new(player_grid_x, player_grid_y);
        if !player.is_finite() {
            return false;
        }
        let radius_sq = self.proximity_radius * self.proximity_radius;
        if player.distance_sq(self.grid) >= radius_sq {
            return false;
        }
        match self.kind {
            DoorwayKind::FloorPortal => true,
            DoorwayKind::WallDoorway => {
                let depth = match self.wall_side {
                    WallSide::North => player.y - self.grid.y,
                    WallSide::West => player.x - self.grid.x,
                };
                depth.abs() <= self.corridor_half_depth
            }
        }
    }

    pub fn world_position(&self, projection: &IsoProjection) -> WorldPos {
        projection.grid_to_world(self.grid)
    }

    pub fn register_in_index(
        &self,
        handle: DoorwayRef,
        projection: &IsoProjection,
        spatial_index: &mut dyn SpatialIndex,
    ) -> WorldPos {
        let world = self.world_position(projection);
        spatial_index.add_entity(handle, world.x, world.y);
        world
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    fn portal_at(x: f32, y: f32) -> Doorway {
        Doorway::new(
            Direction::East,
            SceneId::from("room2"),
            DoorwayKind::FloorPortal,
            GridPos::new(x, y),
            &DoorwayConfig::default(),
        )
    }

    fn wall_door(direction: Direction, x: f32, y: f32) -> Doorway {
        Doorway::new(
            direction,
            SceneId::from("hall"),
            DoorwayKind::WallDoorway,
            GridPos::new(x, y),
            &DoorwayConfig::default(),
        )
    }

    #[test]
    fn direction_collapses_onto_two_walls() {
        assert_eq!(Direction::North.wall_side(), WallSide::North);
        assert_eq!(Direction::South.wall_side(), WallSide::North);
        assert_eq!(Direction::East.wall_side(), WallSide::West);
        assert_eq!(Direction::West.wall_side(), WallSide::West);
        assert_eq!(wall_door(Direction::South, 4.0, 0.0).wall_side(), WallSide::North);
    }

    #[test]
    fn direction_parse_accepts_names_and_initials() {
        assert_eq!(Direction::parse("East"), Some(Direction::East));
        assert_eq!(Direction::parse(" n "), Some(Direction::North));
        assert_eq!(Direction::parse("up"), None);
    }

    #[test]
    fn kind_parse_accepts_aliases() {
        assert_eq!(DoorwayKind::parse("portal"), Some(DoorwayKind::FloorPortal));
        assert_eq!(DoorwayKind::parse("Wall"), Some(DoorwayKind::WallDoorway));
        assert_eq!(DoorwayKind::parse("trapdoor"), None);
    }

    #[test]
    fn opens_on_first_near_frame() {
        let mut door = portal_at(5.0, 3.0);
        assert_eq!(door.state(), DoorwayState::Closed);
        assert_eq!(door.update_state(FRAME, true), Some(DoorwayEvent::Opened));
        assert_eq!(door.state(), DoorwayState::Open);
        assert!(door.close_deadline().is_none());
    }

    #[test]
    fn close_is_delayed_then_applied() {
        let mut door = portal_at(5.0, 3.0);
        door.update_state(FRAME, true);

        assert_eq!(door.update_state(0.25, false), Some(DoorwayEvent::CloseScheduled));
        assert_eq!(door.close_deadline(), Some(0.8));

        for _ in 0..3 {
            assert_eq!(door.update_state(0.25, false), None);
            assert!(door.is_open());
        }
        assert_eq!(door.update_state(0.25, false), Some(DoorwayEvent::Closed));
        assert_eq!(door.state(), DoorwayState::Closed);
        assert!(door.close_deadline().is_none());
    }

    #[test]
    fn returning_before_deadline_cancels_close() {
        let mut door = portal_at(5.0, 3.0);
        door.update_state(FRAME, true);
        door.update_state(0.2, false);
        door.update_state(0.2, false);

        assert_eq!(door.update_state(0.2, true), Some(DoorwayEvent::CloseCancelled));
        assert!(door.is_open());
        assert!(door.close_deadline().is_none());

        // A fresh departure restarts the full delay.
        door.update_state(0.2, false);
        assert_eq!(door.close_deadline(), Some(0.8));
    }

    #[test]
    fn closed_doorway_ignores_absence() {
        let mut door = portal_at(5.0, 3.0);
        assert_eq!(door.update_state(10.0, false), None);
        assert_eq!(door.state(), DoorwayState::Closed);
        assert!(door.close_deadline().is_none());
    }

    #[test]
    fn negative_or_nan_delta_never_advances_close() {
        let mut door = portal_at(5.0, 3.0);
        door.update_state(FRAME, true);
        door.update_state(FRAME, false);
        door.update_state(-5.0, false);
        door.update_state(f32::NAN, false);
        assert_eq!(door.close_deadline(), Some(0.8));
    }

    #[test]
    fn floor_portal_collision_is_strict_radius() {
        let door = portal_at(5.0, 3.0);
        assert!(door.is_player_colliding(5.1, 3.1));
        assert!(door.is_player_colliding(5.49, 3.0));
        assert!(!door.is_player_colliding(5.5, 3.0));
        assert!(!door.is_player_colliding(10.0, 10.0));
        assert!(!door.is_player_colliding(f32::NAN, 3.0));
    }

    #[test]
    fn north_wall_doorway_requires_player_near_wall_line() {
        let door = wall_door(Direction::North, 4.0, 0.0);
        assert!(door.is_player_colliding(4.2, 0.25));
        // Inside the radius but too deep into the room.
        assert!(!door.is_player_colliding(4.0, 0.4));
        // Along the wall but outside the radius.
        assert!(!door.is_player_colliding(4.6, 0.0));
    }

    #[test]
    fn west_wall_doorway_bounds_the_x_axis() {
        let door = wall_door(Direction::East, 0.0, 6.0);
        assert!(door.is_player_colliding(0.2, 6.2));
        assert!(!door.is_player_colliding(0.45, 6.0));
    }

    #[test]
    fn register_publishes_projected_position() {
        use crate::spatial::GridSpatialIndex;

        let door = portal_at(5.0, 3.0);
        let mut index = GridSpatialIndex::default();
        let handle = DoorwayRef {
            scene: SceneId::from("room1"),
            slot: 0,
        };
        let world = door.register_in_index(handle.clone(), &IsoProjection::default(), &mut index);

        assert_eq!(world, WorldPos { x: 64.0, y: 128.0 });
        assert_eq!(index.position_of(&handle), Some(world));
    }
}
