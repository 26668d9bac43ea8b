use crate::geometry::IsoProjection;

pub const PROXIMITY_RADIUS: f32 = 0.5;
pub const CLOSE_DELAY_SECONDS: f32 = 0.8;
pub const TRANSITION_COOLDOWN_SECONDS: f32 = 0.5;
pub const WALL_CORRIDOR_HALF_DEPTH: f32 = 0.3;
pub const ARRIVAL_OFFSET: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorwayConfig {
    /// Player counts as near a doorway strictly below this grid distance.
    pub proximity_radius: f32,
    pub close_delay_seconds: f32,
    /// Shared by every doorway in the registry.
    pub transition_cooldown_seconds: f32,
    /// Wall doorways only collide when the player is this close to the wall line.
    pub wall_corridor_half_depth: f32,
    pub arrival_offset: f32,
    pub projection: IsoProjection,
}

impl Default for DoorwayConfig {
    fn default() -> Self {
        Self {
            proximity_radius: PROXIMITY_RADIUS,
            close_delay_seconds: CLOSE_DELAY_SECONDS,
            transition_cooldown_seconds: TRANSITION_COOLDOWN_SECONDS,
            wall_corridor_half_depth: WALL_CORRIDOR_HALF_DEPTH,
            arrival_offset: ARRIVAL_OFFSET,
            projection: IsoProjection::default(),
        }
    }
}
