use doorway_engine::{Doorway, DoorwayKind, GridPos, SceneId};

pub(crate) const WALK_SPEED_TILES_PER_SECOND: f32 = 4.0;
pub(crate) const ARRIVAL_THRESHOLD: f32 = 0.05;

/// Scripted stand-in for player input: walks to a floor portal, preferring one that
/// does not lead straight back to the scene it came from.
#[derive(Debug, Clone)]
pub(crate) struct Walker {
    pub(crate) position: GridPos,
    pub(crate) speed: f32,
    came_from: Option<SceneId>,
}

impl Walker {
    pub(crate) fn new(position: GridPos) -> Self {
        Self {
            position,
            speed: WALK_SPEED_TILES_PER_SECOND,
            came_from: None,
        }
    }

    pub(crate) fn arrive(&mut self, position: GridPos, came_from: SceneId) {
        self.position = position;
        self.came_from = Some(came_from);
    }

    pub(crate) fn choose_target(&self, doorways: &[Doorway]) -> Option<GridPos> {
        let mut portals = doorways
            .iter()
            .filter(|doorway| doorway.kind() == DoorwayKind::FloorPortal);
        let forward = portals
            .clone()
            .find(|doorway| Some(doorway.target_scene()) != self.came_from.as_ref());
        forward
            .or_else(|| portals.next())
            .or_else(|| doorways.first())
            .map(Doorway::grid)
    }

    pub(crate) fn advance(&mut self, target: GridPos, fixed_dt_seconds: f32) {
        let (next, _) = step_toward(
            self.position,
            target,
            self.speed,
            fixed_dt_seconds,
            ARRIVAL_THRESHOLD,
        );
        self.position = next;
    }
}

pub(crate) fn step_toward(
    current: GridPos,
    target: GridPos,
    speed: f32,
    fixed_dt_seconds: f32,
    arrival_threshold: f32,
) -> (GridPos, bool) {
    let distance_sq = current.distance_sq(target);
    if distance_sq <= arrival_threshold * arrival_threshold {
        return (target, true);
    }

    let distance = distance_sq.sqrt();
    let max_step = speed * fixed_dt_seconds;
    if max_step >= distance {
        return (target, true);
    }

    let scale = max_step / distance;
    (
        GridPos::new(
            current.x + (target.x - current.x) * scale,
            current.y + (target.y - current.y) * scale,
        ),
        false,
    )
}
