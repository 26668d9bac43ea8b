use serde::Serialize;

/// Gameplay position in tile units. Fractional values are positions between tile centres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GridPos {
    pub x: f32,
    pub y: f32,
}

impl GridPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(self, other: GridPos) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Renderer-facing position in pixels, origin at grid (0, 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
}

/// Isometric projection convention:
/// - grid +x runs down-right on screen, grid +y runs down-left.
/// - one tile is a diamond `tile_width` wide and `tile_height` tall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoProjection {
    pub tile_width: f32,
    pub tile_height: f32,
}

impl Default for IsoProjection {
    fn default() -> Self {
        Self {
            tile_width: 64.0,
            tile_height: 32.0,
        }
    }
}

impl IsoProjection {
    pub fn grid_to_world(&self, grid: GridPos) -> WorldPos {
        WorldPos {
            x: (grid.x - grid.y) * self.tile_width * 0.5,
            y: (grid.x + grid.y) * self.tile_height * 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_origin_maps_to_world_origin() {
        let projection = IsoProjection::default();
        let world = projection.grid_to_world(GridPos::new(0.0, 0.0));
        assert_eq!(world, WorldPos { x: 0.0, y: 0.0 });
    }

    #[test]
    fn grid_axes_project_to_diamond_edges() {
        let projection = IsoProjection::default();
        assert_eq!(
            projection.grid_to_world(GridPos::new(1.0, 0.0)),
            WorldPos { x: 32.0, y: 16.0 }
        );
        assert_eq!(
            projection.grid_to_world(GridPos::new(0.0, 1.0)),
            WorldPos { x: -32.0, y: 16.0 }
        );
    }

    #[test]
    fn distance_sq_is_euclidean_squared() {
        let a = GridPos::new(5.0, 3.0);
        let b = GridPos::new(5.1, 3.1);
        assert!((a.distance_sq(b) - 0.02).abs() < 1e-4);
        assert_eq!(GridPos::new(0.0, 0.0).distance_sq(GridPos::new(3.0, 4.0)), 25.0);
    }
}
