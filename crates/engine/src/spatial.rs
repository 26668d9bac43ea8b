use std::collections::HashMap;

use crate::geometry::WorldPos;
use crate::scene::SceneId;

/// Stable handle to a doorway: its scene and its position in that scene's list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DoorwayRef {
    pub scene: SceneId,
    pub slot: usize,
}

/// Broad-phase registry the doorways are published into.
pub trait SpatialIndex {
    fn add_entity(&mut self, entity: DoorwayRef, world_x: f32, world_y: f32);
    /// Drops every entity registered for `scene`.
    fn remove_scene(&mut self, scene: &SceneId);
}

pub const DEFAULT_BUCKET_SIZE_PX: f32 = 128.0;

/// Uniform-bucket broad phase keyed by world pixels.
///
/// Adding an entity that is already present moves it, so rebuilding the
/// registry against the same index never duplicates entries.
#[derive(Debug)]
pub struct GridSpatialIndex {
    bucket_size: f32,
    positions: HashMap<DoorwayRef, WorldPos>,
    buckets: HashMap<(i32, i32), Vec<DoorwayRef>>,
}

impl Default for GridSpatialIndex {
    fn default() -> Self {
        Self::with_bucket_size(DEFAULT_BUCKET_SIZE_PX)
    }
}

impl GridSpatialIndex {
    pub fn with_bucket_size(bucket_size: f32) -> Self {
        let bucket_size = if bucket_size.is_finite() && bucket_size > 0.0 {
            bucket_size
        } else {
            DEFAULT_BUCKET_SIZE_PX
        };
        Self {
            bucket_size,
            positions: HashMap::new(),
            buckets: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position_of(&self, entity: &DoorwayRef) -> Option<WorldPos> {
        self.positions.get(entity).copied()
    }

    /// Entities within `radius` pixels of `center`, nearest first.
    /// An empty result for a negative or non-finite radius or center.
    pub fn query_radius(&self, center: WorldPos, radius: f32) -> Vec<DoorwayRef> {
        let finite = radius.is_finite() && center.x.is_finite() && center.y.is_finite();
        if !finite || radius < 0.0 {
            return Vec::new();
        }
        let min = self.bucket_of(WorldPos {
            x: center.x - radius,
            y: center.y - radius,
        });
        let max = self.bucket_of(WorldPos {
            x: center.x + radius,
            y: center.y + radius,
        });
        let radius_sq = radius * radius;

        let span = (i64::from(max.0) - i64::from(min.0) + 1)
            .saturating_mul(i64::from(max.1) - i64::from(min.1) + 1);
        // Wide queries visit the occupied buckets instead of every cell in range.
        let candidates: Vec<&Vec<DoorwayRef>> = if span > self.buckets.len() as i64 {
            self.buckets
                .iter()
                .filter(|((bx, by), _)| {
                    (min.0..=max.0).contains(bx) && (min.1..=max.1).contains(by)
                })
                .map(|(_, bucket)| bucket)
                .collect()
        } else {
            (min.0..=max.0)
                .flat_map(|bx| (min.1..=max.1).map(move |by| (bx, by)))
                .filter_map(|key| self.buckets.get(&key))
                .collect()
        };

        let mut hits = Vec::<(f32, DoorwayRef)>::new();
        for entity in candidates.into_iter().flatten() {
            let Some(pos) = self.positions.get(entity) else {
                continue;
            };
            let dx = pos.x - center.x;
            let dy = pos.y - center.y;
            let dist_sq = dx * dx + dy * dy;
            if dist_sq <= radius_sq {
                hits.push((dist_sq, entity.clone()));
            }
        }
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, entity)| entity).collect()
    }

    fn bucket_of(&self, pos: WorldPos) -> (i32, i32) {
        (
            (pos.x / self.bucket_size).floor() as i32,
            (pos.y / self.bucket_size).floor() as i32,
        )
    }
}

impl SpatialIndex for GridSpatialIndex {
    fn add_entity(&mut self, entity: DoorwayRef, world_x: f32, world_y: f32) {
        let pos = WorldPos {
            x: world_x,
            y: world_y,
        };
        if let Some(previous) = self.positions.insert(entity.clone(), pos) {
            let old_bucket = self.bucket_of(previous);
            if let Some(bucket) = self.buckets.get_mut(&old_bucket) {
                bucket.retain(|existing| existing != &entity);
                if bucket.is_empty() {
                    self.buckets.remove(&old_bucket);
                }
            }
        }
        let bucket = self.bucket_of(pos);
        self.buckets.entry(bucket).or_default().push(entity);
    }

    fn remove_scene(&mut self, scene: &SceneId) {
        self.positions.retain(|entity, _| &entity.scene != scene);
        self.buckets.retain(|_, bucket| {
            bucket.retain(|entity| &entity.scene != scene);
            !bucket.is_empty()
        });
    }
}
