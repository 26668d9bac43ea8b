use sha2::{Digest, Sha256};

use super::catalog::{ExitDescriptor, SceneCatalog};

/// SHA-256 over a canonical encoding of the catalog. Order-sensitive: reordering
/// exits changes doorway list order, so it changes the fingerprint too.
pub fn catalog_fingerprint(catalog: &SceneCatalog) -> String {
    let mut hasher = Sha256::new();
    hasher.update((catalog.scenes.len() as u64).to_le_bytes());
    for scene in &catalog.scenes {
        update_str(&mut hasher, scene.id.as_str());
        hasher.update(scene.width.to_le_bytes());
        hasher.update(scene.height.to_le_bytes());
        hasher.update((scene.exits.len() as u64).to_le_bytes());
        for exit in &scene.exits {
            update_exit(&mut hasher, exit);
        }
    }
    hasher.update((catalog.overrides.len() as u64).to_le_bytes());
    for entry in &catalog.overrides {
        update_str(&mut hasher, entry.scene.as_str());
        update_str(&mut hasher, entry.direction.as_str());
        hasher.update(entry.grid_x.to_bits().to_le_bytes());
        hasher.update(entry.grid_y.to_bits().to_le_bytes());
    }
    to_hex_lower(&hasher.finalize())
}

fn update_exit(hasher: &mut Sha256, exit: &ExitDescriptor) {
    update_opt_str(hasher, exit.direction.as_deref());
    update_opt_str(hasher, exit.target_scene_id.as_deref());
    update_opt_f32(hasher, exit.grid_x);
    update_opt_f32(hasher, exit.grid_y);
    update_opt_f32(hasher, exit.position);
    update_opt_str(hasher, exit.kind.as_deref());
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update([0u8]);
}

fn update_opt_str(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(value) => {
            hasher.update([1u8]);
            update_str(hasher, value);
        }
        None => hasher.update([0u8]),
    }
}

fn update_opt_f32(hasher: &mut Sha256, value: Option<f32>) {
    match value {
        Some(value) => {
            hasher.update([1u8]);
            hasher.update(value.to_bits().to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::catalog::SceneDef;

    fn sample() -> SceneCatalog {
        SceneCatalog {
            scenes: vec![SceneDef::new("room1")
                .with_exit(ExitDescriptor::floor_portal("east", "room2", 5.0, 3.0))
                .with_exit(ExitDescriptor::wall("north", "attic", None))],
            overrides: Vec::new(),
        }
    }

    #[test]
    fn identical_catalogs_share_a_fingerprint() {
        assert_eq!(catalog_fingerprint(&sample()), catalog_fingerprint(&sample()));
        assert_eq!(catalog_fingerprint(&sample()).len(), 64);
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        let mut reordered = sample();
        reordered.scenes[0].exits.reverse();
        assert_ne!(catalog_fingerprint(&sample()), catalog_fingerprint(&reordered));
    }

    #[test]
    fn absent_and_empty_fields_hash_differently() {
        let mut with_kind = sample();
        with_kind.scenes[0].exits[1].kind = Some(String::new());
        assert_ne!(catalog_fingerprint(&sample()), catalog_fingerprint(&with_kind));
    }
}
