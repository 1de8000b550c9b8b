use std::collections::{BTreeMap, BTreeSet};

use crate::config::{BakeMode, JobSetting, UdimMode};
use crate::foundation::core::{Resolution, UdimTile};
use crate::scene::{ObjectId, Scene};

/// Dominant UDIM tile of the object's active UV layer.
///
/// Corners outside the 10x10 grid are ignored; ties go to the lower tile.
/// Objects without UVs or valid corners report tile 1001.
pub fn detect_tile(scene: &Scene, object: ObjectId) -> UdimTile {
    let Some(layer) = scene
        .object(object)
        .and_then(|o| o.mesh())
        .and_then(|m| m.active_uv_layer())
    else {
        return UdimTile::FIRST;
    };

    let mut counts: BTreeMap<UdimTile, usize> = BTreeMap::new();
    for uv in &layer.data {
        let u = uv.x.floor() as i64;
        let v = uv.y.floor() as i64;
        if let Some(tile) = UdimTile::from_floored(u, v) {
            *counts.entry(tile).or_default() += 1;
        }
    }

    let mut best: Option<(UdimTile, usize)> = None;
    for (tile, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((tile, count));
        }
    }
    best.map(|(t, _)| t).unwrap_or(UdimTile::FIRST)
}

/// Sorted set of tiles occupied by `objects`, never empty.
pub fn detect_tiles(scene: &Scene, objects: &[ObjectId]) -> Vec<UdimTile> {
    let tiles: BTreeSet<UdimTile> = objects.iter().map(|&o| detect_tile(scene, o)).collect();
    if tiles.is_empty() {
        vec![UdimTile::FIRST]
    } else {
        tiles.into_iter().collect()
    }
}

/// Assign every object a distinct tile.
///
/// Objects already above 1001 keep their tile; the rest, ordered by name,
/// take the lowest free tiles from 1001 upward.
pub fn calculate_repack(scene: &Scene, objects: &[ObjectId]) -> BTreeMap<ObjectId, UdimTile> {
    let mut assignments = BTreeMap::new();
    let mut used = BTreeSet::new();
    let mut pending = Vec::new();

    for &obj in objects {
        let tile = detect_tile(scene, obj);
        if tile > UdimTile::FIRST && !used.contains(&tile) {
            assignments.insert(obj, tile);
            used.insert(tile);
        } else {
            pending.push(obj);
        }
    }

    pending.sort_by_key(|&o| scene.object_name(o));
    let mut next = Some(UdimTile::FIRST);
    for obj in pending {
        while let Some(t) = next.filter(|t| used.contains(t)) {
            next = t.next();
        }
        let Some(tile) = next else {
            tracing::warn!(object = %scene.object_name(obj), "no free UDIM tile left");
            continue;
        };
        assignments.insert(obj, tile);
        used.insert(tile);
    }
    assignments
}

/// Tiles the task's images must carry, or `None` outside UDIM mode.
pub fn udim_configuration(
    scene: &Scene,
    setting: &JobSetting,
    objects: &[ObjectId],
) -> Option<Vec<UdimTile>> {
    if setting.bake_mode != BakeMode::Udim {
        return None;
    }
    let tiles: BTreeSet<UdimTile> = match setting.udim_mode {
        UdimMode::Detect => return Some(detect_tiles(scene, objects)),
        UdimMode::Repack => calculate_repack(scene, objects).into_values().collect(),
        UdimMode::Custom => setting
            .bake_objects
            .iter()
            .filter(|b| b.object.is_some())
            .map(|b| b.udim_tile)
            .collect(),
    };
    if tiles.is_empty() {
        Some(vec![UdimTile::FIRST])
    } else {
        Some(tiles.into_iter().collect())
    }
}

/// Per-tile resolution overrides configured on the job's objects.
pub fn tile_resolutions(setting: &JobSetting) -> BTreeMap<UdimTile, Resolution> {
    if setting.bake_mode != BakeMode::Udim {
        return BTreeMap::new();
    }
    setting
        .bake_objects
        .iter()
        .filter(|b| b.object.is_some())
        .filter_map(|b| b.tile_resolution().map(|r| (b.udim_tile, r)))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/uv/tiles.rs"]
mod tests;
