use std::ops::{Deref, DerefMut};

use crate::config::{BakeMode, JobSetting, UdimMode};
use crate::foundation::core::{UdimTile, Vec2};
use crate::foundation::error::BakeResult;
use crate::render::UvUnwrapper;
use crate::scene::{MAX_UV_LAYERS, ObjectId, Scene};
use crate::uv::tiles::{calculate_repack, detect_tile};

/// Name of the scratch UV layer created for the duration of a bake.
pub const TEMP_UV_LAYER: &str = "BT_Bake_Temp_UV";

#[derive(Clone, Debug)]
struct LayerRecord {
    object: ObjectId,
    active: Option<usize>,
    render: Option<usize>,
    created: bool,
}

/// Scoped temporary UV layout.
///
/// Every mesh gets a scratch layer that is active for editing and rendering
/// while the guard lives; unwrapping and tile placement only ever touch that
/// layer. Dropping the guard removes the scratch layers and restores the
/// original layer selection.
pub struct UvLayoutGuard<'s> {
    scene: &'s mut Scene,
    records: Vec<LayerRecord>,
}

impl<'s> UvLayoutGuard<'s> {
    #[tracing::instrument(skip_all, fields(objects = objects.len()))]
    pub fn enter(
        scene: &'s mut Scene,
        objects: &[ObjectId],
        setting: &JobSetting,
        unwrapper: &mut dyn UvUnwrapper,
    ) -> BakeResult<Self> {
        let mut guard = Self {
            scene,
            records: Vec::with_capacity(objects.len()),
        };
        for &obj in objects {
            guard.add_temp_layer(obj);
        }

        if setting.use_auto_uv {
            unwrapper.smart_project(
                guard.scene,
                objects,
                setting.auto_uv_angle,
                setting.auto_uv_margin,
            )?;
        }

        if setting.bake_mode == BakeMode::Udim {
            let targets: Vec<(ObjectId, UdimTile)> = match setting.udim_mode {
                UdimMode::Detect => Vec::new(),
                UdimMode::Repack => calculate_repack(guard.scene, objects).into_iter().collect(),
                UdimMode::Custom => setting
                    .bake_objects
                    .iter()
                    .filter_map(|b| b.object.map(|o| (o, b.udim_tile)))
                    .filter(|(o, _)| objects.contains(o))
                    .collect(),
            };
            for (obj, tile) in targets {
                guard.move_to_tile(obj, tile);
            }
        }
        Ok(guard)
    }

    fn add_temp_layer(&mut self, object: ObjectId) {
        let Some(obj) = self.scene.object_mut(object) else {
            return;
        };
        let name = obj.name.clone();
        let Some(mesh) = obj.mesh_mut() else {
            return;
        };
        let mut record = LayerRecord {
            object,
            active: mesh.active_uv,
            render: mesh.active_render_uv,
            created: false,
        };
        if mesh.uv_layers.len() >= MAX_UV_LAYERS {
            tracing::error!(object = %name, "UV layer limit reached, baking on the active layer");
        } else {
            match mesh.add_uv_layer(TEMP_UV_LAYER) {
                Ok(index) => {
                    mesh.active_uv = Some(index);
                    mesh.active_render_uv = Some(index);
                    record.created = true;
                }
                Err(err) => tracing::error!(object = %name, %err, "temporary UV layer not created"),
            }
        }
        self.records.push(record);
    }

    /// Translate the active layer so its dominant tile becomes `target`.
    fn move_to_tile(&mut self, object: ObjectId, target: UdimTile) {
        let current = detect_tile(self.scene, object);
        let offset = current.offset_to(target);
        if offset == Vec2::ZERO {
            return;
        }
        if let Some(layer) = self
            .scene
            .object_mut(object)
            .and_then(|o| o.mesh_mut())
            .and_then(|m| m.active_uv_layer_mut())
        {
            for uv in &mut layer.data {
                *uv += offset;
            }
            tracing::debug!(from = %current, to = %target, "moved UVs");
        }
    }

    fn restore(&mut self) {
        for record in self.records.drain(..) {
            let Some(mesh) = self
                .scene
                .object_mut(record.object)
                .and_then(|o| o.mesh_mut())
            else {
                tracing::warn!("object removed before its UV layout was restored");
                continue;
            };
            if record.created {
                match mesh.uv_layer_index(TEMP_UV_LAYER) {
                    Some(index) => {
                        if let Err(err) = mesh.remove_uv_layer(index) {
                            tracing::warn!(%err, "failed to remove temporary UV layer");
                        }
                    }
                    None => tracing::warn!("temporary UV layer already gone"),
                }
            }
            let count = mesh.uv_layers.len();
            if let Some(i) = record.active.filter(|&i| i < count) {
                mesh.active_uv = Some(i);
            }
            if let Some(i) = record.render.filter(|&i| i < count) {
                mesh.active_render_uv = Some(i);
            }
        }
    }
}

impl Deref for UvLayoutGuard<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for UvLayoutGuard<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for UvLayoutGuard<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/uv/layout.rs"]
mod tests;
