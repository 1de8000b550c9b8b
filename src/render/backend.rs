use std::path::Path;

use anyhow::Context;

use crate::channels::BakePass;
use crate::config::ExportFormat;
use crate::foundation::core::Vec2;
use crate::foundation::error::{BakeError, BakeResult};
use crate::scene::{Material, Object, ObjectId, Scene};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NormalSpace {
    #[default]
    Tangent,
    Object,
}

/// Selected-to-active projection options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectedToActive {
    pub cage: Option<ObjectId>,
    pub extrusion: f32,
    pub max_ray_distance: f32,
}

/// Everything the renderer needs for one bake call. Targets are the active
/// image-texture nodes of the baked objects' materials.
#[derive(Clone, Debug, PartialEq)]
pub struct BakeParams {
    pub pass: BakePass,
    pub objects: Vec<ObjectId>,
    pub active: ObjectId,
    pub margin: u32,
    pub use_clear: bool,
    pub normal_space: NormalSpace,
    pub selected_to_active: Option<SelectedToActive>,
    pub samples: u32,
}

/// Opaque "render a pass into the target images" capability.
pub trait BakeBackend {
    fn bake(&mut self, scene: &mut Scene, params: &BakeParams) -> BakeResult<()>;
}

/// Opaque model export capability.
pub trait ModelExporter {
    fn export(
        &mut self,
        scene: &Scene,
        object: ObjectId,
        format: ExportFormat,
        path: &Path,
    ) -> BakeResult<()>;
}

/// Automatic UV re-projection over several objects at once.
pub trait UvUnwrapper {
    fn smart_project(
        &mut self,
        scene: &mut Scene,
        objects: &[ObjectId],
        angle_limit: f32,
        island_margin: f32,
    ) -> BakeResult<()>;
}

#[derive(serde::Serialize)]
struct ExportDoc<'a> {
    format: &'a str,
    object: &'a Object,
    materials: Vec<&'a Material>,
}

/// Exporter that writes the object as JSON, standing in for FBX/GLB/USD codecs.
#[derive(Debug, Default)]
pub struct JsonModelExporter;

impl ModelExporter for JsonModelExporter {
    fn export(
        &mut self,
        scene: &Scene,
        object: ObjectId,
        format: ExportFormat,
        path: &Path,
    ) -> BakeResult<()> {
        let obj = scene
            .object(object)
            .ok_or_else(|| BakeError::validation("export object is gone"))?;
        let doc = ExportDoc {
            format: format.extension(),
            object: obj,
            materials: obj
                .materials()
                .iter()
                .filter_map(|&m| scene.material(m))
                .collect(),
        };
        let text = serde_json::to_string_pretty(&doc)?;
        std::fs::write(path, text).with_context(|| format!("write model {}", path.display()))?;
        Ok(())
    }
}

/// Unwrapper that projects every corner's XY position into the unit square,
/// normalised over the objects' joint bounds and inset by the island margin.
#[derive(Debug, Default)]
pub struct PlanarUnwrapper;

impl UvUnwrapper for PlanarUnwrapper {
    fn smart_project(
        &mut self,
        scene: &mut Scene,
        objects: &[ObjectId],
        _angle_limit: f32,
        island_margin: f32,
    ) -> BakeResult<()> {
        let mut min = [f32::INFINITY; 2];
        let mut max = [f32::NEG_INFINITY; 2];
        for &id in objects {
            let Some(mesh) = scene.object(id).and_then(|o| o.mesh()) else {
                continue;
            };
            for p in &mesh.vertices {
                for axis in 0..2 {
                    min[axis] = min[axis].min(p[axis]);
                    max[axis] = max[axis].max(p[axis]);
                }
            }
        }
        let extent = [
            (max[0] - min[0]).max(f32::EPSILON),
            (max[1] - min[1]).max(f32::EPSILON),
        ];
        let margin = f64::from(island_margin.clamp(0.0, 0.25));
        let scale = 1.0 - 2.0 * margin;

        for &id in objects {
            let Some(mesh) = scene.object_mut(id).and_then(|o| o.mesh_mut()) else {
                continue;
            };
            let coords: Vec<_> = mesh
                .loop_vertices
                .iter()
                .map(|&v| {
                    let p = mesh.vertices[v as usize];
                    let u = f64::from((p[0] - min[0]) / extent[0]);
                    let w = f64::from((p[1] - min[1]) / extent[1]);
                    Vec2::new(margin + u * scale, margin + w * scale)
                })
                .collect();
            if let Some(layer) = mesh.active_uv_layer_mut() {
                layer.data = coords;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
