//! Recovery for scenes left dirty by an interrupted bake.

use crate::channels::ID_ATTRIBUTE_PREFIX;
use crate::graph::{LOGIC_LABEL, PROTECTION_IMAGE, PROTECTION_LABEL, SESSION_LABEL};
use crate::scene::{NodeKind, Scene, SocketRef};
use crate::uv::TEMP_UV_LAYER;

/// Counts of what an emergency cleanup removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CleanupReport {
    pub uv_layers: usize,
    pub nodes: usize,
    pub images: usize,
    pub attributes: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.uv_layers + self.nodes + self.images + self.attributes
    }
}

/// Remove every temporary artefact a bake can leave behind, whichever
/// scope created it. Safe to run repeatedly.
///
/// A material whose surface output ends up unconnected gets its principled
/// BSDF wired back in.
#[tracing::instrument(skip_all)]
pub fn emergency_cleanup(scene: &mut Scene) -> CleanupReport {
    let mut report = CleanupReport::default();

    for (_, object) in scene.objects.iter_mut() {
        let name = object.name.clone();
        let Some(mesh) = object.mesh_mut() else {
            continue;
        };
        while let Some(index) = mesh.uv_layer_index(TEMP_UV_LAYER) {
            match mesh.remove_uv_layer(index) {
                Ok(_) => report.uv_layers += 1,
                Err(err) => {
                    tracing::warn!(object = %name, %err, "could not remove temporary UV layer");
                    break;
                }
            }
        }
        let temp: Vec<String> = mesh
            .attributes
            .iter()
            .filter(|a| a.name.starts_with(ID_ATTRIBUTE_PREFIX))
            .map(|a| a.name.clone())
            .collect();
        for attr in temp {
            if mesh.remove_attribute(&attr) {
                report.attributes += 1;
            }
        }
    }

    for (_, mat) in scene.materials.iter_mut() {
        let tree = &mut mat.node_tree;
        let stale: Vec<_> = tree
            .nodes
            .iter()
            .filter(|n| [SESSION_LABEL, LOGIC_LABEL, PROTECTION_LABEL].contains(&n.label.as_str()))
            .map(|n| n.id)
            .collect();
        if stale.is_empty() {
            continue;
        }
        for id in stale {
            match tree.remove(id) {
                Ok(_) => report.nodes += 1,
                Err(err) => tracing::warn!(material = %mat.name, %err, "could not remove bake node"),
            }
        }

        let Some(out) = tree.material_output() else {
            continue;
        };
        let surface = SocketRef::new(out, "Surface");
        if tree.source_of(&surface).is_none()
            && let Some(bsdf) = tree
                .find_kind(|k| matches!(k, NodeKind::PrincipledBsdf))
                .map(|n| n.id)
            && let Err(err) = tree.link(SocketRef::new(bsdf, "BSDF"), surface)
        {
            tracing::warn!(material = %mat.name, %err, "could not reconnect surface output");
        }
    }

    while let Some(id) = scene.find_image(PROTECTION_IMAGE) {
        if scene.remove_image(id).is_none() {
            break;
        }
        report.images += 1;
    }

    tracing::info!(
        uv_layers = report.uv_layers,
        nodes = report.nodes,
        images = report.images,
        attributes = report.attributes,
        "emergency cleanup finished"
    );
    report
}

#[cfg(test)]
#[path = "../tests/unit/cleanup.rs"]
mod tests;
