use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use crate::channels::{BakePass, ChannelId};
use crate::config::ChannelSetting;
use crate::foundation::core::Resolution;
use crate::foundation::error::{BakeError, BakeResult};
use crate::graph::logic::LogicBuilder;
use crate::scene::{
    Image, ImageId, MaterialId, NodeId, NodeKind, NodeTree, ObjectId, Scene, SocketRef,
};

/// Label of the texture and emission nodes kept for a whole session.
pub const SESSION_LABEL: &str = "BT_Session";
/// Label of the texture nodes parked in inactive materials.
pub const PROTECTION_LABEL: &str = "BT_Protection";
/// Shared image bound by protection nodes.
pub const PROTECTION_IMAGE: &str = "BT_Protection_Dummy";

const SURFACE: &str = "Surface";

#[derive(Clone, Copy, Debug)]
struct SessionNodes {
    tex: NodeId,
    emission: NodeId,
}

/// Exclusive, scoped ownership of the shading graphs of one bake task.
///
/// Entering adds a texture and an emission node to every node-based
/// material; each [`setup_for_pass`](Self::setup_for_pass) rebuilds only the
/// per-channel logic between them. Dropping the session removes everything
/// it added and reconnects each material output to its original source.
/// Cleanup is best-effort: failures are logged and never stop the remaining
/// steps.
pub struct GraphSession<'s> {
    scene: &'s mut Scene,
    materials: Vec<MaterialId>,
    session: BTreeMap<MaterialId, SessionNodes>,
    logic: BTreeMap<MaterialId, Vec<NodeId>>,
    protection: BTreeMap<MaterialId, Vec<NodeId>>,
    /// Source feeding each output's Surface input before the first rewire.
    original: BTreeMap<MaterialId, Option<SocketRef>>,
    previous_active: BTreeMap<MaterialId, Option<NodeId>>,
    temp_attributes: Vec<(ObjectId, String)>,
}

impl<'s> GraphSession<'s> {
    pub fn enter(scene: &'s mut Scene, materials: &[MaterialId]) -> Self {
        let mut session = Self {
            scene,
            materials: Vec::new(),
            session: BTreeMap::new(),
            logic: BTreeMap::new(),
            protection: BTreeMap::new(),
            original: BTreeMap::new(),
            previous_active: BTreeMap::new(),
            temp_attributes: Vec::new(),
        };
        for &id in materials {
            let Some(mat) = session.scene.material_mut(id) else {
                continue;
            };
            if !mat.use_nodes || session.session.contains_key(&id) {
                continue;
            }
            let tree = &mut mat.node_tree;
            session.previous_active.insert(id, tree.active);
            let tex = add_labeled(tree, NodeKind::TexImage, SESSION_LABEL);
            let emission = add_labeled(tree, NodeKind::Emission, SESSION_LABEL);
            session.session.insert(id, SessionNodes { tex, emission });
            session.logic.insert(id, Vec::new());
            session.materials.push(id);
        }
        session
    }

    pub fn materials(&self) -> &[MaterialId] {
        &self.materials
    }

    /// Session texture node of `material`, the bake target while the session lives.
    pub fn target_node(&self, material: MaterialId) -> Option<NodeId> {
        self.session.get(&material).map(|s| s.tex)
    }

    /// Register a mesh attribute to delete when the session ends.
    pub fn track_attribute(&mut self, object: ObjectId, name: impl Into<String>) {
        let name = name.into();
        if !self
            .temp_attributes
            .iter()
            .any(|(o, n)| *o == object && *n == name)
        {
            self.temp_attributes.push((object, name));
        }
    }

    /// Rewire every session material so the next bake of `pass` writes
    /// channel `id` into `image`.
    pub fn setup_for_pass(
        &mut self,
        pass: BakePass,
        id: ChannelId,
        setting: &ChannelSetting,
        image: ImageId,
        attribute: Option<&str>,
    ) -> BakeResult<()> {
        let needs_emission = pass == BakePass::Emit
            || id.mesh_logic().is_some()
            || id.pbr_mode().is_some()
            || id == ChannelId::NodeGroup;

        for mat_id in self.materials.clone() {
            let Some(nodes) = self.session.get(&mat_id).copied() else {
                continue;
            };
            let Scene {
                materials,
                node_groups,
                ..
            } = &mut *self.scene;
            let Some(mat) = materials.get_mut(mat_id) else {
                tracing::warn!("material removed during bake session");
                continue;
            };
            let tree = &mut mat.node_tree;
            let Some(out) = tree.material_output() else {
                continue;
            };

            let logic = self.logic.entry(mat_id).or_default();
            remove_nodes(tree, logic, &mat.name);

            let surface = SocketRef::new(out, SURFACE);
            self.original
                .entry(mat_id)
                .or_insert_with(|| tree.source_of(&surface).cloned());

            let tex = tree
                .node_mut(nodes.tex)
                .ok_or_else(|| BakeError::graph(format!("session texture missing in '{}'", mat.name)))?;
            tex.image = Some(image);
            tree.active = Some(nodes.tex);

            if !needs_emission {
                continue;
            }
            tree.link(SocketRef::new(nodes.emission, "Emission"), surface)?;

            let exclude = [nodes.tex, nodes.emission];
            let mut builder = LogicBuilder::new(tree, logic, &exclude);
            let src = if let Some(kind) = id.mesh_logic() {
                Some(builder.mesh_logic(kind, attribute, setting)?)
            } else if let Some(mode) = id.pbr_mode() {
                Some(builder.pbr_conversion(mode, setting.pbr_conv_threshold)?)
            } else if id == ChannelId::NodeGroup {
                builder.node_group(node_groups, setting)
            } else {
                Some(builder.socket_source(id, Some(setting))?)
            };
            if let Some(src) = src {
                tree.link(src, SocketRef::new(nodes.emission, "Color"))?;
            }
        }
        Ok(())
    }

    /// Park a texture node bound to a shared dummy image in every inactive,
    /// local material of `objects`, so the renderer never targets a stray
    /// node there.
    pub fn setup_protection(&mut self, objects: &[ObjectId], active: &[MaterialId]) -> BakeResult<()> {
        let dummy = match self.scene.find_image(PROTECTION_IMAGE) {
            Some(id) => id,
            None => self
                .scene
                .add_image(Image::new(PROTECTION_IMAGE, Resolution::new(32, 32), true)?),
        };
        if let Some(img) = self.scene.image_mut(dummy) {
            img.fake_user = false;
        }

        let mut inactive = Vec::new();
        for &obj in objects {
            let Some(object) = self.scene.object(obj).filter(|o| o.is_mesh()) else {
                continue;
            };
            for mat in object.materials() {
                if !active.contains(&mat) && !inactive.contains(&mat) {
                    inactive.push(mat);
                }
            }
        }

        for mat_id in inactive {
            if self.protection.contains_key(&mat_id) {
                continue;
            }
            let Some(mat) = self.scene.material_mut(mat_id) else {
                continue;
            };
            if !mat.use_nodes || mat.is_linked() {
                continue;
            }
            let tree = &mut mat.node_tree;
            self.previous_active.entry(mat_id).or_insert(tree.active);
            let node = add_labeled(tree, NodeKind::TexImage, PROTECTION_LABEL);
            if let Some(n) = tree.node_mut(node) {
                n.image = Some(dummy);
            }
            tree.active = Some(node);
            self.protection.insert(mat_id, vec![node]);
            tracing::debug!(material = %mat.name, "protection node added");
        }
        Ok(())
    }

    fn cleanup(&mut self) {
        let touched: Vec<MaterialId> = self
            .session
            .keys()
            .chain(self.protection.keys())
            .copied()
            .collect();

        for mat_id in touched {
            let Some(mat) = self.scene.material_mut(mat_id) else {
                tracing::warn!("material removed before graph cleanup");
                continue;
            };
            let tree = &mut mat.node_tree;

            if let Some(mut nodes) = self.logic.remove(&mat_id) {
                remove_nodes(tree, &mut nodes, &mat.name);
            }
            if let Some(s) = self.session.remove(&mat_id) {
                remove_nodes(tree, &mut vec![s.tex, s.emission], &mat.name);
            }
            if let Some(mut nodes) = self.protection.remove(&mat_id) {
                remove_nodes(tree, &mut nodes, &mat.name);
            }

            if let Some(original) = self.original.remove(&mat_id) {
                restore_link(tree, original, &mat.name);
            }
            if let Some(active) = self.previous_active.remove(&mat_id) {
                tree.active = active.filter(|&n| tree.contains(n));
            }
        }

        for (obj, name) in self.temp_attributes.drain(..) {
            let removed = self
                .scene
                .object_mut(obj)
                .and_then(|o| o.mesh_mut())
                .is_some_and(|m| m.remove_attribute(&name));
            if !removed {
                tracing::warn!(attribute = %name, "temporary attribute already gone");
            }
        }

        if let Some(dummy) = self.scene.find_image(PROTECTION_IMAGE)
            && self.scene.image_users(dummy) == 0
        {
            self.scene.remove_image(dummy);
        }
    }
}

fn add_labeled(tree: &mut NodeTree, kind: NodeKind, label: &str) -> NodeId {
    let id = tree.add(kind);
    if let Some(node) = tree.node_mut(id) {
        node.label = label.to_string();
    }
    id
}

fn remove_nodes(tree: &mut NodeTree, nodes: &mut Vec<NodeId>, material: &str) {
    for id in nodes.drain(..) {
        if let Err(err) = tree.remove(id) {
            tracing::warn!(%material, %err, "failed to remove temporary node");
        }
    }
}

fn restore_link(tree: &mut NodeTree, original: Option<SocketRef>, material: &str) {
    let Some(out) = tree.material_output() else {
        tracing::warn!(%material, "material output gone, link not restored");
        return;
    };
    let surface = SocketRef::new(out, SURFACE);
    match original {
        Some(src) if tree.contains(src.node) => {
            if let Err(err) = tree.link(src, surface) {
                tracing::warn!(%material, %err, "failed to restore output link");
            }
        }
        Some(_) => tracing::warn!(%material, "original source node gone, link not restored"),
        None => tree.unlink_input(&surface),
    }
}

impl Deref for GraphSession<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for GraphSession<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for GraphSession<'_> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/editor.rs"]
mod tests;
