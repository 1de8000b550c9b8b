use std::collections::BTreeMap;

use crate::channels::ChannelId;
use crate::compile::BakeTask;
use crate::foundation::core::ColorSpace;
use crate::foundation::error::{BakeError, BakeResult};
use crate::scene::{
    BlendMethod, ImageId, Material, MaterialId, NodeKind, ObjectId, Scene, SocketRef, SocketValue,
};

/// Collection receiving objects built from bake results.
pub const RESULT_COLLECTION: &str = "Baked_Results";

/// Channels tagged Non-Color when wired into the result material.
const DATA_CHANNELS: [ChannelId; 8] = [
    ChannelId::Metal,
    ChannelId::Rough,
    ChannelId::Normal,
    ChannelId::Specular,
    ChannelId::Ao,
    ChannelId::Height,
    ChannelId::Gloss,
    ChannelId::Bevnor,
];

/// Wiring order; the first channel reaching a BSDF input wins it.
const APPLY_ORDER: [ChannelId; 12] = [
    ChannelId::Color,
    ChannelId::Diff,
    ChannelId::Combine,
    ChannelId::Ao,
    ChannelId::Metal,
    ChannelId::Rough,
    ChannelId::Gloss,
    ChannelId::Specular,
    ChannelId::Emi,
    ChannelId::Alpha,
    ChannelId::Normal,
    ChannelId::Bevnor,
];

fn bsdf_input(id: ChannelId) -> Option<&'static str> {
    match id {
        ChannelId::Color | ChannelId::Diff | ChannelId::Combine | ChannelId::Ao => {
            Some("Base Color")
        }
        ChannelId::Metal => Some("Metallic"),
        ChannelId::Rough | ChannelId::Gloss => Some("Roughness"),
        ChannelId::Specular => Some("Specular IOR Level"),
        ChannelId::Emi => Some("Emission Color"),
        ChannelId::Alpha => Some("Alpha"),
        ChannelId::Normal | ChannelId::Bevnor => Some("Normal"),
        _ => None,
    }
}

/// Build `<base>_Baked`, a copy of the task's target object whose materials
/// sample the produced textures, and link it into [`RESULT_COLLECTION`].
///
/// A single-slot object gets one `<base>_Mat`; multi-slot objects get one
/// `<base>_<material>_Baked` per original slot so face assignments survive.
/// Earlier results with the same names are replaced.
pub fn apply_baked_result(
    scene: &mut Scene,
    task: &BakeTask,
    results: &BTreeMap<String, ImageId>,
) -> BakeResult<ObjectId> {
    let source = scene
        .object(task.active)
        .ok_or_else(|| BakeError::validation("bake target object is gone"))?
        .clone();
    let base = &task.base_name;

    let slots: Vec<MaterialId> = if source.material_slots.len() > 1 {
        let mut slots = Vec::with_capacity(source.material_slots.len());
        for slot in &source.material_slots {
            let original = slot
                .and_then(|m| scene.material(m))
                .map(|m| m.name.clone())
                .unwrap_or_else(|| String::from("NoMat"));
            slots.push(build_material(scene, &format!("{base}_{original}_Baked"), results)?);
        }
        slots
    } else {
        vec![build_material(scene, &format!("{base}_Mat"), results)?]
    };

    let name = format!("{base}_Baked");
    if let Some(old) = scene.find_object(&name) {
        scene.remove_object(old);
    }
    let mut object = source;
    object.name = name;
    object.material_slots = slots.into_iter().map(Some).collect();
    let id = scene.add_object(object);
    scene.link_to_collection(RESULT_COLLECTION, id);
    tracing::info!(object = %scene.object_name(id), "applied bake result");
    Ok(id)
}

fn build_material(
    scene: &mut Scene,
    name: &str,
    results: &BTreeMap<String, ImageId>,
) -> BakeResult<MaterialId> {
    if let Some(old) = scene.find_material(name) {
        scene.materials.remove(old);
    }
    let mut mat = Material::principled(name);
    let bsdf = mat
        .principled_bsdf()
        .ok_or_else(|| BakeError::graph("principled node missing from new material"))?;

    for id in APPLY_ORDER {
        let (Some(&image), Some(input)) = (results.get(id.as_str()), bsdf_input(id)) else {
            continue;
        };
        let target = SocketRef::new(bsdf, input);
        let tree = &mut mat.node_tree;
        if tree.source_of(&target).is_some() {
            continue;
        }

        let tex = tree.add(NodeKind::TexImage);
        if let Some(node) = tree.node_mut(tex) {
            node.image = Some(image);
        }
        let color = SocketRef::new(tex, "Color");
        match id {
            ChannelId::Gloss => {
                let inv = tree.add(NodeKind::Invert);
                tree.link(color, SocketRef::new(inv, "Color"))?;
                tree.link(SocketRef::new(inv, "Color"), target)?;
            }
            ChannelId::Normal | ChannelId::Bevnor => {
                let map = tree.add(NodeKind::NormalMap);
                tree.link(color, SocketRef::new(map, "Color"))?;
                tree.link(SocketRef::new(map, "Normal"), target)?;
            }
            ChannelId::Alpha => {
                tree.link(color, target)?;
                mat.blend_method = BlendMethod::Blend;
            }
            ChannelId::Emi => {
                tree.link(color, target)?;
                if let Some(node) = tree.node_mut(bsdf) {
                    node.set_input("Emission Strength", SocketValue::Float(1.0))?;
                }
            }
            _ => tree.link(color, target)?,
        }

        if DATA_CHANNELS.contains(&id)
            && let Some(img) = scene.image_mut(image)
            && img.color_space == ColorSpace::Srgb
        {
            img.color_space = ColorSpace::NonColor;
        }
    }
    Ok(scene.add_material(mat))
}

#[cfg(test)]
#[path = "../../tests/unit/bake/apply.rs"]
mod tests;
