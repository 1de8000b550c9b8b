use super::*;
use crate::foundation::core::Resolution;
use crate::scene::{Image, Mesh};

fn scene_with_target(materials: &[&str]) -> (Scene, BakeTask) {
    let mut scene = Scene::default();
    let obj = scene.add_mesh_object("Crate", Mesh::plane());
    for name in materials {
        let mat = scene.add_material(Material::principled(*name));
        scene.assign_material(obj, mat).unwrap();
    }
    let task = BakeTask {
        objects: vec![obj],
        materials: scene.object(obj).unwrap().materials(),
        active: obj,
        base_name: "Crate".to_string(),
        folder_name: "Crate".to_string(),
    };
    (scene, task)
}

fn add_image(scene: &mut Scene, name: &str) -> ImageId {
    scene.add_image(Image::new(name, Resolution::new(2, 2), true).unwrap())
}

fn source_kind(scene: &Scene, mat: MaterialId, input: &str) -> Option<NodeKind> {
    let m = scene.material(mat).unwrap();
    let bsdf = m.principled_bsdf().unwrap();
    let src = m.node_tree.source_of(&SocketRef::new(bsdf, input))?;
    m.node_tree.node(src.node).map(|n| n.kind.clone())
}

#[test]
fn single_slot_target_gets_shared_material() {
    let (mut scene, task) = scene_with_target(&["Wood"]);
    let mut results = BTreeMap::new();
    let color = add_image(&mut scene, "Crate_color");
    let rough = add_image(&mut scene, "Crate_rough");
    let gloss = add_image(&mut scene, "Crate_gloss");
    let normal = add_image(&mut scene, "Crate_normal");
    let alpha = add_image(&mut scene, "Crate_alpha");
    results.insert("color".to_string(), color);
    results.insert("rough".to_string(), rough);
    results.insert("gloss".to_string(), gloss);
    results.insert("normal".to_string(), normal);
    results.insert("alpha".to_string(), alpha);

    let id = apply_baked_result(&mut scene, &task, &results).unwrap();
    let object = scene.object(id).unwrap();
    assert_eq!(object.name, "Crate_Baked");
    assert_eq!(scene.collections[RESULT_COLLECTION], vec![id]);
    let mat = object.primary_material().unwrap();
    assert_eq!(scene.material(mat).unwrap().name, "Crate_Mat");
    assert_eq!(scene.material(mat).unwrap().blend_method, BlendMethod::Blend);

    assert_eq!(source_kind(&scene, mat, "Base Color"), Some(NodeKind::TexImage));
    // Roughness was claimed before gloss, so no invert node is involved.
    assert_eq!(source_kind(&scene, mat, "Roughness"), Some(NodeKind::TexImage));
    assert_eq!(source_kind(&scene, mat, "Normal"), Some(NodeKind::NormalMap));

    assert_eq!(scene.image(rough).unwrap().color_space, ColorSpace::NonColor);
    assert_eq!(scene.image(normal).unwrap().color_space, ColorSpace::NonColor);
    assert_eq!(scene.image(color).unwrap().color_space, ColorSpace::Srgb);
}

#[test]
fn gloss_alone_is_inverted_into_roughness() {
    let (mut scene, task) = scene_with_target(&["Wood"]);
    let gloss = add_image(&mut scene, "Crate_gloss");
    let results = BTreeMap::from([("gloss".to_string(), gloss)]);
    let id = apply_baked_result(&mut scene, &task, &results).unwrap();
    let mat = scene.object(id).unwrap().primary_material().unwrap();
    assert_eq!(source_kind(&scene, mat, "Roughness"), Some(NodeKind::Invert));
}

#[test]
fn multi_slot_target_gets_one_material_per_slot_and_reapply_replaces() {
    let (mut scene, task) = scene_with_target(&["Wood", "Metal"]);
    let color = add_image(&mut scene, "Crate_color");
    let results = BTreeMap::from([("color".to_string(), color)]);

    let first = apply_baked_result(&mut scene, &task, &results).unwrap();
    let names: Vec<String> = scene
        .object(first)
        .unwrap()
        .materials()
        .iter()
        .map(|&m| scene.material(m).unwrap().name.clone())
        .collect();
    assert_eq!(names, vec!["Crate_Wood_Baked", "Crate_Metal_Baked"]);

    let objects_before = scene.objects.len();
    let materials_before = scene.materials.len();
    let second = apply_baked_result(&mut scene, &task, &results).unwrap();
    assert!(scene.object(first).is_none());
    assert!(scene.object(second).is_some());
    assert_eq!(scene.objects.len(), objects_before);
    assert_eq!(scene.materials.len(), materials_before);
    assert_eq!(scene.collections[RESULT_COLLECTION], vec![second]);
}
