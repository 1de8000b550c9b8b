use super::*;
use crate::foundation::core::Resolution;

#[test]
fn stale_object_handle_is_missing() {
    let mut scene = Scene::default();
    let id = scene.add_mesh_object("Cube", Mesh::plane());
    assert_eq!(scene.find_object("Cube"), Some(id));
    scene.remove_object(id);
    assert!(scene.object(id).is_none());
    assert_eq!(scene.object_name(id), "<missing>");
}

#[test]
fn image_users_count_nodes_and_fake_user() {
    let mut scene = Scene::default();
    let img = scene.add_image(Image::new("img", Resolution::new(2, 2), true).unwrap());
    let mut mat = Material::principled("M");
    let tex = mat.node_tree.add(NodeKind::TexImage);
    mat.node_tree.node_mut(tex).unwrap().image = Some(img);
    let mat_id = scene.add_material(mat);
    assert_eq!(scene.image_users(img), 1);

    scene.image_mut(img).unwrap().fake_user = true;
    assert_eq!(scene.image_users(img), 2);

    scene.remove_image(img);
    let tree = &scene.material(mat_id).unwrap().node_tree;
    assert!(tree.nodes.iter().all(|n| n.image.is_none()));
}

#[test]
fn abspath_resolves_relative_to_scene_file() {
    let scene = Scene {
        filepath: Some(PathBuf::from("/work/shots/scene.blend")),
        ..Scene::default()
    };
    assert_eq!(scene.abspath("//tex"), PathBuf::from("/work/shots/tex"));
    assert_eq!(scene.abspath("/abs/tex"), PathBuf::from("/abs/tex"));
}

#[test]
fn scene_json_roundtrip_preserves_handles() {
    let mut scene = Scene::default();
    let obj = scene.add_mesh_object("Cube", Mesh::plane());
    let mat = scene.add_material(Material::principled("M"));
    scene.assign_material(obj, mat).unwrap();

    let json = serde_json::to_string(&scene).unwrap();
    let back: Scene = serde_json::from_str(&json).unwrap();
    let o = back.object(obj).unwrap();
    assert_eq!(o.materials(), vec![mat]);
    assert!(back.material(mat).unwrap().principled_bsdf().is_some());
}
