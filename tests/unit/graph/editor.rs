use super::*;
use crate::foundation::core::Resolution;
use crate::graph::LOGIC_LABEL;
use crate::scene::{Attribute, AttributeDomain, AttributeType, Material, Mesh};

fn fixture() -> (Scene, ObjectId, MaterialId, ImageId) {
    let mut scene = Scene::default();
    let obj = scene.add_mesh_object("Crate", Mesh::plane().with_uv_from_positions("UVMap"));
    let mat = scene.add_material(Material::principled("Wood"));
    scene.assign_material(obj, mat).unwrap();
    let img = scene.add_image(Image::new("Target", Resolution::new(4, 4), true).unwrap());
    (scene, obj, mat, img)
}

fn surface_source(scene: &Scene, mat: MaterialId) -> Option<SocketRef> {
    let tree = &scene.material(mat).unwrap().node_tree;
    let out = tree.material_output().unwrap();
    tree.source_of(&SocketRef::new(out, "Surface")).cloned()
}

fn labelled(scene: &Scene, mat: MaterialId, label: &str) -> usize {
    scene
        .material(mat)
        .unwrap()
        .node_tree
        .nodes
        .iter()
        .filter(|n| n.label == label)
        .count()
}

#[test]
fn emit_setup_rewires_and_drop_restores() {
    let (mut scene, _, mat, img) = fixture();
    let bsdf = scene.material(mat).unwrap().principled_bsdf().unwrap();
    let before = surface_source(&scene, mat);
    {
        let mut session = GraphSession::enter(&mut scene, &[mat]);
        let rough = ChannelSetting::new(ChannelId::Rough, true);
        session
            .setup_for_pass(BakePass::Emit, ChannelId::Rough, &rough, img, None)
            .unwrap();

        let src = surface_source(&session, mat).unwrap();
        let tree = &session.material(mat).unwrap().node_tree;
        assert_eq!(tree.node(src.node).unwrap().label, SESSION_LABEL);
        let tex = session.target_node(mat).unwrap();
        assert_eq!(tree.active, Some(tex));
        assert_eq!(tree.node(tex).unwrap().image, Some(img));
        assert_eq!(labelled(&session, mat, LOGIC_LABEL), 1);

        // The next channel replaces the logic chain rather than stacking on it.
        let metal = ChannelSetting::new(ChannelId::Metal, true);
        session
            .setup_for_pass(BakePass::Emit, ChannelId::Metal, &metal, img, None)
            .unwrap();
        assert_eq!(labelled(&session, mat, LOGIC_LABEL), 1);
    }
    assert_eq!(surface_source(&scene, mat), before);
    assert_eq!(before.unwrap().node, bsdf);
    assert_eq!(labelled(&scene, mat, SESSION_LABEL), 0);
    assert_eq!(labelled(&scene, mat, LOGIC_LABEL), 0);
    let tree = &scene.material(mat).unwrap().node_tree;
    assert_eq!(tree.nodes.len(), 2);
    assert_eq!(tree.active, None);
}

#[test]
fn drop_after_failed_setup_still_restores() {
    let (mut scene, _, mat, img) = fixture();
    let before = surface_source(&scene, mat);
    let result = {
        let mut session = GraphSession::enter(&mut scene, &[mat]);
        let tex = session.target_node(mat).unwrap();
        session
            .material_mut(mat)
            .unwrap()
            .node_tree
            .remove(tex)
            .unwrap();
        let color = ChannelSetting::new(ChannelId::Color, true);
        session.setup_for_pass(BakePass::Emit, ChannelId::Color, &color, img, None)
    };
    assert!(matches!(result, Err(BakeError::Graph(_))));
    assert_eq!(surface_source(&scene, mat), before);
    assert_eq!(labelled(&scene, mat, SESSION_LABEL), 0);
    assert_eq!(labelled(&scene, mat, LOGIC_LABEL), 0);
}

#[test]
fn protection_parks_dummy_in_inactive_materials() {
    let (mut scene, obj, mat, _) = fixture();
    let other = scene.add_material(Material::principled("Metal"));
    scene.assign_material(obj, other).unwrap();
    let linked = scene.add_material(Material {
        library: Some("library.blend".into()),
        ..Material::principled("Linked")
    });
    scene.assign_material(obj, linked).unwrap();
    {
        let mut session = GraphSession::enter(&mut scene, &[mat]);
        session.setup_protection(&[obj], &[mat]).unwrap();
        let dummy = session.find_image(PROTECTION_IMAGE).unwrap();
        let tree = &session.material(other).unwrap().node_tree;
        let node = tree.node(tree.active.unwrap()).unwrap();
        assert_eq!(node.label, PROTECTION_LABEL);
        assert_eq!(node.image, Some(dummy));
        assert_eq!(labelled(&session, linked, PROTECTION_LABEL), 0);
        assert_eq!(labelled(&session, mat, PROTECTION_LABEL), 0);

        session.setup_protection(&[obj], &[mat]).unwrap();
        assert_eq!(labelled(&session, other, PROTECTION_LABEL), 1);
    }
    assert_eq!(labelled(&scene, other, PROTECTION_LABEL), 0);
    assert_eq!(scene.material(other).unwrap().node_tree.active, None);
    assert!(scene.find_image(PROTECTION_IMAGE).is_none());
}

#[test]
fn missing_original_source_leaves_output_unlinked() {
    let (mut scene, _, mat, img) = fixture();
    {
        let mut session = GraphSession::enter(&mut scene, &[mat]);
        let color = ChannelSetting::new(ChannelId::Color, true);
        session
            .setup_for_pass(BakePass::Emit, ChannelId::Color, &color, img, None)
            .unwrap();
        let bsdf = session.material(mat).unwrap().principled_bsdf().unwrap();
        session
            .material_mut(mat)
            .unwrap()
            .node_tree
            .remove(bsdf)
            .unwrap();
    }
    assert!(surface_source(&scene, mat).is_none());
    assert_eq!(labelled(&scene, mat, SESSION_LABEL), 0);
}

#[test]
fn normal_pass_keeps_surface_and_tracked_attributes_are_removed() {
    let (mut scene, obj, mat, img) = fixture();
    let plain = scene.add_material(Material {
        use_nodes: false,
        ..Material::new("Plain")
    });
    let bsdf = scene.material(mat).unwrap().principled_bsdf().unwrap();
    scene
        .object_mut(obj)
        .unwrap()
        .mesh_mut()
        .unwrap()
        .add_attribute(Attribute {
            name: "BT_ATTR_MAT".into(),
            domain: AttributeDomain::Corner,
            data_type: AttributeType::ByteColor,
            values: Vec::new(),
        });
    {
        let mut session = GraphSession::enter(&mut scene, &[mat, plain]);
        assert_eq!(session.materials(), &[mat]);
        session.track_attribute(obj, "BT_ATTR_MAT");
        session.track_attribute(obj, "BT_ATTR_MAT");
        let normal = ChannelSetting::new(ChannelId::Normal, true);
        session
            .setup_for_pass(BakePass::Normal, ChannelId::Normal, &normal, img, None)
            .unwrap();
        assert_eq!(surface_source(&session, mat).unwrap().node, bsdf);
        assert_eq!(labelled(&session, mat, LOGIC_LABEL), 0);
    }
    let mesh = scene.object(obj).unwrap().mesh().unwrap();
    assert!(mesh.attribute("BT_ATTR_MAT").is_none());
    assert!(scene.material(plain).unwrap().node_tree.nodes.is_empty());
}
