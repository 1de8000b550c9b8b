use super::*;
use crate::foundation::core::Rgba;
use crate::scene::Material;

fn build<R>(tree: &mut NodeTree, f: impl FnOnce(&mut LogicBuilder<'_>) -> R) -> (R, Vec<NodeId>) {
    let mut created = Vec::new();
    let out = {
        let mut builder = LogicBuilder::new(tree, &mut created, &[]);
        f(&mut builder)
    };
    (out, created)
}

fn rgb_color(tree: &NodeTree, src: &SocketRef) -> Rgba {
    match tree.node(src.node).unwrap().kind {
        NodeKind::Rgb { color } => color,
        ref other => panic!("expected RGB node, got {other:?}"),
    }
}

#[test]
fn principled_default_becomes_constant() {
    let mut mat = Material::principled_with("M", "Roughness", SocketValue::Float(0.3));
    let (src, created) = build(&mut mat.node_tree, |b| {
        b.socket_source(ChannelId::Rough, None).unwrap()
    });
    assert_eq!(created.len(), 1);
    assert_eq!(rgb_color(&mat.node_tree, &src), [0.3, 0.3, 0.3, 1.0]);
    assert_eq!(mat.node_tree.node(src.node).unwrap().label, LOGIC_LABEL);
}

#[test]
fn linked_input_uses_upstream_source() {
    let mut mat = Material::principled("M");
    let tree = &mut mat.node_tree;
    let bsdf = mat_bsdf(tree);
    let rgb = tree.add(NodeKind::Rgb {
        color: [0.1, 0.2, 0.3, 1.0],
    });
    tree.link(SocketRef::new(rgb, "Color"), SocketRef::new(bsdf, "Base Color"))
        .unwrap();

    let (src, created) = build(tree, |b| b.socket_source(ChannelId::Color, None).unwrap());
    assert!(created.is_empty());
    assert_eq!(src, SocketRef::new(rgb, "Color"));
}

fn mat_bsdf(tree: &NodeTree) -> NodeId {
    tree.find_kind(|k| matches!(k, NodeKind::PrincipledBsdf))
        .unwrap()
        .id
}

#[test]
fn emission_fallback_skips_excluded_nodes() {
    let mut tree = NodeTree::default();
    let session = tree.add(NodeKind::Emission);
    let (src, _) = {
        let mut created = Vec::new();
        let exclude = [session];
        let src = LogicBuilder::new(&mut tree, &mut created, &exclude)
            .socket_source(ChannelId::Emi, None)
            .unwrap();
        (src, created)
    };
    // Only the session emission exists, so the static default is used.
    assert_eq!(rgb_color(&tree, &src), ChannelId::Emi.socket_default());

    let user = tree.add(NodeKind::Emission);
    tree.node_mut(user)
        .unwrap()
        .set_input("Color", SocketValue::Color([0.0, 1.0, 0.0, 1.0]))
        .unwrap();
    let mut created = Vec::new();
    let exclude = [session];
    let src = LogicBuilder::new(&mut tree, &mut created, &exclude)
        .socket_source(ChannelId::Emi, None)
        .unwrap();
    assert_eq!(rgb_color(&tree, &src), [0.0, 1.0, 0.0, 1.0]);
}

#[test]
fn rough_invert_inserts_invert_node() {
    let mut mat = Material::principled("M");
    let setting = ChannelSetting {
        rough_inv: true,
        ..ChannelSetting::new(ChannelId::Rough, true)
    };
    let (src, created) = build(&mut mat.node_tree, |b| {
        b.socket_source(ChannelId::Rough, Some(&setting)).unwrap()
    });
    assert_eq!(created.len(), 2);
    let inv = mat.node_tree.node(src.node).unwrap();
    assert!(matches!(inv.kind, NodeKind::Invert));
    assert!(mat.node_tree.source_of(&SocketRef::new(src.node, "Color")).is_some());
}

#[test]
fn pbr_cluster_ends_in_clamp_or_mix() {
    let mut mat = Material::principled("M");
    let (metal, created) = build(&mut mat.node_tree, |b| {
        b.pbr_conversion(PbrMode::Metal, 0.04).unwrap()
    });
    assert!(matches!(
        mat.node_tree.node(metal.node).unwrap().kind,
        NodeKind::Clamp
    ));
    // specular constant, separate, two max, subtract, divide, clamp
    assert_eq!(created.len(), 7);

    let mut mat = Material::principled("M");
    let (base, _) = build(&mut mat.node_tree, |b| {
        b.pbr_conversion(PbrMode::BaseColor, 0.04).unwrap()
    });
    assert!(matches!(
        mat.node_tree.node(base.node).unwrap().kind,
        NodeKind::MixRgb
    ));
}

#[test]
fn mesh_logic_nodes_carry_settings() {
    let mut tree = NodeTree::default();
    let s = ChannelSetting {
        ao_sample: 32,
        ao_dis: 2.0,
        ..ChannelSetting::new(ChannelId::Ao, true)
    };
    let (src, _) = build(&mut tree, |b| b.mesh_logic(MeshLogic::Ao, None, &s).unwrap());
    let node = tree.node(src.node).unwrap();
    assert!(matches!(node.kind, NodeKind::AmbientOcclusion { samples: 32, .. }));
    assert_eq!(node.input("Distance").unwrap().value, SocketValue::Float(2.0));

    let (src, _) = build(&mut tree, |b| {
        b.mesh_logic(
            MeshLogic::Id(crate::channels::IdKind::Mat),
            Some("BT_ATTR_MAT"),
            &s,
        )
        .unwrap()
    });
    assert!(matches!(
        &tree.node(src.node).unwrap().kind,
        NodeKind::Attribute { attribute_name } if attribute_name == "BT_ATTR_MAT"
    ));

    let slope = ChannelSetting {
        slope_direction: Axis::Y,
        slope_invert: true,
        ..ChannelSetting::new(ChannelId::Slope, true)
    };
    let (src, created) = build(&mut tree, |b| b.mesh_logic(MeshLogic::Slope, None, &slope).unwrap());
    assert_eq!(created.len(), 3);
    let sub = SocketRef::new(src.node, "Value_001");
    assert_eq!(tree.source_of(&sub).unwrap().socket, "Y");
}

#[test]
fn node_group_output_selection() {
    let mut groups = BTreeMap::new();
    groups.insert(
        "Wear".to_string(),
        NodeGroup {
            name: "Wear".to_string(),
            outputs: vec![
                ("Mask".to_string(), SocketValue::Float(0.5)),
                ("Tint".to_string(), SocketValue::Color([1.0, 0.0, 0.0, 1.0])),
            ],
        },
    );
    let mut tree = NodeTree::default();
    let mut s = ChannelSetting::new(ChannelId::NodeGroup, true);
    s.node_group = Some("Wear".to_string());

    let (src, _) = build(&mut tree, |b| b.node_group(&groups, &s));
    assert_eq!(src.unwrap().socket, "Mask");

    s.node_group_output = Some("Tint".to_string());
    let (src, _) = build(&mut tree, |b| b.node_group(&groups, &s));
    assert_eq!(src.unwrap().socket, "Tint");

    s.node_group = Some("Missing".to_string());
    let (src, created) = build(&mut tree, |b| b.node_group(&groups, &s));
    assert!(src.is_none());
    assert!(created.is_empty());
}
