use super::*;

#[test]
fn string_ids_roundtrip_through_serde_and_from_str() {
    for id in ChannelId::ALL {
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_str()));
        assert_eq!(id.as_str().parse::<ChannelId>().unwrap(), id);
    }
    assert!("bogus".parse::<ChannelId>().is_err());
}

#[test]
fn pass_and_category_tables() {
    assert_eq!(ChannelId::Color.bake_pass(), BakePass::Emit);
    assert_eq!(ChannelId::Normal.bake_pass(), BakePass::Normal);
    assert_eq!(ChannelId::Height.bake_pass(), BakePass::Displacement);
    assert_eq!(ChannelId::Ao.category(), Category::Light);
    assert_eq!(ChannelId::IdSeam.category(), Category::Mesh);
    assert_eq!(ChannelId::PbrConvMetal.category(), Category::Extension);
}

#[test]
fn sort_tiers_put_ids_first_and_conversions_last() {
    assert_eq!(ChannelId::IdMat.sort_tier(), SortTier::Id);
    assert_eq!(ChannelId::Color.sort_tier(), SortTier::Regular);
    assert_eq!(ChannelId::PbrConvBase.sort_tier(), SortTier::Derived);
    assert!(SortTier::Id < SortTier::Regular && SortTier::Regular < SortTier::Derived);
}

#[test]
fn mesh_logic_and_id_kinds() {
    assert_eq!(ChannelId::Bevnor.mesh_logic(), Some(MeshLogic::Bevel));
    assert_eq!(
        ChannelId::IdUvi.mesh_logic(),
        Some(MeshLogic::Id(IdKind::Uvi))
    );
    assert_eq!(ChannelId::Rough.mesh_logic(), None);
    assert_eq!(IdKind::Seam.attribute_name(), "BT_ATTR_SEAM");
}

#[test]
fn color_defaults() {
    assert_eq!(ChannelId::Color.default_color_space(), ColorSpace::Srgb);
    assert_eq!(ChannelId::Rough.default_color_space(), ColorSpace::NonColor);
    assert_eq!(ChannelId::Rough.default_color_mode(), ColorMode::Bw);
    assert_eq!(ChannelId::Normal.socket_default(), [0.5, 0.5, 1.0, 1.0]);
}

#[test]
fn definition_groups_have_unique_ids() {
    for group in [
        DefinitionGroup::Bsdf,
        DefinitionGroup::Basic,
        DefinitionGroup::Light,
        DefinitionGroup::Mesh,
        DefinitionGroup::Extension,
    ] {
        let defs = definitions(group);
        let mut ids: Vec<_> = defs.iter().map(|d| d.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), defs.len());
    }
    assert!(
        definitions(DefinitionGroup::Bsdf)
            .iter()
            .any(|d| d.id == ChannelId::Color && d.enabled)
    );
}
