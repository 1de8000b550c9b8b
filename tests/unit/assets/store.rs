use super::*;
use crate::scene::EditorArea;

fn tiled_spec(tiles: &[u32]) -> ImageSpec {
    ImageSpec {
        tiles: Some(tiles.iter().map(|&t| UdimTile(t)).collect()),
        ..ImageSpec::new("Tiles", Resolution::new(8, 8))
    }
}

#[test]
fn creation_is_idempotent_by_name() {
    let mut scene = Scene::default();
    let spec = ImageSpec {
        color_space: ColorSpace::NonColor,
        base_color: [0.2, 0.2, 0.2, 1.0],
        ..ImageSpec::new("Rough", Resolution::new(4, 4))
    };
    let a = get_or_create_image(&mut scene, &spec).unwrap();
    let b = get_or_create_image(&mut scene, &spec).unwrap();
    assert_eq!(a, b);
    assert_eq!(scene.images.len(), 1);

    let image = scene.image(a).unwrap();
    assert_eq!(image.color_space, ColorSpace::NonColor);
    assert!(image.fake_user);
    assert_eq!(&image.pixels()[..4], &[0.2, 0.2, 0.2, 1.0]);
}

#[test]
fn reuse_resizes_and_clears() {
    let mut scene = Scene::default();
    let id = get_or_create_image(&mut scene, &ImageSpec::new("Img", Resolution::new(4, 4))).unwrap();
    scene.image_mut(id).unwrap().clear([1.0, 0.0, 0.0, 1.0]);

    let spec = ImageSpec::new("Img", Resolution::new(2, 3));
    let again = get_or_create_image(&mut scene, &spec).unwrap();
    assert_eq!(again, id);
    let image = scene.image(id).unwrap();
    assert_eq!(image.size(), Resolution::new(2, 3));
    assert!(image.pixels().chunks(4).all(|px| px == [0.0, 0.0, 0.0, 0.0]));
}

#[test]
fn float_images_stay_linear() {
    let mut scene = Scene::default();
    let spec = ImageSpec {
        float32: true,
        color_space: ColorSpace::Srgb,
        ..ImageSpec::new("Pos", Resolution::new(2, 2))
    };
    let id = get_or_create_image(&mut scene, &spec).unwrap();
    let image = scene.image(id).unwrap();
    assert!(image.float_buffer);
    assert_eq!(image.color_space, ColorSpace::Linear);
}

#[test]
fn tiling_mismatch_recreates_image() {
    let mut scene = Scene::default();
    let plain = get_or_create_image(&mut scene, &ImageSpec::new("Tiles", Resolution::new(8, 8))).unwrap();
    let tiled = get_or_create_image(&mut scene, &tiled_spec(&[1001])).unwrap();
    assert_ne!(plain, tiled);
    assert!(scene.image(plain).is_none());
    assert!(scene.image(tiled).unwrap().is_tiled());
}

#[test]
fn tiles_are_reconciled_with_overrides() {
    let mut scene = Scene::default();
    scene.areas.push(EditorArea {
        kind: EditorKind::Properties,
        image: None,
    });
    scene.areas.push(EditorArea {
        kind: EditorKind::View3d,
        image: None,
    });

    let mut spec = tiled_spec(&[1001, 1002, 1005]);
    spec.tile_resolutions.insert(UdimTile(1001), Resolution::new(16, 16));
    spec.tile_resolutions.insert(UdimTile(1005), Resolution::new(4, 2));
    let id = get_or_create_image(&mut scene, &spec).unwrap();
    let image = scene.image(id).unwrap();
    let tiles: Vec<u32> = image.tiles.keys().map(|t| t.0).collect();
    assert_eq!(tiles, vec![1001, 1002, 1005]);
    assert_eq!(image.size(), Resolution::new(16, 16));
    assert_eq!(image.tiles[&UdimTile(1002)].size, Resolution::new(8, 8));
    assert_eq!(image.tiles[&UdimTile(1005)].size, Resolution::new(4, 2));
    assert!(image.tiles.values().all(ImageTile::is_initialized));

    // The hijacked area got its kind back.
    assert_eq!(scene.areas[1].kind, EditorKind::View3d);
    assert_eq!(scene.areas[1].image, None);

    let id = get_or_create_image(&mut scene, &tiled_spec(&[1002])).unwrap();
    let tiles: Vec<u32> = scene.image(id).unwrap().tiles.keys().map(|t| t.0).collect();
    assert_eq!(tiles, vec![1002]);
}

#[test]
fn without_editor_area_tiles_are_bare() {
    let mut scene = Scene::default();
    let id = get_or_create_image(&mut scene, &tiled_spec(&[1001, 1003])).unwrap();
    let image = scene.image(id).unwrap();
    assert!(image.tiles[&UdimTile(1001)].is_initialized());
    assert!(!image.tiles[&UdimTile(1003)].is_initialized());
}

#[test]
fn context_prefers_current_area() {
    let mut scene = Scene::default();
    let img = scene
        .add_image(Image::new("I", Resolution::new(1, 1), true).unwrap());
    scene.areas.push(EditorArea {
        kind: EditorKind::ImageEditor,
        image: None,
    });
    scene.areas.push(EditorArea {
        kind: EditorKind::Outliner,
        image: None,
    });
    scene.current_area = Some(1);
    {
        let ctx = ImageEditorContext::acquire(&mut scene, img);
        assert!(ctx.is_valid());
        assert_eq!(ctx.areas[1].kind, EditorKind::ImageEditor);
        assert_eq!(ctx.areas[1].image, Some(img));
    }
    assert_eq!(scene.areas[1].kind, EditorKind::Outliner);
}
