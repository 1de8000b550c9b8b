use super::*;
use crate::config::BakeObject;
use crate::render::PlanarUnwrapper;
use crate::scene::Mesh;

fn uv_names(scene: &Scene, obj: ObjectId) -> Vec<String> {
    scene
        .object(obj)
        .unwrap()
        .mesh()
        .unwrap()
        .uv_layers
        .iter()
        .map(|l| l.name.clone())
        .collect()
}

#[test]
fn temp_layer_lives_only_inside_scope() {
    let mut scene = Scene::default();
    let mut mesh = Mesh::plane().with_uv_from_positions("Second");
    mesh.active_uv = Some(1);
    mesh.active_render_uv = Some(0);
    let obj = scene.add_mesh_object("Plane", mesh);
    let setting = JobSetting::default();

    {
        let guard =
            UvLayoutGuard::enter(&mut scene, &[obj], &setting, &mut PlanarUnwrapper).unwrap();
        let mesh = guard.object(obj).unwrap().mesh().unwrap();
        assert_eq!(mesh.uv_layers.len(), 3);
        assert_eq!(mesh.active_uv, Some(2));
        assert_eq!(mesh.active_render_uv, Some(2));
        assert_eq!(mesh.uv_layers[2].name, TEMP_UV_LAYER);
    }

    assert_eq!(uv_names(&scene, obj), vec!["UVMap", "Second"]);
    let mesh = scene.object(obj).unwrap().mesh().unwrap();
    assert_eq!(mesh.active_uv, Some(1));
    assert_eq!(mesh.active_render_uv, Some(0));
}

#[test]
fn full_meshes_keep_their_layers() {
    let mut scene = Scene::default();
    let mut mesh = Mesh::plane();
    for i in 1..MAX_UV_LAYERS {
        mesh = mesh.with_uv_from_positions(&format!("UV{i}"));
    }
    let obj = scene.add_mesh_object("Full", mesh);
    {
        let guard = UvLayoutGuard::enter(
            &mut scene,
            &[obj],
            &JobSetting::default(),
            &mut PlanarUnwrapper,
        )
        .unwrap();
        assert!(!uv_names(&guard, obj).iter().any(|n| n == TEMP_UV_LAYER));
    }
    assert_eq!(uv_names(&scene, obj).len(), MAX_UV_LAYERS);
}

#[test]
fn repack_moves_scratch_layer_only() {
    let mut scene = Scene::default();
    let a = scene.add_mesh_object("A", Mesh::grid(2, 2));
    let b = scene.add_mesh_object("B", Mesh::grid(2, 2));
    let setting = JobSetting {
        bake_mode: BakeMode::Udim,
        udim_mode: UdimMode::Repack,
        ..JobSetting::default()
    };
    // Grid corners sit on the tile border; nudge them inside.
    for obj in [a, b] {
        for uv in &mut scene
            .object_mut(obj)
            .unwrap()
            .mesh_mut()
            .unwrap()
            .uv_layers[0]
            .data
        {
            *uv = Vec2::new(uv.x * 0.9 + 0.05, uv.y * 0.9 + 0.05);
        }
    }

    {
        let guard =
            UvLayoutGuard::enter(&mut scene, &[a, b], &setting, &mut PlanarUnwrapper).unwrap();
        assert_eq!(detect_tile(&guard, a), UdimTile(1001));
        assert_eq!(detect_tile(&guard, b), UdimTile(1002));
    }
    assert_eq!(detect_tile(&scene, b), UdimTile(1001));
}

#[test]
fn custom_tiles_follow_bake_objects() {
    let mut scene = Scene::default();
    let a = scene.add_mesh_object("A", Mesh::plane());
    for uv in &mut scene.object_mut(a).unwrap().mesh_mut().unwrap().uv_layers[0].data {
        *uv = Vec2::new(uv.x * 0.5 + 0.25, uv.y * 0.5 + 0.25);
    }
    let mut bo = BakeObject::new(a);
    bo.udim_tile = UdimTile(1023);
    let setting = JobSetting {
        bake_mode: BakeMode::Udim,
        udim_mode: UdimMode::Custom,
        bake_objects: vec![bo],
        ..JobSetting::default()
    };
    let guard = UvLayoutGuard::enter(&mut scene, &[a], &setting, &mut PlanarUnwrapper).unwrap();
    assert_eq!(detect_tile(&guard, a), UdimTile(1023));
}

#[test]
fn auto_unwrap_rewrites_scratch_layer() {
    let mut scene = Scene::default();
    let mut mesh = Mesh::plane();
    for uv in &mut mesh.uv_layers[0].data {
        *uv = Vec2::new(5.0, 5.0);
    }
    let obj = scene.add_mesh_object("Collapsed", mesh);
    let setting = JobSetting {
        use_auto_uv: true,
        auto_uv_margin: 0.0,
        ..JobSetting::default()
    };
    {
        let guard =
            UvLayoutGuard::enter(&mut scene, &[obj], &setting, &mut PlanarUnwrapper).unwrap();
        let layer = guard.object(obj).unwrap().mesh().unwrap().active_uv_layer().unwrap();
        assert!(layer.data.iter().all(|uv| uv.x <= 1.0 && uv.y <= 1.0));
    }
    let mesh = scene.object(obj).unwrap().mesh().unwrap();
    assert!(mesh.uv_layers[0].data.iter().all(|uv| *uv == Vec2::new(5.0, 5.0)));
}
