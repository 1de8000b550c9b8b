use super::*;
use crate::config::BakeObject;
use crate::foundation::core::Vec2;
use crate::scene::Mesh;

fn shifted_plane(scene: &mut Scene, name: &str, du: f64, dv: f64) -> ObjectId {
    let mut mesh = Mesh::grid(2, 2);
    for uv in &mut mesh.active_uv_layer_mut().unwrap().data {
        // Keep corners strictly inside the tile so flooring is stable.
        *uv = Vec2::new(uv.x * 0.9 + 0.05 + du, uv.y * 0.9 + 0.05 + dv);
    }
    scene.add_mesh_object(name, mesh)
}

#[test]
fn detects_every_grid_cell() {
    let mut scene = Scene::default();
    for u in 0..10u32 {
        for v in 0..10u32 {
            let obj = shifted_plane(&mut scene, "P", f64::from(u), f64::from(v));
            assert_eq!(detect_tile(&scene, obj), UdimTile(1001 + u + 10 * v));
        }
    }
}

#[test]
fn out_of_grid_corners_are_ignored() {
    let mut scene = Scene::default();
    let mut mesh = Mesh::grid(1, 2);
    let layer = mesh.active_uv_layer_mut().unwrap();
    let n = layer.data.len();
    for (i, uv) in layer.data.iter_mut().enumerate() {
        *uv = if i < n - 2 {
            Vec2::new(-3.5, 0.5)
        } else {
            Vec2::new(2.5, 0.5)
        };
    }
    let obj = scene.add_mesh_object("Out", mesh);
    assert_eq!(detect_tile(&scene, obj), UdimTile(1003));
}

#[test]
fn missing_uvs_default_to_first_tile() {
    let mut scene = Scene::default();
    let mut mesh = Mesh::plane();
    mesh.uv_layers.clear();
    mesh.active_uv = None;
    let obj = scene.add_mesh_object("Bare", mesh);
    assert_eq!(detect_tile(&scene, obj), UdimTile::FIRST);
    assert_eq!(detect_tiles(&scene, &[]), vec![UdimTile::FIRST]);
}

#[test]
fn repack_assigns_distinct_tiles_by_name() {
    let mut scene = Scene::default();
    let c = shifted_plane(&mut scene, "C", 0.0, 0.0);
    let a = shifted_plane(&mut scene, "A", 0.0, 0.0);
    let b = shifted_plane(&mut scene, "B", 0.0, 0.0);
    let map = calculate_repack(&scene, &[c, a, b]);
    assert_eq!(map[&a], UdimTile(1001));
    assert_eq!(map[&b], UdimTile(1002));
    assert_eq!(map[&c], UdimTile(1003));
}

#[test]
fn repack_keeps_objects_already_placed() {
    let mut scene = Scene::default();
    let placed = shifted_plane(&mut scene, "Z", 1.0, 0.0);
    let a = shifted_plane(&mut scene, "A", 0.0, 0.0);
    let b = shifted_plane(&mut scene, "B", 0.0, 0.0);
    let map = calculate_repack(&scene, &[a, placed, b]);
    assert_eq!(map[&placed], UdimTile(1002));
    assert_eq!(map[&a], UdimTile(1001));
    assert_eq!(map[&b], UdimTile(1003));
}

#[test]
fn configuration_per_udim_mode() {
    let mut scene = Scene::default();
    let a = shifted_plane(&mut scene, "A", 0.0, 0.0);
    let b = shifted_plane(&mut scene, "B", 0.0, 0.0);
    let mut setting = JobSetting {
        bake_mode: BakeMode::Udim,
        ..JobSetting::default()
    };
    assert_eq!(
        udim_configuration(&scene, &setting, &[a, b]),
        Some(vec![UdimTile(1001)])
    );

    setting.udim_mode = UdimMode::Repack;
    assert_eq!(
        udim_configuration(&scene, &setting, &[a, b]),
        Some(vec![UdimTile(1001), UdimTile(1002)])
    );

    setting.udim_mode = UdimMode::Custom;
    let mut bo = BakeObject::new(a);
    bo.udim_tile = UdimTile(1012);
    bo.override_size = true;
    bo.udim_width = 256;
    bo.udim_height = 128;
    setting.bake_objects = vec![bo];
    assert_eq!(
        udim_configuration(&scene, &setting, &[a, b]),
        Some(vec![UdimTile(1012)])
    );
    assert_eq!(
        tile_resolutions(&setting)[&UdimTile(1012)],
        Resolution::new(256, 128)
    );

    setting.bake_mode = BakeMode::CombineObject;
    assert_eq!(udim_configuration(&scene, &setting, &[a]), None);
}
