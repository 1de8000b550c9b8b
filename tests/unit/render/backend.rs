use super::*;
use crate::scene::Mesh;

#[test]
fn planar_unwrap_fits_unit_square_with_margin() {
    let mut scene = Scene::default();
    let mut mesh = Mesh::grid(2, 2);
    for v in &mut mesh.vertices {
        v[0] = v[0] * 4.0 - 2.0;
        v[1] *= 2.0;
    }
    let obj = scene.add_mesh_object("Wide", mesh);
    PlanarUnwrapper
        .smart_project(&mut scene, &[obj], 66.0, 0.1)
        .unwrap();

    let layer = scene.object(obj).unwrap().mesh().unwrap().active_uv_layer().unwrap();
    for uv in &layer.data {
        assert!((0.1 - 1e-9..=0.9 + 1e-9).contains(&uv.x));
        assert!((0.1 - 1e-9..=0.9 + 1e-9).contains(&uv.y));
    }
    assert!(layer.data.iter().any(|uv| (uv.x - 0.1).abs() < 1e-6));
    assert!(layer.data.iter().any(|uv| (uv.x - 0.9).abs() < 1e-6));
}

#[test]
fn json_exporter_writes_object() {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("texbake_export_{}_{stamp}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let mut scene = Scene::default();
    let obj = scene.add_mesh_object("Crate", Mesh::plane());
    let path = dir.join("Crate.glb");
    JsonModelExporter
        .export(&scene, obj, ExportFormat::Glb, &path)
        .unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"Crate\""));
    assert!(text.contains("\"glb\""));

    scene.remove_object(obj);
    assert!(
        JsonModelExporter
            .export(&scene, obj, ExportFormat::Glb, &path)
            .is_err()
    );
    let _ = std::fs::remove_dir_all(&dir);
}
