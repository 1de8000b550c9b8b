use super::*;
use crate::config::BakeMode;
use crate::foundation::core::UdimTile;
use crate::scene::Mesh;

#[test]
fn names_bind_in_order_and_keep_entry_settings() {
    let mut scene = Scene::default();
    let a = scene.add_mesh_object("A", Mesh::plane());
    let b = scene.add_mesh_object("B", Mesh::plane());
    let mut setting = JobSetting {
        bake_objects: vec![BakeObject {
            udim_tile: UdimTile(1003),
            ..BakeObject::default()
        }],
        ..JobSetting::default()
    };
    let bindings = JobBindings {
        objects: vec!["A".into(), "B".into()],
        active: Some("B".into()),
        cage: None,
    };
    bindings.bind(&scene, &mut setting).unwrap();
    assert_eq!(setting.bake_objects.len(), 2);
    assert_eq!(setting.bake_objects[0].object, Some(a));
    assert_eq!(setting.bake_objects[0].udim_tile, UdimTile(1003));
    assert_eq!(setting.bake_objects[1].object, Some(b));
    assert_eq!(setting.active_object, Some(b));
    assert_eq!(setting.cage_object, None);
}

#[test]
fn unknown_name_is_a_configuration_error() {
    let scene = Scene::default();
    let bindings = JobBindings {
        objects: vec!["Ghost".into()],
        ..JobBindings::default()
    };
    let err = bindings.bind(&scene, &mut JobSetting::default()).unwrap_err();
    assert!(matches!(err, BakeError::Configuration(_)));
}

#[test]
fn jobs_file_loads_presets_and_migrates() {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!(
        "texbake_jobs_{}_{stamp}.json",
        std::process::id()
    ));
    let mut scene = Scene::default();
    let crate_obj = scene.add_mesh_object("Crate", Mesh::plane());
    let doc = serde_json::json!({
        "jobs": [{
            "job": {
                "name": "Hero",
                "setting": { "bake_mode": "SELECT_ACTIVE", "bake_type": "BSDF", "res_x": 64, "legacy_knob": 3 }
            },
            "bindings": { "objects": ["Crate"], "active": "Crate" }
        }]
    });
    std::fs::write(&path, doc.to_string()).unwrap();

    let (jobs, report) = load_jobs(&path, &scene).unwrap();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.name, "Hero");
    assert_eq!(job.setting.res_x, 64);
    assert_eq!(job.setting.bake_mode, BakeMode::SelectActive);
    assert_eq!(job.setting.bake_type, crate::config::BakeType::Basic);
    assert_eq!(job.setting.active_object, Some(crate_obj));
    assert!(report.contains("Obsolete keys: 1"), "{report}");
    let _ = std::fs::remove_file(path);
}
