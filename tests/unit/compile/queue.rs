use super::*;
use crate::config::BakeObject;
use crate::scene::{Material, Mesh, Object, ObjectData};

fn job_for(scene: &mut Scene, names: &[&str]) -> Job {
    let mut job = Job::new("Job");
    for name in names {
        let obj = scene.add_mesh_object(*name, Mesh::plane());
        let mat = scene.add_material(Material::principled(format!("{name}_M")));
        scene.assign_material(obj, mat).unwrap();
        job.setting.bake_objects.push(BakeObject::new(obj));
    }
    job
}

#[test]
fn single_object_queue_has_step_per_object() {
    let mut scene = Scene::default();
    let job = job_for(&mut scene, &["A", "B"]);
    let plan = prepare_execution_queue(&scene, &[job]);
    assert_eq!(plan.len(), 2);
    assert!(plan.diagnostics.is_empty());
    assert_eq!(plan.steps[0].channels.len(), 3);
    assert!(plan.steps[0].frame_info.is_none());
}

#[test]
fn missing_uv_skips_whole_job_and_names_object() {
    let mut scene = Scene::default();
    let mut job = job_for(&mut scene, &["A", "B"]);
    let mut bare = Mesh::plane();
    bare.uv_layers.clear();
    bare.active_uv = None;
    let naked = scene.add_mesh_object("NoUV", bare);
    job.setting.bake_objects.push(BakeObject::new(naked));

    let other = job_for(&mut scene, &["C"]);
    let plan = prepare_execution_queue(&scene, &[job, other]);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.diagnostics.len(), 1);
    assert!(plan.error_log().contains("NoUV"));
}

#[test]
fn unresolved_and_non_mesh_entries_are_dropped() {
    let mut scene = Scene::default();
    let mut job = job_for(&mut scene, &["A"]);
    let empty = scene.add_object(Object::new("Empty", ObjectData::Empty));
    let gone = scene.add_mesh_object("Gone", Mesh::plane());
    scene.remove_object(gone);
    job.setting.bake_objects.push(BakeObject::new(empty));
    job.setting.bake_objects.push(BakeObject::new(gone));

    let plan = prepare_execution_queue(&scene, &[job]);
    assert_eq!(plan.len(), 1);
}

#[test]
fn reversed_scene_range_yields_empty_queue() {
    let mut scene = Scene {
        frame_start: 10,
        frame_end: 5,
        ..Scene::default()
    };
    let mut job = job_for(&mut scene, &["A"]);
    job.setting.bake_motion = true;
    job.setting.save_out = true;
    let plan = prepare_execution_queue(&scene, &[job]);
    assert_eq!(plan.len(), 0);
}

#[test]
fn frames_are_the_outer_loop() {
    let mut scene = Scene::default();
    let mut job = job_for(&mut scene, &["A", "B"]);
    job.setting.bake_motion = true;
    job.setting.save_out = true;
    job.setting.bake_motion_use_custom = true;
    job.setting.bake_motion_start = 5;
    job.setting.bake_motion_last = 2;
    job.setting.bake_motion_startindex = 100;

    let plan = prepare_execution_queue(&scene, &[job]);
    let order: Vec<_> = plan
        .steps
        .iter()
        .map(|s| (s.frame_info.unwrap().frame, s.task.base_name.clone()))
        .collect();
    assert_eq!(
        order,
        vec![
            (5, "A_M".to_string()),
            (5, "B_M".to_string()),
            (6, "A_M".to_string()),
            (6, "B_M".to_string())
        ]
    );
    assert_eq!(plan.steps[2].frame_info.unwrap().save_idx, 101);
}

#[test]
fn animation_without_saving_bakes_once() {
    let mut scene = Scene::default();
    let mut job = job_for(&mut scene, &["A"]);
    job.setting.bake_motion = true;
    let plan = prepare_execution_queue(&scene, &[job]);
    assert_eq!(plan.len(), 1);
    assert!(plan.steps[0].frame_info.is_none());
}

#[test]
fn disabled_jobs_and_empty_channel_lists_are_skipped() {
    let mut scene = Scene::default();
    let mut off = job_for(&mut scene, &["A"]);
    off.enabled = false;
    let mut none = job_for(&mut scene, &["B"]);
    none.setting.channels.iter_mut().for_each(|c| c.enabled = false);

    let plan = prepare_execution_queue(&scene, &[off, none]);
    assert!(plan.is_empty());
    assert_eq!(plan.diagnostics.len(), 1);
}

#[test]
fn select_active_bsdf_is_rejected() {
    let mut scene = Scene::default();
    let mut job = job_for(&mut scene, &["High", "Low"]);
    job.setting.bake_mode = BakeMode::SelectActive;
    let plan = prepare_execution_queue(&scene, &[job.clone()]);
    assert!(plan.is_empty());

    job.setting.migrate();
    let plan = prepare_execution_queue(&scene, &[job]);
    assert_eq!(plan.len(), 1);
}
