use std::cell::Cell;
use std::rc::Rc;

use super::*;
use crate::compile::{FrameInfo, prepare_execution_queue};
use crate::config::{BakeObject, CustomSlot, Job};
use crate::render::ReferenceBaker;
use crate::scene::{Material, Mesh};
use crate::uv::TEMP_UV_LAYER;

struct FailOn(BakePass);

impl BakeBackend for FailOn {
    fn bake(&mut self, scene: &mut Scene, params: &BakeParams) -> BakeResult<()> {
        if params.pass == self.0 {
            return Err(BakeError::render("renderer exploded"));
        }
        ReferenceBaker.bake(scene, params)
    }
}

struct Counting(Rc<Cell<usize>>);

impl BakeBackend for Counting {
    fn bake(&mut self, scene: &mut Scene, params: &BakeParams) -> BakeResult<()> {
        self.0.set(self.0.get() + 1);
        ReferenceBaker.bake(scene, params)
    }
}

fn temp_dir(tag: &str) -> PathBuf {
    let stamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("texbake_{tag}_{}_{stamp}", std::process::id()))
}

fn crate_scene() -> (Scene, ObjectId) {
    let mut scene = Scene::default();
    let obj = scene.add_mesh_object("Crate", Mesh::plane());
    let mat = scene.add_material(Material::principled("Wood"));
    scene.assign_material(obj, mat).unwrap();
    (scene, obj)
}

fn job_with(obj: ObjectId, channels: &[ChannelId]) -> Job {
    let mut job = Job::new("Bake");
    let setting = &mut job.setting;
    setting.res_x = 8;
    setting.res_y = 8;
    setting.margin = 1;
    setting.bake_objects = vec![BakeObject::new(obj)];
    for c in &mut setting.channels {
        c.enabled = false;
    }
    for &id in channels {
        setting.enable_channel(id);
    }
    job
}

fn single_step(scene: &Scene, job: Job) -> BakeStep {
    let plan = prepare_execution_queue(scene, &[job]);
    assert_eq!(plan.len(), 1, "{}", plan.error_log());
    plan.steps.into_iter().next().unwrap()
}

fn first_pixel(scene: &Scene, image: ImageId) -> [f32; 4] {
    let px = scene.image(image).unwrap().pixels();
    [px[0], px[1], px[2], px[3]]
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

#[test]
fn bakes_channels_in_order_and_restores_the_scene() {
    let (mut scene, obj) = crate_scene();
    let mat = scene.object(obj).unwrap().primary_material().unwrap();
    let nodes_before = scene.material(mat).unwrap().node_tree.nodes.len();
    let render_before = scene.render.clone();
    let step = single_step(&scene, job_with(obj, &[ChannelId::Color, ChannelId::Rough]));

    let mut seen = Vec::new();
    let outcome = run_step(&mut scene, &mut Services::reference(), &step, |c| {
        seen.push(c.key.clone())
    })
    .unwrap();

    assert_eq!(seen, vec!["color", "rough"]);
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.results.len(), 2);
    assert!(outcome.results.iter().all(|r| r.object == "Crate" && r.path.is_none()));

    let color = outcome.images["color"];
    let rough = outcome.images["rough"];
    assert!(close(first_pixel(&scene, color)[0], 0.8));
    assert!(close(first_pixel(&scene, rough)[0], 0.5));
    let img = scene.image(color).unwrap();
    assert!(img.packed && img.fake_user);

    assert_eq!(scene.render, render_before);
    assert_eq!(scene.material(mat).unwrap().node_tree.nodes.len(), nodes_before);
    let mesh = scene.object(obj).unwrap().mesh().unwrap();
    assert!(mesh.uv_layers.iter().all(|l| l.name != TEMP_UV_LAYER));
    assert!(outcome.applied.is_none());
}

#[test]
fn failed_channel_is_reported_and_the_rest_continue() {
    let (mut scene, obj) = crate_scene();
    let step = single_step(
        &scene,
        job_with(obj, &[ChannelId::Normal, ChannelId::Color]),
    );
    let mut services = Services {
        baker: Box::new(FailOn(BakePass::Normal)),
        ..Services::reference()
    };
    let outcome = run_step(&mut scene, &mut services, &step, |_| {}).unwrap();
    assert!(outcome.images.contains_key("color"));
    assert!(!outcome.images.contains_key("normal"));
    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(outcome.diagnostics[0].contains("renderer exploded"));
}

#[test]
fn metal_conversion_reuses_the_baked_specular() {
    let (mut scene, obj) = crate_scene();
    let step = single_step(
        &scene,
        job_with(obj, &[ChannelId::Specular, ChannelId::PbrConvMetal]),
    );
    let calls = Rc::new(Cell::new(0));
    let mut services = Services {
        baker: Box::new(Counting(Rc::clone(&calls))),
        ..Services::reference()
    };
    let outcome = run_step(&mut scene, &mut services, &step, |_| {}).unwrap();
    assert_eq!(calls.get(), 1);
    let metal = first_pixel(&scene, outcome.images["pbr_conv_metal"]);
    assert!(close(metal[0], (0.5 - 0.04) / 0.96));
    assert_eq!(metal[3], 1.0);
}

#[test]
fn custom_channel_and_packing_read_earlier_results() {
    let (mut scene, obj) = crate_scene();
    let mut job = job_with(obj, &[ChannelId::Rough, ChannelId::Metal]);
    job.setting.use_custom_map = true;
    job.custom_channels.push(CustomChannel {
        name: "Mask".to_string(),
        bw: true,
        bw_slot: CustomSlot {
            invert: true,
            ..CustomSlot::mapped(ChannelId::Metal)
        },
        suffix: "_mask".to_string(),
        ..CustomChannel::default()
    });
    job.setting.use_packing = true;
    job.setting.pack_r = Some("rough".to_string());
    job.setting.pack_g = Some("Mask".to_string());
    job.setting.pack_b = Some("height".to_string());
    let step = single_step(&scene, job);

    let outcome = run_step(&mut scene, &mut Services::reference(), &step, |_| {}).unwrap();
    let mask = first_pixel(&scene, outcome.images["Mask"]);
    assert!(close(mask[0], 1.0) && close(mask[1], 1.0));
    assert_eq!(scene.image(outcome.images["Mask"]).unwrap().name, "Wood_mask");

    let packed = outcome
        .results
        .iter()
        .find(|r| r.channel == PACKED_CHANNEL)
        .unwrap();
    assert_eq!(packed.image_name, "Wood_pack");
    let px = first_pixel(&scene, packed.image);
    assert!(close(px[0], 0.5));
    assert!(close(px[1], 1.0));
    assert_eq!(px[2], 0.0);
    assert_eq!(px[3], 1.0);
}

#[test]
fn still_bake_saves_applies_and_exports() {
    let dir = temp_dir("step_save");
    let (mut scene, obj) = crate_scene();
    let mut job = job_with(obj, &[ChannelId::Color]);
    job.setting.save_out = true;
    job.setting.save_path = dir.to_string_lossy().into_owned();
    job.setting.bake_texture_apply = true;
    job.setting.export_model = true;
    let step = single_step(&scene, job);

    let outcome = run_step(&mut scene, &mut Services::reference(), &step, |_| {}).unwrap();
    let path = outcome.results[0].path.clone().unwrap();
    assert!(path.is_file());
    let applied = outcome.applied.unwrap();
    assert_eq!(scene.object_name(applied), "Wood_Baked");
    assert_eq!(outcome.exported, Some(dir.join("Wood").join("Wood_Baked.fbx")));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn animated_frames_skip_apply_and_number_their_files() {
    let dir = temp_dir("step_anim");
    let (mut scene, obj) = crate_scene();
    let mut job = job_with(obj, &[ChannelId::Color]);
    job.setting.save_out = true;
    job.setting.save_path = dir.to_string_lossy().into_owned();
    job.setting.bake_texture_apply = true;
    let mut step = single_step(&scene, job);
    step.frame_info = Some(FrameInfo {
        frame: 12,
        save_idx: 3,
        digits: 4,
    });

    let outcome = run_step(&mut scene, &mut Services::reference(), &step, |_| {}).unwrap();
    assert!(outcome.applied.is_none());
    let path = outcome.results[0].path.clone().unwrap();
    assert!(path.to_string_lossy().ends_with("_0003.png"), "{}", path.display());
    assert_eq!(scene.frame_current, 1);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn vanished_target_fails_the_step() {
    let (mut scene, obj) = crate_scene();
    let step = single_step(&scene, job_with(obj, &[ChannelId::Color]));
    scene.remove_object(obj);
    let err = run_step(&mut scene, &mut Services::reference(), &step, |_| {}).unwrap_err();
    assert!(matches!(err, BakeError::Validation(_)));
}
