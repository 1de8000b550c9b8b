use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::assets::{ImageSpec, SaveOptions, SequenceFrame, get_or_create_image, output_directory, persist_image};
use crate::bake::apply::apply_baked_result;
use crate::bake::export::export_model;
use crate::bake::scene_settings::{SceneSettingsGuard, output_settings};
use crate::channels::{BakePass, ChannelId};
use crate::compile::{BakeStep, ChannelConfig, ChannelKind};
use crate::config::{BakeMode, ChannelSetting, CustomChannel};
use crate::foundation::core::{ColorSpace, Resolution, UdimTile};
use crate::foundation::error::{BakeError, BakeResult};
use crate::graph::GraphSession;
use crate::pixel::{IdColorParams, build_id_attribute, compose_custom, pack_channels, pbr_convert};
use crate::render::{
    BakeBackend, BakeParams, ImageWriter, NormalSpace, SelectedToActive, Services,
};
use crate::scene::{Image, ImageId, ObjectId, Scene};
use crate::uv::{UvLayoutGuard, tile_resolutions, udim_configuration};

/// Channel label recorded for packed images.
pub const PACKED_CHANNEL: &str = "Packed";

/// One produced image, as listed to the user after a bake.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BakedImageResult {
    pub image: ImageId,
    pub image_name: String,
    pub channel: String,
    pub object: String,
    pub path: Option<PathBuf>,
}

/// What a step produced, plus the channel failures it swallowed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepOutcome {
    pub results: Vec<BakedImageResult>,
    /// Images by result key, for the apply stage and custom channels.
    pub images: BTreeMap<String, ImageId>,
    pub diagnostics: Vec<String>,
    pub applied: Option<ObjectId>,
    pub exported: Option<PathBuf>,
}

/// Per-step view of the things every channel needs.
struct StepContext<'a> {
    step: &'a BakeStep,
    tiles: Option<Vec<UdimTile>>,
    tile_resolutions: BTreeMap<UdimTile, Resolution>,
    save: SaveOptions,
    object: String,
}

/// Execute one queue step: override scene settings, lay out UVs, isolate
/// the shading graphs, then bake, save and pack every channel in order.
///
/// A failing channel is logged and left out of the results. `on_channel`
/// is called before each channel starts.
#[tracing::instrument(skip_all, fields(job = %step.job.name, task = %step.task.base_name))]
pub fn run_step(
    scene: &mut Scene,
    services: &mut Services,
    step: &BakeStep,
    mut on_channel: impl FnMut(&ChannelConfig),
) -> BakeResult<StepOutcome> {
    let setting = &step.job.setting;
    let task = &step.task;
    if scene.object(task.active).is_none() {
        return Err(BakeError::validation(format!(
            "target of task '{}' no longer exists",
            task.base_name
        )));
    }

    let folder = setting.create_new_folder.then_some(task.folder_name.as_str());
    let save = SaveOptions {
        directory: output_directory(scene, &setting.save_path, folder),
        output: output_settings(setting),
        frame: step.frame_info.map(|f| SequenceFrame {
            index: f.save_idx,
            digits: f.digits,
        }),
        separator: setting.bake_motion_separator.clone(),
        reload: setting.reload,
    };
    let mut outcome = StepOutcome::default();

    {
        let mut ctx = SceneSettingsGuard::enter(scene, setting, task, step.frame_info);
        let mut uv = UvLayoutGuard::enter(
            &mut ctx,
            &task.objects,
            setting,
            services.unwrapper.as_mut(),
        )?;
        let step_ctx = StepContext {
            step,
            tiles: udim_configuration(&uv, setting, &task.objects),
            tile_resolutions: tile_resolutions(setting),
            save,
            object: uv.object_name(task.active),
        };

        let mut graph = GraphSession::enter(&mut uv, &task.materials);
        graph.setup_protection(&task.objects, &task.materials)?;

        for channel in step.channels.iter() {
            on_channel(channel);
            let baked = bake_channel(
                &mut graph,
                services.baker.as_mut(),
                &step_ctx,
                channel,
                &outcome.images,
            );
            match baked {
                Ok(image) => {
                    outcome.images.insert(channel.key.clone(), image);
                    let record =
                        record_result(&mut graph, services.writer.as_mut(), &step_ctx, image, &channel.name);
                    outcome.results.push(record);
                }
                Err(err) => {
                    tracing::warn!(channel = %channel.name, %err, "channel bake failed");
                    outcome
                        .diagnostics
                        .push(format!("{} / {}: {err}", task.base_name, channel.name));
                }
            }
        }

        if setting.use_packing {
            match pack_results(&mut graph, &step_ctx, &outcome.images) {
                Ok(Some((image, warnings))) => {
                    outcome.diagnostics.extend(warnings);
                    let record = record_result(
                        &mut graph,
                        services.writer.as_mut(),
                        &step_ctx,
                        image,
                        PACKED_CHANNEL,
                    );
                    outcome.results.push(record);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(%err, "channel packing failed");
                    outcome.diagnostics.push(format!("{}: packing failed: {err}", task.base_name));
                }
            }
        }
    }

    // Animated steps leave apply and export to a still bake.
    if step.frame_info.is_none() {
        let folder = Some(task.folder_name.as_str());
        let mut export_target = setting.export_model.then_some(task.active);
        if setting.bake_texture_apply {
            match apply_baked_result(scene, task, &outcome.images) {
                Ok(id) => {
                    outcome.applied = Some(id);
                    export_target = export_target.map(|_| id);
                }
                Err(err) => {
                    tracing::error!(%err, "applying bake result failed");
                    outcome.diagnostics.push(format!("{}: apply failed: {err}", task.base_name));
                }
            }
        }
        if let Some(object) = export_target {
            outcome.exported =
                export_model(scene, services.exporter.as_mut(), setting, folder, object);
        }
    }
    Ok(outcome)
}

fn bake_channel(
    scene_graph: &mut GraphSession<'_>,
    baker: &mut dyn BakeBackend,
    ctx: &StepContext<'_>,
    channel: &ChannelConfig,
    results: &BTreeMap<String, ImageId>,
) -> BakeResult<ImageId> {
    let setting = &ctx.step.job.setting;
    let task = &ctx.step.task;

    let mut spec = ImageSpec::new(
        format!("{}{}{}", channel.prefix, task.base_name, channel.suffix),
        setting.resolution(),
    );
    spec.alpha = setting.use_alpha;
    spec.float32 = setting.float32 || channel.id().is_some_and(ChannelId::forces_float);
    spec.color_space = channel.color_space();
    spec.clear = setting.clearimage;
    spec.base_color = setting.colorbase;
    spec.tiles = ctx.tiles.clone();
    spec.tile_resolutions = ctx.tile_resolutions.clone();
    let image = get_or_create_image(scene_graph, &spec)?;

    let channel_setting = match &channel.kind {
        ChannelKind::Custom(custom) => {
            compose_into(scene_graph, image, custom, results)?;
            return Ok(image);
        }
        ChannelKind::Standard(s) => s,
    };
    let id = channel_setting.id;

    if ctx.tiles.is_none() && try_pbr_shortcut(scene_graph, image, channel_setting, results)? {
        tracing::debug!(channel = %channel.name, "converted from baked specular");
        return Ok(image);
    }

    let attribute = id.id_kind().map(|kind| {
        let params = IdColorParams {
            start_color: setting.id_start_color,
            manual_start: setting.id_manual_start_color,
            seed: setting.id_seed,
        };
        let name = kind.attribute_name();
        for &obj in &task.objects {
            let existed = scene_graph
                .object(obj)
                .and_then(|o| o.mesh())
                .is_some_and(|m| m.attribute(&name).is_some());
            if build_id_attribute(scene_graph, obj, kind, &params).is_some() && !existed {
                scene_graph.track_attribute(obj, name.clone());
            }
        }
        name
    });

    let pass = if id.mesh_logic().is_some() {
        BakePass::Emit
    } else {
        channel.bake_pass
    };
    scene_graph.setup_for_pass(pass, id, channel_setting, image, attribute.as_deref())?;

    let params = BakeParams {
        pass,
        objects: task.objects.clone(),
        active: task.active,
        margin: setting.margin,
        use_clear: setting.clearimage,
        normal_space: if channel_setting.normal_obj {
            NormalSpace::Object
        } else {
            NormalSpace::Tangent
        },
        selected_to_active: (setting.bake_mode == BakeMode::SelectActive).then(|| SelectedToActive {
            cage: setting.cage_object,
            extrusion: setting.extrusion,
            max_ray_distance: setting.ray_distance,
        }),
        samples: if id.is_data_pass() { 1 } else { setting.sample },
    };
    baker.bake(scene_graph, &params)?;

    if id == ChannelId::Position
        && channel_setting.position_invert_g
        && let Some(img) = scene_graph.image_mut(image)
    {
        for tile in img.tiles.values_mut() {
            for px in tile.pixels.chunks_exact_mut(4) {
                px[1] = 1.0 - px[1];
            }
        }
    }
    Ok(image)
}

fn compose_into(
    scene: &mut Scene,
    image: ImageId,
    custom: &CustomChannel,
    results: &BTreeMap<String, ImageId>,
) -> BakeResult<()> {
    let pixels = {
        let view: &Scene = scene;
        let len = view.image(image).map_or(0, |i| i.pixels().len());
        compose_custom(custom, len, |id| {
            results
                .get(id.as_str())
                .and_then(|&src| view.image(src))
                .map(Image::pixels)
        })
    };
    scene
        .image_mut(image)
        .ok_or_else(|| BakeError::validation("custom channel target image vanished"))?
        .set_pixels(pixels)
}

/// Numeric PBR conversion when the specular map is already baked.
fn try_pbr_shortcut(
    scene: &mut Scene,
    image: ImageId,
    setting: &ChannelSetting,
    results: &BTreeMap<String, ImageId>,
) -> BakeResult<bool> {
    let Some(mode) = setting.id.pbr_mode() else {
        return Ok(false);
    };
    let Some(&specular) = results.get(ChannelId::Specular.as_str()) else {
        return Ok(false);
    };
    let buffer = |id: ImageId| scene.image(id).map(|i| i.pixels().to_vec());
    let Some(spec_px) = buffer(specular) else {
        return Ok(false);
    };
    let diffuse = results
        .get(ChannelId::Color.as_str())
        .and_then(|&d| buffer(d));
    let mut target = buffer(image).unwrap_or_default();
    if !pbr_convert(
        &mut target,
        &spec_px,
        diffuse.as_deref(),
        mode,
        setting.pbr_conv_threshold,
    ) {
        return Ok(false);
    }
    if let Some(img) = scene.image_mut(image) {
        img.set_pixels(target)?;
    }
    Ok(true)
}

/// Pack the configured slots into `<base><pack_suffix>`. `None` when no
/// configured source was produced or nothing could be packed.
fn pack_results(
    scene: &mut Scene,
    ctx: &StepContext<'_>,
    results: &BTreeMap<String, ImageId>,
) -> BakeResult<Option<(ImageId, Vec<String>)>> {
    let setting = &ctx.step.job.setting;
    let sources: Vec<(usize, Vec<f32>)> = setting
        .pack_slots()
        .iter()
        .enumerate()
        .filter_map(|(slot, key)| {
            let image = results.get((*key)?)?;
            Some((slot, scene.image(*image)?.pixels().to_vec()))
        })
        .collect();
    if sources.is_empty() {
        return Ok(None);
    }

    let mut spec = ImageSpec::new(
        format!("{}{}", ctx.step.task.base_name, setting.pack_suffix),
        setting.resolution(),
    );
    spec.color_space = ColorSpace::NonColor;
    let image = get_or_create_image(scene, &spec)?;
    let mut target = scene.image(image).map(|i| i.pixels().to_vec()).unwrap_or_default();
    let borrowed: Vec<(usize, &[f32])> = sources.iter().map(|(s, p)| (*s, p.as_slice())).collect();
    let report = pack_channels(&mut target, &borrowed);
    if !report.success() {
        return Ok(None);
    }
    if let Some(img) = scene.image_mut(image) {
        img.set_pixels(target)?;
    }
    Ok(Some((image, report.warnings)))
}

/// Save or pack a produced image and build its result record.
fn record_result(
    scene: &mut Scene,
    writer: &mut dyn ImageWriter,
    ctx: &StepContext<'_>,
    image: ImageId,
    channel: &str,
) -> BakedImageResult {
    let setting = &ctx.step.job.setting;
    let path = persist_image(scene, image, setting.save_out, &ctx.save, writer);
    let image_name = match scene.image_mut(image) {
        Some(img) => {
            img.fake_user = setting.use_fake_user;
            img.name.clone()
        }
        None => String::new(),
    };
    BakedImageResult {
        image,
        image_name,
        channel: channel.to_string(),
        object: ctx.object.clone(),
        path,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bake/step.rs"]
mod tests;
