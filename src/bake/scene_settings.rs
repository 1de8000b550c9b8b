use std::ops::{Deref, DerefMut};

use crate::compile::{BakeTask, FrameInfo};
use crate::config::JobSetting;
use crate::scene::{
    ImageOutputSettings, ObjectId, RenderEngine, RenderSettings, Scene, ViewTransform,
};

/// Output block derived from a job, with depth and mode clamped to what the
/// chosen format supports.
pub fn output_settings(setting: &JobSetting) -> ImageOutputSettings {
    let format = setting.save_format;
    ImageOutputSettings {
        file_format: format,
        color_depth: format.resolve_depth(setting.color_depth),
        color_mode: format.resolve_mode(setting.color_mode),
        quality: setting.quality,
        exr_codec: setting.exr_code,
    }
}

/// Scoped override of render settings, frame and selection for one step.
///
/// The colour-managed view is forced to Standard so data maps are written
/// untouched. Everything is put back when the guard drops.
pub struct SceneSettingsGuard<'s> {
    scene: &'s mut Scene,
    render: RenderSettings,
    frame: i32,
    selection: Vec<ObjectId>,
    active: Option<ObjectId>,
}

impl<'s> SceneSettingsGuard<'s> {
    pub fn enter(
        scene: &'s mut Scene,
        setting: &JobSetting,
        task: &BakeTask,
        frame: Option<FrameInfo>,
    ) -> Self {
        let guard = Self {
            render: scene.render.clone(),
            frame: scene.frame_current,
            selection: scene.selection.clone(),
            active: scene.active_object,
            scene,
        };

        let render = &mut guard.scene.render;
        render.resolution_x = setting.res_x;
        render.resolution_y = setting.res_y;
        render.resolution_percentage = 100;
        render.engine = RenderEngine::Cycles;
        render.samples = setting.sample;
        render.device = setting.device;
        render.image_settings = output_settings(setting);
        render.view_transform = ViewTransform::Standard;

        if let Some(info) = frame {
            guard.scene.frame_current = info.frame;
        }
        let selection: Vec<ObjectId> = task
            .objects
            .iter()
            .copied()
            .filter(|&o| guard.scene.object(o).is_some())
            .collect();
        guard.scene.selection = selection;
        guard.scene.active_object = Some(task.active).filter(|&o| guard.scene.object(o).is_some());
        guard
    }
}

impl Deref for SceneSettingsGuard<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for SceneSettingsGuard<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for SceneSettingsGuard<'_> {
    fn drop(&mut self) {
        self.scene.render = std::mem::take(&mut self.render);
        self.scene.frame_current = self.frame;
        // Objects removed during the step must not come back as dangling selections.
        let live: Vec<ObjectId> = std::mem::take(&mut self.selection)
            .into_iter()
            .filter(|&o| self.scene.object(o).is_some())
            .collect();
        self.scene.selection = live;
        self.scene.active_object = self.active.filter(|&o| self.scene.object(o).is_some());
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bake/scene_settings.rs"]
mod tests;
