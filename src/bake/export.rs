use std::path::PathBuf;

use crate::config::JobSetting;
use crate::foundation::math::clean_name;
use crate::render::ModelExporter;
use crate::scene::{ObjectId, Scene};

/// Target file for exporting `object`: `save_path[/folder]/<name>.<ext>`.
pub fn export_path(
    scene: &Scene,
    setting: &JobSetting,
    folder: Option<&str>,
    object: ObjectId,
) -> PathBuf {
    let dir = crate::assets::output_directory(scene, &setting.save_path, folder);
    let name = clean_name(&scene.object_name(object));
    dir.join(format!("{name}.{}", setting.export_format.extension()))
}

/// Export `object` with the job's format. Failures are logged and yield
/// `None`; an export never fails the bake.
pub fn export_model(
    scene: &Scene,
    exporter: &mut dyn ModelExporter,
    setting: &JobSetting,
    folder: Option<&str>,
    object: ObjectId,
) -> Option<PathBuf> {
    if scene.object(object).is_none() {
        tracing::warn!("export requested for a removed object");
        return None;
    }
    let path = export_path(scene, setting, folder, object);
    if let Some(dir) = path.parent()
        && let Err(err) = std::fs::create_dir_all(dir)
    {
        tracing::error!(dir = %dir.display(), %err, "failed to create export directory");
        return None;
    }
    match exporter.export(scene, object, setting.export_format, &path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), format = ?setting.export_format, "exported model");
            Some(path)
        }
        Err(err) => {
            tracing::error!(path = %path.display(), %err, "model export failed");
            None
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bake/export.rs"]
mod tests;
