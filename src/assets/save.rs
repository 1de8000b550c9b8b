use std::path::{Path, PathBuf};

use crate::render::{ImageWriter, UDIM_TOKEN};
use crate::scene::{ImageId, ImageOutputSettings, ImageSource, Scene};

/// Frame suffix appended to animated saves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequenceFrame {
    pub index: i32,
    pub digits: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SaveOptions {
    pub directory: PathBuf,
    pub output: ImageOutputSettings,
    pub frame: Option<SequenceFrame>,
    pub separator: String,
    /// Switch the image to its file source after a still save.
    pub reload: bool,
}

/// Directory results are written to: `save_path`, resolved against the scene
/// file, optionally with a per-task subfolder.
pub fn output_directory(scene: &Scene, save_path: &str, folder: Option<&str>) -> PathBuf {
    let mut base = scene.abspath(save_path);
    if base.as_os_str().is_empty() || base == Path::new(".") {
        base = scene
            .blend_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
    }
    match folder {
        Some(name) => base.join(name),
        None => base,
    }
}

/// File name for `image_name`: optional zero-padded frame suffix, a UDIM
/// token for tiled images, then the format extension.
pub fn image_file_name(
    image_name: &str,
    extension: &str,
    frame: Option<SequenceFrame>,
    separator: &str,
    tiled: bool,
) -> String {
    let mut stem = match frame {
        Some(f) => format!("{image_name}{separator}{:0width$}", f.index, width = f.digits),
        None => image_name.to_string(),
    };
    if tiled && !stem.contains(UDIM_TOKEN) {
        stem.push('.');
        stem.push_str(UDIM_TOKEN);
    }
    format!("{stem}{extension}")
}

/// Write `image` under `opts.directory`, returning the absolute path.
///
/// Failures are logged and yield `None`; a failed write leaves the image's
/// previous file path and format untouched.
pub fn save_image(
    scene: &mut Scene,
    image: ImageId,
    opts: &SaveOptions,
    writer: &mut dyn ImageWriter,
) -> Option<PathBuf> {
    let Some(img) = scene.image(image) else {
        tracing::warn!("save requested for a removed image");
        return None;
    };
    if let Err(err) = std::fs::create_dir_all(&opts.directory) {
        tracing::error!(dir = %opts.directory.display(), %err, "failed to create output directory");
        return None;
    }

    let format = opts.output.file_format;
    let name = image_file_name(
        &img.name,
        format.extension(),
        opts.frame,
        &opts.separator,
        img.is_tiled(),
    );
    let joined = opts.directory.join(name);
    let path = std::path::absolute(&joined).unwrap_or(joined);

    let previous = (img.filepath.clone(), img.file_format);
    if let Some(img) = scene.image_mut(image) {
        img.filepath = Some(path.clone());
        img.file_format = format;
    }

    let result = match scene.image(image) {
        Some(img) => writer.write(img, &path, &opts.output),
        None => return None,
    };
    let img = scene.image_mut(image)?;
    if let Err(err) = result {
        tracing::error!(image = %img.name, %err, "save failed");
        img.filepath = previous.0;
        img.file_format = previous.1;
        return None;
    }

    if opts.frame.is_none() && opts.reload && !img.is_tiled() {
        img.source = ImageSource::File;
    }
    tracing::info!(image = %img.name, path = %path.display(), "saved image");
    Some(path)
}

/// Embed the image in the scene instead of writing it out.
pub fn pack_image(scene: &mut Scene, image: ImageId) -> bool {
    match scene.image_mut(image) {
        Some(img) => {
            img.packed = true;
            true
        }
        None => false,
    }
}

/// Save when `save_out` is set, otherwise pack.
pub fn persist_image(
    scene: &mut Scene,
    image: ImageId,
    save_out: bool,
    opts: &SaveOptions,
    writer: &mut dyn ImageWriter,
) -> Option<PathBuf> {
    if save_out {
        save_image(scene, image, opts, writer)
    } else {
        pack_image(scene, image);
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/save.rs"]
mod tests;
