use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use crate::foundation::core::{ColorSpace, Resolution, Rgba, UdimTile};
use crate::foundation::error::BakeResult;
use crate::scene::{EditorKind, Image, ImageId, ImageSource, ImageTile, Scene};

/// Everything needed to get or (re)create a bake target image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSpec {
    pub name: String,
    pub size: Resolution,
    pub alpha: bool,
    pub float32: bool,
    pub color_space: ColorSpace,
    pub clear: bool,
    pub base_color: Rgba,
    /// UDIM tiles to carry; `None` for a plain single-buffer image.
    pub tiles: Option<Vec<UdimTile>>,
    pub tile_resolutions: BTreeMap<UdimTile, Resolution>,
}

impl ImageSpec {
    pub fn new(name: impl Into<String>, size: Resolution) -> Self {
        Self {
            name: name.into(),
            size,
            alpha: true,
            float32: false,
            color_space: ColorSpace::Srgb,
            clear: true,
            base_color: [0.0, 0.0, 0.0, 0.0],
            tiles: None,
            tile_resolutions: BTreeMap::new(),
        }
    }

    pub fn is_tiled(&self) -> bool {
        self.tiles.is_some()
    }

    /// Size of tile 1001: its override when tiling, else the base size.
    fn base_size(&self) -> Resolution {
        if self.is_tiled() {
            self.tile_resolutions
                .get(&UdimTile::FIRST)
                .copied()
                .unwrap_or(self.size)
        } else {
            self.size
        }
    }

    fn tile_size(&self, tile: UdimTile) -> Resolution {
        self.tile_resolutions.get(&tile).copied().unwrap_or(self.size)
    }
}

/// Get the image called `spec.name`, creating, recreating or resizing it so
/// it matches the spec.
///
/// An existing image whose tiled-ness differs is replaced. Float images keep
/// their linear tag. Clearing happens last so reused images never carry
/// stale pixels.
pub fn get_or_create_image(scene: &mut Scene, spec: &ImageSpec) -> BakeResult<ImageId> {
    let mut existing = scene.find_image(&spec.name);
    if let Some(id) = existing
        && scene.image(id).is_some_and(|i| i.is_tiled() != spec.is_tiled())
    {
        tracing::debug!(image = %spec.name, "tiling changed, recreating image");
        scene.remove_image(id);
        existing = None;
    }

    let base = spec.base_size();
    let id = match existing {
        Some(id) => {
            if let Some(image) = scene.image_mut(id)
                && image.size() != base
            {
                image.scale_base(base)?;
            }
            id
        }
        None => {
            let mut image = Image::new(spec.name.clone(), base, spec.alpha)?;
            image.float_buffer = spec.float32;
            if spec.float32 {
                image.color_space = ColorSpace::Linear;
            }
            if spec.is_tiled() {
                image.source = ImageSource::Tiled;
            }
            image.generated_color = spec.base_color;
            image.clear(spec.base_color);
            scene.add_image(image)
        }
    };

    if let Some(image) = scene.image_mut(id) {
        image.fake_user = true;
        if !spec.float32 {
            image.color_space = spec.color_space;
        }
    }

    if let Some(tiles) = &spec.tiles {
        reconcile_tiles(scene, id, tiles, spec)?;
    }

    if spec.clear
        && let Some(image) = scene.image_mut(id)
    {
        image.clear(spec.base_color);
    }
    Ok(id)
}

fn reconcile_tiles(
    scene: &mut Scene,
    id: ImageId,
    requested: &[UdimTile],
    spec: &ImageSpec,
) -> BakeResult<()> {
    let wanted: Vec<UdimTile> = if requested.is_empty() {
        vec![UdimTile::FIRST]
    } else {
        requested.to_vec()
    };
    let missing: Vec<UdimTile> = match scene.image(id) {
        Some(image) => wanted
            .iter()
            .copied()
            .filter(|t| !image.tiles.contains_key(t))
            .collect(),
        None => return Ok(()),
    };

    if !missing.is_empty() {
        let mut ctx = ImageEditorContext::acquire(scene, id);
        let valid = ctx.is_valid();
        if !valid {
            tracing::warn!(image = %spec.name, "no editor area available, adding bare tiles");
        }
        if let Some(image) = ctx.image_mut(id) {
            for tile in missing {
                let size = spec.tile_size(tile);
                let record = if valid {
                    ImageTile::new(size, spec.base_color)?
                } else {
                    ImageTile::bare(size)
                };
                image.tiles.insert(tile, record);
            }
        }
    }

    if let Some(image) = scene.image_mut(id) {
        image.tiles.retain(|t, _| wanted.contains(t));
    }
    Ok(())
}

/// Borrowed editor area showing one image, needed to initialize new tiles.
///
/// The area is picked from the current one, then the first image editor,
/// then the first 3D view, then any area. Its kind and image are put back
/// on drop.
pub struct ImageEditorContext<'s> {
    scene: &'s mut Scene,
    area: Option<usize>,
    previous: Option<(EditorKind, Option<ImageId>)>,
}

impl<'s> ImageEditorContext<'s> {
    pub fn acquire(scene: &'s mut Scene, image: ImageId) -> Self {
        let area = scene
            .current_area
            .filter(|&i| i < scene.areas.len())
            .or_else(|| find_area(scene, EditorKind::ImageEditor))
            .or_else(|| find_area(scene, EditorKind::View3d))
            .or_else(|| (!scene.areas.is_empty()).then_some(0));

        let mut previous = None;
        if let Some(slot) = area.and_then(|i| scene.areas.get_mut(i)) {
            previous = Some((slot.kind, slot.image));
            slot.kind = EditorKind::ImageEditor;
            slot.image = Some(image);
        }
        Self {
            scene,
            area,
            previous,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.area.is_some()
    }
}

fn find_area(scene: &Scene, kind: EditorKind) -> Option<usize> {
    scene.areas.iter().position(|a| a.kind == kind)
}

impl Deref for ImageEditorContext<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for ImageEditorContext<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for ImageEditorContext<'_> {
    fn drop(&mut self) {
        if let (Some(i), Some((kind, image))) = (self.area, self.previous)
            && let Some(slot) = self.scene.areas.get_mut(i)
        {
            slot.kind = kind;
            slot.image = image;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
