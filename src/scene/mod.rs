//! Minimal host-scene model manipulated by the baking core.
//!
//! Entities live in generational [`Registry`] slot maps; everything else in
//! the crate refers to them through [`ObjectId`], [`MaterialId`] and
//! [`ImageId`] handles, which resolve to `None` once the entity is gone.

pub mod image;
pub mod material;
pub mod mesh;
pub mod nodes;
pub mod object;
pub mod registry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::foundation::error::{BakeError, BakeResult};

pub use image::{ColorMode, FileFormat, Image, ImageSource, ImageTile};
pub use material::{BlendMethod, Material, NodeGroup};
pub use mesh::{Attribute, AttributeDomain, AttributeType, Edge, MAX_UV_LAYERS, Mesh, Polygon, UvLayer};
pub use nodes::{Link, MathOp, Node, NodeId, NodeKind, NodeTree, Socket, SocketRef, SocketValue};
pub use object::{Object, ObjectData};
pub use registry::{Id, Registry};

pub type ObjectId = Id<Object>;
pub type MaterialId = Id<Material>;
pub type ImageId = Id<Image>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RenderEngine {
    #[default]
    Cycles,
    Eevee,
    Workbench,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Device {
    Cpu,
    #[default]
    Gpu,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ViewTransform {
    #[default]
    Standard,
    Filmic,
    AgX,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExrCodec {
    None,
    Pxr24,
    #[default]
    Zip,
    Piz,
    Rle,
    Zips,
    B44,
    B44a,
    Dwaa,
    Dwab,
}

/// Image output block of the render settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ImageOutputSettings {
    pub file_format: FileFormat,
    pub color_depth: u8,
    pub color_mode: ColorMode,
    pub quality: u8,
    pub exr_codec: ExrCodec,
}

impl Default for ImageOutputSettings {
    fn default() -> Self {
        Self {
            file_format: FileFormat::Png,
            color_depth: 8,
            color_mode: ColorMode::Rgba,
            quality: 90,
            exr_codec: ExrCodec::Zip,
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub resolution_x: u32,
    pub resolution_y: u32,
    pub resolution_percentage: u32,
    pub engine: RenderEngine,
    pub samples: u32,
    pub device: Device,
    pub image_settings: ImageOutputSettings,
    pub view_transform: ViewTransform,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution_x: 1920,
            resolution_y: 1080,
            resolution_percentage: 100,
            engine: RenderEngine::Eevee,
            samples: 64,
            device: Device::Cpu,
            image_settings: ImageOutputSettings::default(),
            view_transform: ViewTransform::AgX,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum EditorKind {
    View3d,
    ImageEditor,
    Properties,
    Outliner,
    Other,
}

/// A UI area the core may borrow as an image-editor execution context.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EditorArea {
    pub kind: EditorKind,
    #[serde(default)]
    pub image: Option<ImageId>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Scene {
    /// Location of the scene file; `//` paths resolve against its directory.
    pub filepath: Option<PathBuf>,
    pub objects: Registry<Object>,
    pub materials: Registry<Material>,
    pub images: Registry<Image>,
    pub node_groups: BTreeMap<String, NodeGroup>,
    pub collections: BTreeMap<String, Vec<ObjectId>>,
    pub frame_start: i32,
    pub frame_end: i32,
    pub frame_current: i32,
    pub render: RenderSettings,
    pub selection: Vec<ObjectId>,
    pub active_object: Option<ObjectId>,
    pub areas: Vec<EditorArea>,
    pub current_area: Option<usize>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            filepath: None,
            objects: Registry::default(),
            materials: Registry::default(),
            images: Registry::default(),
            node_groups: BTreeMap::new(),
            collections: BTreeMap::new(),
            frame_start: 1,
            frame_end: 250,
            frame_current: 1,
            render: RenderSettings::default(),
            selection: Vec::new(),
            active_object: None,
            areas: Vec::new(),
            current_area: None,
        }
    }
}

impl Scene {
    pub fn add_object(&mut self, object: Object) -> ObjectId {
        self.objects.insert(object)
    }

    pub fn add_mesh_object(&mut self, name: impl Into<String>, mesh: Mesh) -> ObjectId {
        self.add_object(Object::new(name, ObjectData::Mesh(mesh)))
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn add_image(&mut self, image: Image) -> ImageId {
        self.images.insert(image)
    }

    /// Append a material slot on `object`.
    pub fn assign_material(&mut self, object: ObjectId, material: MaterialId) -> BakeResult<()> {
        if !self.materials.contains(material) {
            return Err(BakeError::validation("material handle is stale"));
        }
        let obj = self
            .objects
            .get_mut(object)
            .ok_or_else(|| BakeError::validation("object handle is stale"))?;
        obj.material_slots.push(Some(material));
        Ok(())
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.images.get(id)
    }

    pub fn image_mut(&mut self, id: ImageId) -> Option<&mut Image> {
        self.images.get_mut(id)
    }

    pub fn object_name(&self, id: ObjectId) -> String {
        self.object(id)
            .map(|o| o.name.clone())
            .unwrap_or_else(|| String::from("<missing>"))
    }

    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, o)| o.name == name)
            .map(|(id, _)| id)
    }

    pub fn find_material(&self, name: &str) -> Option<MaterialId> {
        self.materials
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| id)
    }

    pub fn find_image(&self, name: &str) -> Option<ImageId> {
        self.images
            .iter()
            .find(|(_, i)| i.name == name)
            .map(|(id, _)| id)
    }

    /// Host-style user count: image-texture nodes plus a fake user.
    pub fn image_users(&self, id: ImageId) -> usize {
        let nodes = self
            .materials
            .iter()
            .flat_map(|(_, m)| m.node_tree.nodes.iter())
            .filter(|n| n.image == Some(id))
            .count();
        let fake = self.image(id).is_some_and(|i| i.fake_user);
        nodes + usize::from(fake)
    }

    /// Remove an image, clearing node and editor references to it.
    pub fn remove_image(&mut self, id: ImageId) -> Option<Image> {
        let image = self.images.remove(id)?;
        for (_, mat) in self.materials.iter_mut() {
            for node in &mut mat.node_tree.nodes {
                if node.image == Some(id) {
                    node.image = None;
                }
            }
        }
        for area in &mut self.areas {
            if area.image == Some(id) {
                area.image = None;
            }
        }
        Some(image)
    }

    /// Remove an object, dropping it from selection and collections.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        let object = self.objects.remove(id)?;
        self.selection.retain(|&o| o != id);
        if self.active_object == Some(id) {
            self.active_object = None;
        }
        for members in self.collections.values_mut() {
            members.retain(|&o| o != id);
        }
        Some(object)
    }

    pub fn link_to_collection(&mut self, collection: &str, object: ObjectId) {
        let members = self.collections.entry(collection.to_string()).or_default();
        if !members.contains(&object) {
            members.push(object);
        }
    }

    pub fn blend_dir(&self) -> Option<&Path> {
        self.filepath.as_deref().and_then(Path::parent)
    }

    /// Resolve a `//`-relative path against the scene file directory.
    pub fn abspath(&self, path: &str) -> PathBuf {
        match path.strip_prefix("//") {
            Some(rest) => match self.blend_dir() {
                Some(dir) => dir.join(rest),
                None => PathBuf::from(rest),
            },
            None => PathBuf::from(path),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/scene.rs"]
mod tests;
