use crate::scene::MaterialId;
use crate::scene::mesh::Mesh;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ObjectData {
    Mesh(Mesh),
    Empty,
    Curve,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Object {
    pub name: String,
    pub data: ObjectData,
    #[serde(default)]
    pub material_slots: Vec<Option<MaterialId>>,
}

impl Object {
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            data,
            material_slots: Vec::new(),
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.data, ObjectData::Mesh(_))
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.data {
            ObjectData::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.data {
            ObjectData::Mesh(m) => Some(m),
            _ => None,
        }
    }

    /// Assigned materials in slot order, empty slots skipped.
    pub fn materials(&self) -> Vec<MaterialId> {
        self.material_slots.iter().flatten().copied().collect()
    }

    pub fn primary_material(&self) -> Option<MaterialId> {
        self.material_slots.first().copied().flatten()
    }

    pub fn has_uv(&self) -> bool {
        self.mesh().is_some_and(|m| !m.uv_layers.is_empty())
    }
}
