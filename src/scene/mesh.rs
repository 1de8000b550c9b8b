use std::collections::BTreeMap;
use std::ops::Range;

use crate::foundation::core::{Rgba, Vec2};
use crate::foundation::error::{BakeError, BakeResult};

/// Hard limit on UV layers per mesh imposed by the host.
pub const MAX_UV_LAYERS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Polygon {
    pub loop_start: u32,
    pub loop_total: u32,
    #[serde(default)]
    pub material_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    pub vertices: [u32; 2],
    #[serde(default)]
    pub seam: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UvLayer {
    pub name: String,
    /// One coordinate per loop (face corner).
    pub data: Vec<Vec2>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttributeDomain {
    Point,
    Corner,
    Face,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AttributeType {
    ByteColor,
    FloatColor,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Attribute {
    pub name: String,
    pub domain: AttributeDomain,
    pub data_type: AttributeType,
    pub values: Vec<Rgba>,
}

/// Polygon mesh in the host's loop/edge/face layout.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    /// Vertex index per loop.
    pub loop_vertices: Vec<u32>,
    /// Edge index per loop (edge from this corner to the next one of the face).
    pub loop_edges: Vec<u32>,
    pub edges: Vec<Edge>,
    pub polygons: Vec<Polygon>,
    pub uv_layers: Vec<UvLayer>,
    pub active_uv: Option<usize>,
    pub active_render_uv: Option<usize>,
    pub attributes: Vec<Attribute>,
}

impl Mesh {
    /// Build a mesh from explicit faces, validating vertex indices.
    pub fn from_polygons(vertices: Vec<[f32; 3]>, faces: &[Vec<u32>]) -> BakeResult<Self> {
        for (fi, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(BakeError::validation(format!(
                    "face {fi} has fewer than 3 corners"
                )));
            }
            if let Some(v) = face.iter().find(|&&v| v as usize >= vertices.len()) {
                return Err(BakeError::validation(format!(
                    "face {fi} references missing vertex {v}"
                )));
            }
        }
        Ok(Self::build(vertices, faces))
    }

    fn build(vertices: Vec<[f32; 3]>, faces: &[Vec<u32>]) -> Self {
        let mut edge_lookup: BTreeMap<(u32, u32), u32> = BTreeMap::new();
        let mut edges = Vec::new();
        let mut loop_vertices = Vec::new();
        let mut loop_edges = Vec::new();
        let mut polygons = Vec::with_capacity(faces.len());

        for face in faces {
            let loop_start = loop_vertices.len() as u32;
            for (i, &a) in face.iter().enumerate() {
                let b = face[(i + 1) % face.len()];
                let key = (a.min(b), a.max(b));
                let edge = *edge_lookup.entry(key).or_insert_with(|| {
                    edges.push(Edge {
                        vertices: [key.0, key.1],
                        seam: false,
                    });
                    (edges.len() - 1) as u32
                });
                loop_vertices.push(a);
                loop_edges.push(edge);
            }
            polygons.push(Polygon {
                loop_start,
                loop_total: face.len() as u32,
                material_index: 0,
            });
        }

        Self {
            vertices,
            loop_vertices,
            loop_edges,
            edges,
            polygons,
            ..Self::default()
        }
    }

    /// Planar `cols x rows` quad grid over `[0, 1]^2` with a matching UV layer.
    pub fn grid(cols: u32, rows: u32) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        let mut vertices = Vec::new();
        for y in 0..=rows {
            for x in 0..=cols {
                vertices.push([x as f32 / cols as f32, y as f32 / rows as f32, 0.0]);
            }
        }
        let stride = cols + 1;
        let mut faces = Vec::new();
        for y in 0..rows {
            for x in 0..cols {
                let a = y * stride + x;
                faces.push(vec![a, a + 1, a + 1 + stride, a + stride]);
            }
        }
        Self::build(vertices, &faces).with_uv_from_positions("UVMap")
    }

    pub fn plane() -> Self {
        Self::grid(1, 1)
    }

    /// Append a UV layer projecting each corner's XY position, making it active
    /// when it is the first layer.
    pub fn with_uv_from_positions(mut self, name: &str) -> Self {
        let data = self
            .loop_vertices
            .iter()
            .map(|&v| {
                let p = self.vertices[v as usize];
                Vec2::new(f64::from(p[0]), f64::from(p[1]))
            })
            .collect();
        self.uv_layers.push(UvLayer {
            name: name.to_string(),
            data,
        });
        if self.active_uv.is_none() {
            self.active_uv = Some(self.uv_layers.len() - 1);
            self.active_render_uv = self.active_uv;
        }
        self
    }

    pub fn face_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn loop_count(&self) -> usize {
        self.loop_vertices.len()
    }

    pub fn face_loops(&self, face: usize) -> Range<usize> {
        let p = self.polygons[face];
        let start = p.loop_start as usize;
        start..start + p.loop_total as usize
    }

    pub fn set_material_indices(&mut self, indices: &[u32]) {
        for (p, &m) in self.polygons.iter_mut().zip(indices) {
            p.material_index = m;
        }
    }

    pub fn mark_seam(&mut self, a: u32, b: u32) -> bool {
        let key = [a.min(b), a.max(b)];
        match self.edges.iter_mut().find(|e| e.vertices == key) {
            Some(edge) => {
                edge.seam = true;
                true
            }
            None => false,
        }
    }

    pub fn active_uv_layer(&self) -> Option<&UvLayer> {
        self.active_uv.and_then(|i| self.uv_layers.get(i))
    }

    pub fn active_uv_layer_mut(&mut self) -> Option<&mut UvLayer> {
        self.active_uv.and_then(|i| self.uv_layers.get_mut(i))
    }

    pub fn uv_layer_index(&self, name: &str) -> Option<usize> {
        self.uv_layers.iter().position(|l| l.name == name)
    }

    /// Add a UV layer copying the active layer's coordinates.
    pub fn add_uv_layer(&mut self, name: &str) -> BakeResult<usize> {
        if self.uv_layers.len() >= MAX_UV_LAYERS {
            return Err(BakeError::validation(format!(
                "mesh already has {MAX_UV_LAYERS} UV layers"
            )));
        }
        let data = match self.active_uv_layer() {
            Some(layer) => layer.data.clone(),
            None => vec![Vec2::ZERO; self.loop_count()],
        };
        self.uv_layers.push(UvLayer {
            name: name.to_string(),
            data,
        });
        let index = self.uv_layers.len() - 1;
        if self.active_uv.is_none() {
            self.active_uv = Some(index);
        }
        if self.active_render_uv.is_none() {
            self.active_render_uv = Some(index);
        }
        Ok(index)
    }

    pub fn remove_uv_layer(&mut self, index: usize) -> BakeResult<UvLayer> {
        if index >= self.uv_layers.len() {
            return Err(BakeError::validation(format!(
                "UV layer index {index} out of range"
            )));
        }
        let layer = self.uv_layers.remove(index);
        let remaining = self.uv_layers.len();
        let fix = |slot: Option<usize>| -> Option<usize> {
            match slot {
                _ if remaining == 0 => None,
                Some(i) if i == index => Some(0),
                Some(i) if i > index => Some(i - 1),
                other => other,
            }
        };
        self.active_uv = fix(self.active_uv);
        self.active_render_uv = fix(self.active_render_uv);
        Ok(layer)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.remove_attribute(&attribute.name);
        self.attributes.push(attribute);
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| a.name != name);
        before != self.attributes.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/mesh.rs"]
mod tests;
