use std::collections::{BTreeMap, BTreeSet};

use crate::channels::IdKind;
use crate::foundation::core::Rgba;
use crate::pixel::id_colors::{IdColorParams, generate_distinct_colors};
use crate::scene::{Attribute, AttributeDomain, AttributeType, Mesh, ObjectId, Scene};

const UV_CONTINUITY_EPS: f64 = 1e-5;

/// Create the per-corner colour attribute for an ID map.
///
/// Returns the attribute name, or `None` for non-mesh objects and empty
/// meshes. An existing attribute of the same kind is reused untouched.
pub fn build_id_attribute(
    scene: &mut Scene,
    object: ObjectId,
    kind: IdKind,
    params: &IdColorParams,
) -> Option<String> {
    let mesh = scene.object_mut(object)?.mesh_mut()?;
    let name = kind.attribute_name();
    if mesh.attribute(&name).is_some() {
        return Some(name);
    }
    if mesh.face_count() == 0 {
        return None;
    }

    let face_colors = match kind {
        IdKind::Mat => material_face_colors(mesh, params),
        _ => {
            let (island_of, count) = face_islands(mesh, kind);
            let palette = generate_distinct_colors(count.max(1), params);
            island_of.iter().map(|&i| palette[i]).collect()
        }
    };

    let mut values = Vec::with_capacity(mesh.loop_count());
    for (face, color) in face_colors.iter().enumerate() {
        values.extend(std::iter::repeat_n(*color, mesh.face_loops(face).len()));
    }
    mesh.add_attribute(Attribute {
        name: name.clone(),
        domain: AttributeDomain::Corner,
        data_type: AttributeType::ByteColor,
        values,
    });
    tracing::debug!(attribute = %name, "id attribute created");
    Some(name)
}

fn material_face_colors(mesh: &Mesh, params: &IdColorParams) -> Vec<Rgba> {
    let unique: BTreeSet<u32> = mesh.polygons.iter().map(|p| p.material_index).collect();
    let palette = generate_distinct_colors(unique.len(), params);
    let lookup: BTreeMap<u32, Rgba> = unique.into_iter().zip(palette).collect();
    mesh.polygons
        .iter()
        .map(|p| lookup.get(&p.material_index).copied().unwrap_or([0.0, 0.0, 0.0, 1.0]))
        .collect()
}

/// Island index per face and the island count. Islands are numbered by
/// their lowest face index.
pub fn face_islands(mesh: &Mesh, kind: IdKind) -> (Vec<usize>, usize) {
    let faces = mesh.face_count();
    let mut sets = DisjointSet::new(faces);

    let mut edge_faces: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for face in 0..faces {
        for l in mesh.face_loops(face) {
            edge_faces.entry(mesh.loop_edges[l]).or_default().push(face);
        }
    }

    let uv = match kind {
        IdKind::Uvi => mesh.active_uv_layer(),
        _ => None,
    };

    for (&edge, linked) in &edge_faces {
        let edge_data = mesh.edges[edge as usize];
        if kind == IdKind::Seam && edge_data.seam {
            continue;
        }
        for (i, &a) in linked.iter().enumerate() {
            for &b in &linked[i + 1..] {
                if let Some(layer) = uv {
                    let continuous = edge_data.vertices.iter().all(|&v| {
                        match (corner_of(mesh, a, v), corner_of(mesh, b, v)) {
                            (Some(la), Some(lb)) => {
                                (layer.data[la] - layer.data[lb]).hypot2() <= UV_CONTINUITY_EPS
                            }
                            _ => true,
                        }
                    });
                    if !continuous {
                        continue;
                    }
                }
                sets.union(a, b);
            }
        }
    }

    let mut numbering: BTreeMap<usize, usize> = BTreeMap::new();
    let island_of = (0..faces)
        .map(|f| {
            let root = sets.find(f);
            let next = numbering.len();
            *numbering.entry(root).or_insert(next)
        })
        .collect();
    (island_of, numbering.len())
}

fn corner_of(mesh: &Mesh, face: usize, vertex: u32) -> Option<usize> {
    mesh.face_loops(face)
        .find(|&l| mesh.loop_vertices[l] == vertex)
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/id_attribute.rs"]
mod tests;
