use std::collections::{BTreeMap, BTreeSet};

use crate::channels::{BakePass, ID_ATTRIBUTE_PREFIX};
use crate::foundation::core::{Rgba, UdimTile, Vec2};
use crate::foundation::error::{BakeError, BakeResult};
use crate::render::backend::{BakeBackend, BakeParams, NormalSpace};
use crate::scene::{
    AttributeDomain, Image, ImageId, MathOp, Mesh, Node, NodeGroup, NodeKind, NodeTree, ObjectId,
    Registry, Scene, SocketRef,
};

const BLACK: Rgba = [0.0, 0.0, 0.0, 1.0];
const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];
const MAX_DEPTH: usize = 64;

/// CPU baker evaluating shading graphs once per face and rasterizing the
/// flat result in UV space.
///
/// Lighting is not simulated: lighting passes return the surface albedo,
/// occlusion nodes evaluate as fully open and wireframe as empty. Selected
/// to active bakes evaluate the active object's own surface instead of
/// casting rays. The margin is a pixel dilation around the baked islands.
#[derive(Debug, Default)]
pub struct ReferenceBaker;

struct Splat {
    image: ImageId,
    color: Rgba,
    uv: Vec<Vec2>,
}

impl BakeBackend for ReferenceBaker {
    #[tracing::instrument(skip_all, fields(pass = ?params.pass))]
    fn bake(&mut self, scene: &mut Scene, params: &BakeParams) -> BakeResult<()> {
        let targets: Vec<ObjectId> = if params.selected_to_active.is_some() {
            vec![params.active]
        } else {
            params.objects.clone()
        };
        let splats = collect_splats(scene, &targets, params);
        if splats.is_empty() {
            return Err(BakeError::render(
                "no active image texture node found on the baked materials",
            ));
        }

        let images: BTreeSet<ImageId> = splats.iter().map(|s| s.image).collect();
        if params.use_clear {
            for &id in &images {
                if let Some(img) = scene.image_mut(id) {
                    let fill = img.generated_color;
                    img.clear(fill);
                }
            }
        }

        let mut coverage: BTreeMap<(ImageId, UdimTile), Vec<bool>> = BTreeMap::new();
        for splat in &splats {
            rasterize(scene, splat, &mut coverage);
        }
        if params.margin > 0 {
            for ((id, tile), mask) in &coverage {
                let Some(data) = scene.image_mut(*id).and_then(|i| i.tiles.get_mut(tile)) else {
                    continue;
                };
                let (w, h) = (data.size.width as usize, data.size.height as usize);
                dilate(&mut data.pixels, mask, w, h, params.margin);
            }
        }
        tracing::debug!(faces = splats.len(), images = images.len(), "reference bake finished");
        Ok(())
    }
}

fn collect_splats(scene: &Scene, targets: &[ObjectId], params: &BakeParams) -> Vec<Splat> {
    let mut splats = Vec::new();
    for &id in targets {
        let Some(object) = scene.object(id) else {
            tracing::warn!("bake target object is gone");
            continue;
        };
        let Some(mesh) = object.mesh() else {
            continue;
        };
        let Some(layer) = mesh.active_render_uv.and_then(|i| mesh.uv_layers.get(i)) else {
            tracing::warn!(object = %object.name, "no render UV layer, object skipped");
            continue;
        };

        for face in 0..mesh.face_count() {
            let slot = mesh.polygons[face].material_index as usize;
            let Some(material) = object
                .material_slots
                .get(slot)
                .copied()
                .flatten()
                .and_then(|m| scene.material(m))
                .filter(|m| m.use_nodes)
            else {
                continue;
            };
            let tree = &material.node_tree;
            let Some(image) = tree
                .active
                .and_then(|n| tree.node(n))
                .filter(|n| matches!(n.kind, NodeKind::TexImage))
                .and_then(|n| n.image)
            else {
                continue;
            };

            let eval = Evaluator {
                tree,
                mesh,
                face,
                pass: params.pass,
                groups: &scene.node_groups,
                images: &scene.images,
            };
            splats.push(Splat {
                image,
                color: eval.shade(params.normal_space),
                uv: mesh
                    .face_loops(face)
                    .filter_map(|l| layer.data.get(l).copied())
                    .collect(),
            });
        }
    }
    splats
}

struct Evaluator<'a> {
    tree: &'a NodeTree,
    mesh: &'a Mesh,
    face: usize,
    pass: BakePass,
    groups: &'a BTreeMap<String, NodeGroup>,
    images: &'a Registry<Image>,
}

impl Evaluator<'_> {
    fn shade(&self, normal_space: NormalSpace) -> Rgba {
        match self.pass {
            BakePass::Normal => match normal_space {
                NormalSpace::Tangent => [0.5, 0.5, 1.0, 1.0],
                NormalSpace::Object => {
                    let n = self.normal();
                    [n[0] * 0.5 + 0.5, n[1] * 0.5 + 0.5, n[2] * 0.5 + 0.5, 1.0]
                }
            },
            BakePass::Shadow => WHITE,
            BakePass::Environment => BLACK,
            BakePass::Displacement => [0.5, 0.5, 0.5, 1.0],
            _ => {
                let surface = self
                    .tree
                    .material_output()
                    .and_then(|out| self.tree.source_of(&SocketRef::new(out, "Surface")));
                match surface {
                    Some(src) => self.eval(src, 0),
                    None => BLACK,
                }
            }
        }
    }

    fn input(&self, node: &Node, name: &str, depth: usize) -> Rgba {
        match self.tree.source_of(&SocketRef::new(node.id, name)) {
            Some(src) => self.eval(src, depth),
            None => node.input(name).map(|s| s.value.to_rgba()).unwrap_or(BLACK),
        }
    }

    fn eval(&self, src: &SocketRef, depth: usize) -> Rgba {
        if depth > MAX_DEPTH {
            tracing::warn!("shading graph too deep, treating as black");
            return BLACK;
        }
        let Some(node) = self.tree.node(src.node) else {
            return BLACK;
        };
        let input = |name: &str| self.input(node, name, depth + 1);
        let scalar = |name: &str| self.input(node, name, depth + 1)[0];
        let emit = self.pass == BakePass::Emit;

        match &node.kind {
            NodeKind::Rgb { color } => *color,
            NodeKind::Emission if emit => scale(input("Color"), scalar("Strength")),
            NodeKind::Emission => BLACK,
            NodeKind::PrincipledBsdf if emit => {
                scale(input("Emission Color"), scalar("Emission Strength"))
            }
            NodeKind::PrincipledBsdf => input("Base Color"),
            NodeKind::Attribute { attribute_name } => {
                attribute_output(self.attribute(attribute_name), &src.socket)
            }
            NodeKind::VertexColor { layer_name } => {
                let value = if layer_name.is_empty() {
                    self.mesh
                        .attributes
                        .iter()
                        .find(|a| !a.name.starts_with(ID_ATTRIBUTE_PREFIX))
                        .and_then(|a| self.attribute(&a.name))
                } else {
                    self.attribute(layer_name)
                };
                attribute_output(value.or(Some(WHITE)), &src.socket)
            }
            NodeKind::AmbientOcclusion { .. } => WHITE,
            NodeKind::NewGeometry => match src.socket.as_str() {
                "Position" => vector(self.centroid()),
                "Normal" | "True Normal" => vector(self.normal()),
                _ => [1.0, 0.0, 0.0, 1.0],
            },
            NodeKind::UvMap { uv_map } => {
                let uv = self.uv(uv_map);
                [uv.x as f32, uv.y as f32, 0.0, 1.0]
            }
            NodeKind::Wireframe { .. } => BLACK,
            NodeKind::Bevel { .. } | NodeKind::NormalMap => vector(self.normal()),
            NodeKind::Math { op } => splat(math(*op, scalar("Value"), scalar("Value_001"))),
            NodeKind::SeparateColor => {
                let c = input("Color");
                match src.socket.as_str() {
                    "Green" => splat(c[1]),
                    "Blue" => splat(c[2]),
                    _ => splat(c[0]),
                }
            }
            NodeKind::SeparateXyz => {
                let v = input("Vector");
                match src.socket.as_str() {
                    "Y" => splat(v[1]),
                    "Z" => splat(v[2]),
                    _ => splat(v[0]),
                }
            }
            NodeKind::Clamp => {
                let (lo, hi) = (scalar("Min"), scalar("Max"));
                splat(scalar("Value").max(lo).min(hi))
            }
            NodeKind::MixRgb => {
                let fac = scalar("Fac").clamp(0.0, 1.0);
                let (a, b) = (input("Color1"), input("Color2"));
                std::array::from_fn(|c| a[c] + (b[c] - a[c]) * fac)
            }
            NodeKind::Invert => {
                let fac = scalar("Fac");
                let c = input("Color");
                [
                    c[0] + fac * (1.0 - 2.0 * c[0]),
                    c[1] + fac * (1.0 - 2.0 * c[1]),
                    c[2] + fac * (1.0 - 2.0 * c[2]),
                    c[3],
                ]
            }
            NodeKind::Group { group } => self
                .groups
                .get(group)
                .and_then(|g| g.outputs.iter().find(|(name, _)| *name == src.socket))
                .map(|(_, v)| v.to_rgba())
                .unwrap_or(BLACK),
            NodeKind::TexImage => match src.socket.as_str() {
                "Alpha" => WHITE,
                _ => node
                    .image
                    .and_then(|id| self.images.get(id))
                    .map(|img| sample(img, self.uv("")))
                    .unwrap_or(BLACK),
            },
            NodeKind::OutputMaterial { .. } => BLACK,
        }
    }

    fn positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.mesh.face_loops(self.face).filter_map(|l| {
            let v = *self.mesh.loop_vertices.get(l)?;
            self.mesh.vertices.get(v as usize).copied()
        })
    }

    fn centroid(&self) -> [f32; 3] {
        let mut sum = [0.0f32; 3];
        let mut n = 0.0f32;
        for p in self.positions() {
            for (s, v) in sum.iter_mut().zip(p) {
                *s += v;
            }
            n += 1.0;
        }
        if n == 0.0 {
            return sum;
        }
        sum.map(|s| s / n)
    }

    /// Newell normal of the face polygon.
    fn normal(&self) -> [f32; 3] {
        let pts: Vec<[f32; 3]> = self.positions().collect();
        let mut n = [0.0f32; 3];
        for (i, a) in pts.iter().enumerate() {
            let b = pts[(i + 1) % pts.len()];
            n[0] += (a[1] - b[1]) * (a[2] + b[2]);
            n[1] += (a[2] - b[2]) * (a[0] + b[0]);
            n[2] += (a[0] - b[0]) * (a[1] + b[1]);
        }
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len <= f32::EPSILON {
            return [0.0, 0.0, 1.0];
        }
        n.map(|c| c / len)
    }

    /// Face value of a colour attribute, averaging corners or points.
    fn attribute(&self, name: &str) -> Option<Rgba> {
        let attr = self.mesh.attribute(name)?;
        let indices: Vec<usize> = match attr.domain {
            AttributeDomain::Face => vec![self.face],
            AttributeDomain::Corner => self.mesh.face_loops(self.face).collect(),
            AttributeDomain::Point => self
                .mesh
                .face_loops(self.face)
                .filter_map(|l| self.mesh.loop_vertices.get(l).map(|&v| v as usize))
                .collect(),
        };
        average(indices.iter().filter_map(|&i| attr.values.get(i).copied()))
    }

    fn uv(&self, layer: &str) -> Vec2 {
        let layer = if layer.is_empty() {
            self.mesh.active_render_uv
        } else {
            self.mesh.uv_layer_index(layer)
        };
        let Some(layer) = layer.and_then(|i| self.mesh.uv_layers.get(i)) else {
            return Vec2::ZERO;
        };
        let mut sum = Vec2::ZERO;
        let mut n = 0.0;
        for l in self.mesh.face_loops(self.face) {
            if let Some(p) = layer.data.get(l) {
                sum += *p;
                n += 1.0;
            }
        }
        if n == 0.0 { sum } else { sum / n }
    }
}

fn attribute_output(value: Option<Rgba>, socket: &str) -> Rgba {
    let Some(c) = value else {
        return BLACK;
    };
    match socket {
        "Fac" => splat((c[0] + c[1] + c[2]) / 3.0),
        "Alpha" => splat(c[3]),
        _ => c,
    }
}

fn average(values: impl Iterator<Item = Rgba>) -> Option<Rgba> {
    let mut sum = [0.0f32; 4];
    let mut n = 0usize;
    for v in values {
        for (s, c) in sum.iter_mut().zip(v) {
            *s += c;
        }
        n += 1;
    }
    (n > 0).then(|| sum.map(|s| s / n as f32))
}

fn math(op: MathOp, a: f32, b: f32) -> f32 {
    match op {
        MathOp::Add => a + b,
        MathOp::Subtract => a - b,
        MathOp::Multiply => a * b,
        MathOp::Divide if b == 0.0 => 0.0,
        MathOp::Divide => a / b,
        MathOp::Maximum => a.max(b),
        MathOp::Minimum => a.min(b),
        MathOp::Absolute => a.abs(),
    }
}

fn scale(c: Rgba, s: f32) -> Rgba {
    [c[0] * s, c[1] * s, c[2] * s, c[3]]
}

fn splat(v: f32) -> Rgba {
    [v, v, v, 1.0]
}

fn vector(v: [f32; 3]) -> Rgba {
    [v[0], v[1], v[2], 1.0]
}

/// Nearest-pixel lookup at `uv`, honouring UDIM tiles.
fn sample(image: &Image, uv: Vec2) -> Rgba {
    let (tile, local) = if image.is_tiled() {
        let (u, v) = (uv.x.floor(), uv.y.floor());
        let Some(tile) = UdimTile::from_floored(u as i64, v as i64) else {
            return BLACK;
        };
        (tile, Vec2::new(uv.x - u, uv.y - v))
    } else {
        (UdimTile::FIRST, Vec2::new(uv.x.rem_euclid(1.0), uv.y.rem_euclid(1.0)))
    };
    let Some(data) = image.tiles.get(&tile).filter(|t| t.is_initialized()) else {
        return BLACK;
    };
    let (w, h) = (data.size.width as usize, data.size.height as usize);
    if w == 0 || h == 0 {
        return BLACK;
    }
    let x = ((local.x * w as f64) as usize).min(w - 1);
    let y = ((local.y * h as f64) as usize).min(h - 1);
    let i = (y * w + x) * 4;
    match data.pixels.get(i..i + 4) {
        Some(px) => [px[0], px[1], px[2], px[3]],
        None => BLACK,
    }
}

fn rasterize(
    scene: &mut Scene,
    splat: &Splat,
    coverage: &mut BTreeMap<(ImageId, UdimTile), Vec<bool>>,
) {
    let Some(image) = scene.image_mut(splat.image) else {
        return;
    };
    let tiled = image.is_tiled();
    for (&tile, data) in image.tiles.iter_mut() {
        if !data.is_initialized() {
            continue;
        }
        let (w, h) = (data.size.width as usize, data.size.height as usize);
        if w == 0 || h == 0 {
            continue;
        }
        let origin = if tiled {
            Vec2::new(f64::from(tile.u()), f64::from(tile.v()))
        } else {
            Vec2::ZERO
        };
        let local: Vec<Vec2> = splat
            .uv
            .iter()
            .map(|p| Vec2::new((p.x - origin.x) * w as f64, (p.y - origin.y) * h as f64))
            .collect();
        let mask = coverage
            .entry((splat.image, tile))
            .or_insert_with(|| vec![false; w * h]);

        for i in 1..local.len().saturating_sub(1) {
            for idx in triangle_pixels([local[0], local[i], local[i + 1]], w, h) {
                data.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&splat.color);
                mask[idx] = true;
            }
        }
    }
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Pixel indices whose centres fall inside the triangle (pixel space, row 0 at v = 0).
fn triangle_pixels(tri: [Vec2; 3], w: usize, h: usize) -> Vec<usize> {
    let area = edge(tri[0], tri[1], tri[2]);
    if area.abs() < 1e-12 {
        return Vec::new();
    }
    let lo = |f: fn(&Vec2) -> f64| tri.iter().map(f).fold(f64::INFINITY, f64::min);
    let hi = |f: fn(&Vec2) -> f64| tri.iter().map(f).fold(f64::NEG_INFINITY, f64::max);
    let min_x = lo(|p| p.x).floor().max(0.0) as usize;
    let min_y = lo(|p| p.y).floor().max(0.0) as usize;
    let max_x = (hi(|p| p.x).ceil().max(0.0) as usize).min(w);
    let max_y = (hi(|p| p.y).ceil().max(0.0) as usize).min(h);

    let mut out = Vec::new();
    for y in min_y..max_y {
        for x in min_x..max_x {
            let p = Vec2::new(x as f64 + 0.5, y as f64 + 0.5);
            let w0 = edge(tri[1], tri[2], p);
            let w1 = edge(tri[2], tri[0], p);
            let w2 = edge(tri[0], tri[1], p);
            let inside = if area > 0.0 {
                w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
            } else {
                w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0
            };
            if inside {
                out.push(y * w + x);
            }
        }
    }
    out
}

/// Grow covered pixels outward by `margin` rings (4-neighbourhood).
fn dilate(pixels: &mut [f32], mask: &[bool], w: usize, h: usize, margin: u32) {
    if pixels.len() != w * h * 4 || mask.len() != w * h {
        return;
    }
    let mut filled = mask.to_vec();
    for _ in 0..margin {
        let snapshot = filled.clone();
        let mut changed = false;
        for y in 0..h {
            for x in 0..w {
                let i = y * w + x;
                if snapshot[i] {
                    continue;
                }
                let neighbours = [
                    (x > 0).then(|| i - 1),
                    (x + 1 < w).then(|| i + 1),
                    (y > 0).then(|| i - w),
                    (y + 1 < h).then(|| i + w),
                ];
                if let Some(n) = neighbours.into_iter().flatten().find(|&n| snapshot[n]) {
                    pixels.copy_within(n * 4..n * 4 + 4, i * 4);
                    filled[i] = true;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/reference.rs"]
mod tests;
