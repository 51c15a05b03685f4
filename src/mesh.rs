// src/mesh.rs

//! Triangle mesh buffers for one chunk, in the layout a render backend
//! uploads directly: flat `f32` position/normal/colour arrays plus a
//! `u32` index list, with a per-chunk world translation.

use nalgebra::Vector3;

use crate::field::ColorField;

const DEGENERATE_EPSILON: f32 = 1e-12;

#[derive(Clone, Debug)]
pub struct Mesh {
    /// Object-space to world-space translation (the chunk origin).
    pub translation: Vector3<f32>,
    /// Vertex positions, xyz triples, chunk-local.
    pub positions: Vec<f32>,
    /// Per-vertex normals; same length as `positions` once assigned.
    pub normals: Vec<f32>,
    /// Per-vertex colours; same length as `positions` once assigned.
    pub colors: Vec<f32>,
    /// Index triples, each referencing three positions.
    pub indices: Vec<u32>,
    /// Bounciness of contacts against this mesh: 0 stops, 1 reflects.
    pub restitution: f32,
}

impl Mesh {
    pub fn new(translation: Vector3<f32>) -> Self {
        Self {
            translation,
            positions: Vec::new(),
            normals: Vec::new(),
            colors: Vec::new(),
            indices: Vec::new(),
            restitution: 0.0,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Chunk-local position of vertex `i`.
    pub fn vertex(&self, i: u32) -> Vector3<f32> {
        let base = i as usize * 3;
        Vector3::new(
            self.positions[base],
            self.positions[base + 1],
            self.positions[base + 2],
        )
    }

    /// Normal stored for vertex `i`.
    pub fn normal(&self, i: u32) -> Vector3<f32> {
        let base = i as usize * 3;
        Vector3::new(
            self.normals[base],
            self.normals[base + 1],
            self.normals[base + 2],
        )
    }

    fn write_normal(&mut self, i: u32, n: Vector3<f32>) {
        let base = i as usize * 3;
        self.normals[base] = n.x;
        self.normals[base + 1] = n.y;
        self.normals[base + 2] = n.z;
    }

    /// Assign one face normal per triangle, replicated to its three
    /// vertices. Degenerate triangles (zero-area cross product) get an
    /// up normal instead of NaN.
    pub fn set_flat_normals(&mut self) {
        self.normals = vec![0.0; self.positions.len()];
        for t in 0..self.triangle_count() {
            let (i0, i1, i2) = self.triangle(t);
            let n = self.face_normal(i0, i1, i2);
            self.write_normal(i0, n);
            self.write_normal(i1, n);
            self.write_normal(i2, n);
        }
    }

    /// Accumulate face normals into shared vertices and normalise,
    /// for welded meshes that want smooth shading.
    pub fn set_smooth_normals(&mut self) {
        self.normals = vec![0.0; self.positions.len()];
        for t in 0..self.triangle_count() {
            let (i0, i1, i2) = self.triangle(t);
            let n = self.face_normal(i0, i1, i2);
            for i in [i0, i1, i2] {
                let accumulated = self.normal(i) + n;
                self.write_normal(i, accumulated);
            }
        }
        for i in 0..self.vertex_count() as u32 {
            let n = self.normal(i);
            if n.norm_squared() > DEGENERATE_EPSILON {
                self.write_normal(i, n.normalize());
            } else {
                self.write_normal(i, Vector3::y());
            }
        }
    }

    fn triangle(&self, t: usize) -> (u32, u32, u32) {
        (
            self.indices[t * 3],
            self.indices[t * 3 + 1],
            self.indices[t * 3 + 2],
        )
    }

    fn face_normal(&self, i0: u32, i1: u32, i2: u32) -> Vector3<f32> {
        let v0 = self.vertex(i0);
        let v1 = self.vertex(i1);
        let v2 = self.vertex(i2);
        let cross = (v1 - v0).cross(&(v2 - v0));
        if cross.norm_squared() > DEGENERATE_EPSILON {
            cross.normalize()
        } else {
            Vector3::y()
        }
    }

    /// Evaluate `field` at each triangle's world-space centroid and
    /// write the result to all three of its vertices (per-triangle flat
    /// colour).
    pub fn set_colors_by(&mut self, field: &dyn ColorField) {
        self.colors = vec![0.0; self.positions.len()];
        for t in 0..self.triangle_count() {
            let (i0, i1, i2) = self.triangle(t);
            let centroid =
                (self.vertex(i0) + self.vertex(i1) + self.vertex(i2)) / 3.0 + self.translation;
            let c = field.color(centroid.x, centroid.y, centroid.z);
            for i in [i0, i1, i2] {
                let base = i as usize * 3;
                self.colors[base] = c.x;
                self.colors[base + 1] = c.y;
                self.colors[base + 2] = c.z;
            }
        }
    }

    /// Nearest positive ray hit against this mesh, in world space.
    /// Back faces are culled.
    pub fn raycast(&self, origin: Vector3<f32>, direction: Vector3<f32>) -> Option<f32> {
        let local_origin = origin - self.translation;
        let mut min_dist: Option<f32> = None;

        for t in 0..self.triangle_count() {
            let (i0, i1, i2) = self.triangle(t);
            if let Some(d) = intersect_triangle(
                local_origin,
                direction,
                self.vertex(i0),
                self.vertex(i1),
                self.vertex(i2),
            ) {
                if min_dist.map_or(true, |m| d < m) {
                    min_dist = Some(d);
                }
            }
        }

        min_dist
    }
}

/// Möller–Trumbore ray/triangle intersection, front faces only.
fn intersect_triangle(
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    v0: Vector3<f32>,
    v1: Vector3<f32>,
    v2: Vector3<f32>,
) -> Option<f32> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = direction.cross(&edge2);
    let det = edge1.dot(&pvec);
    if det < 1e-6 {
        return None;
    }

    let tvec = origin - v0;
    let u = tvec.dot(&pvec);
    if u < 0.0 || u > det {
        return None;
    }

    let qvec = tvec.cross(&edge1);
    let v = direction.dot(&qvec);
    if v < 0.0 || u + v > det {
        return None;
    }

    let t = edge2.dot(&qvec) / det;
    if t < 0.0 {
        return None;
    }
    Some(t)
}
