// src/mesher/mod.rs

//! Marching-cubes isosurface extraction.
//!
//! Walks every cube cell of a [`ScalarGrid`], classifies its 8 corners
//! against the iso-level, and emits the case-table triangulation with
//! vertices linearly interpolated along crossed edges. Corner values at
//! or above the iso-level count as solid; the emitted surface winds its
//! front faces toward the air side.

mod tables;

use std::collections::HashMap;

use log::debug;
use nalgebra::Vector3;

use crate::field::DensityField;
use crate::grid::ScalarGrid;
use crate::mesh::Mesh;

use self::tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};

const EDGE_EPSILON: f32 = 1e-6;

/// How cube-cell vertices are shared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshingPolicy {
    /// Three fresh vertices per triangle; pairs with flat normals.
    Flat,
    /// Edge-crossing vertices shared between the cells touching the
    /// edge (within one chunk); pairs with smoothed normals.
    Welded,
}

/// Isosurface mesher over an `nx * ny * nz` grid of cube cells.
///
/// Owns the sample lattice, which is one point larger per axis than the
/// cell grid so every cell can read its far corners.
pub struct MarchingCubes {
    nx: usize,
    ny: usize,
    nz: usize,
    iso_level: f32,
    policy: MeshingPolicy,
    grid: ScalarGrid,
    cell_triangles: Vec<Option<(u32, u8)>>,
}

impl MarchingCubes {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            iso_level: 0.0,
            policy: MeshingPolicy::Flat,
            grid: ScalarGrid::new(nx + 1, ny + 1, nz + 1),
            cell_triangles: vec![None; nx * ny * nz],
        }
    }

    pub fn with_iso_level(mut self, iso_level: f32) -> Self {
        self.iso_level = iso_level;
        self
    }

    pub fn with_policy(mut self, policy: MeshingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MeshingPolicy {
        self.policy
    }

    pub fn grid(&self) -> &ScalarGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut ScalarGrid {
        &mut self.grid
    }

    /// Sample `field` into the lattice, offset by the chunk origin.
    pub fn fill_voxels(&mut self, field: &dyn DensityField, offset: Vector3<f32>) {
        self.grid.fill(field, offset);
    }

    /// First triangle index and triangle count emitted for cell
    /// `(x, y, z)` by the last `fill_mesh` call, if any.
    pub fn cell_triangles(&self, x: usize, y: usize, z: usize) -> Option<(u32, u8)> {
        self.cell_triangles[x + y * self.nx + z * self.nx * self.ny]
    }

    /// Extract the isosurface into `mesh`, replacing its buffers.
    /// Normals and colours are left for the caller to assign.
    pub fn fill_mesh(&mut self, mesh: &mut Mesh) {
        mesh.positions.clear();
        mesh.normals.clear();
        mesh.colors.clear();
        mesh.indices.clear();

        let mut welded: HashMap<(usize, usize), u32> = HashMap::new();

        for z in 0..self.nz {
            for y in 0..self.ny {
                for x in 0..self.nx {
                    let emitted = self.triangulate_cell(x, y, z, mesh, &mut welded);
                    let slot = x + y * self.nx + z * self.nx * self.ny;
                    self.cell_triangles[slot] = if emitted > 0 {
                        let start = mesh.triangle_count() as u32 - emitted as u32;
                        Some((start, emitted))
                    } else {
                        None
                    };
                }
            }
        }

        debug!(
            "meshed {}x{}x{} cells into {} triangles ({} vertices)",
            self.nx,
            self.ny,
            self.nz,
            mesh.triangle_count(),
            mesh.vertex_count()
        );
    }

    fn triangulate_cell(
        &self,
        x: usize,
        y: usize,
        z: usize,
        mesh: &mut Mesh,
        welded: &mut HashMap<(usize, usize), u32>,
    ) -> u8 {
        let mut corner_values = [0.0f32; 8];
        for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
            corner_values[i] = self.grid.value(x + offset[0], y + offset[1], z + offset[2]);
        }

        // Configuration code: bit i set when corner i is on the air side.
        let mut code = 0usize;
        for (i, value) in corner_values.iter().enumerate() {
            if *value < self.iso_level {
                code |= 1 << i;
            }
        }

        let edge_mask = EDGE_TABLE[code];
        if edge_mask == 0 {
            return 0;
        }

        // Interpolated crossing point on each crossed edge, cell-local.
        let mut edge_points = [Vector3::zeros(); 12];
        for edge in 0..12 {
            if edge_mask & (1 << edge) == 0 {
                continue;
            }
            let c0 = EDGE_CORNERS[edge][0];
            let c1 = EDGE_CORNERS[edge][1];
            let t = edge_t(self.iso_level, corner_values[c0], corner_values[c1]);
            let p0 = corner_position(x, y, z, c0);
            let p1 = corner_position(x, y, z, c1);
            edge_points[edge] = p0 + (p1 - p0) * t;
        }

        let mut emitted = 0u8;
        let row = &TRI_TABLE[code];
        let mut i = 0;
        while row[i] != -1 {
            for k in 0..3 {
                let edge = row[i + k] as usize;
                let index = match self.policy {
                    MeshingPolicy::Flat => push_vertex(mesh, edge_points[edge]),
                    MeshingPolicy::Welded => {
                        let key = self.edge_key(x, y, z, edge);
                        *welded
                            .entry(key)
                            .or_insert_with(|| push_vertex(mesh, edge_points[edge]))
                    }
                };
                mesh.indices.push(index);
            }
            emitted += 1;
            i += 3;
        }

        emitted
    }

    /// Chunk-global identity of a cell edge: the lattice index of its
    /// lower endpoint plus the axis it runs along.
    fn edge_key(&self, x: usize, y: usize, z: usize, edge: usize) -> (usize, usize) {
        let a = CORNER_OFFSETS[EDGE_CORNERS[edge][0]];
        let b = CORNER_OFFSETS[EDGE_CORNERS[edge][1]];
        let lower = [
            x + a[0].min(b[0]),
            y + a[1].min(b[1]),
            z + a[2].min(b[2]),
        ];
        let axis = (0..3).find(|&i| a[i] != b[i]).unwrap_or(0);
        (self.grid.index(lower[0], lower[1], lower[2]), axis)
    }
}

fn corner_position(x: usize, y: usize, z: usize, corner: usize) -> Vector3<f32> {
    let offset = CORNER_OFFSETS[corner];
    Vector3::new(
        (x + offset[0]) as f32,
        (y + offset[1]) as f32,
        (z + offset[2]) as f32,
    )
}

fn push_vertex(mesh: &mut Mesh, p: Vector3<f32>) -> u32 {
    let index = mesh.vertex_count() as u32;
    mesh.positions.extend_from_slice(&[p.x, p.y, p.z]);
    index
}

/// Blend factor of the iso crossing along an edge, clamped to `[0, 1]`.
/// Equal corner values land the vertex mid-edge instead of dividing by
/// zero.
fn edge_t(iso_level: f32, v0: f32, v1: f32) -> f32 {
    if (v1 - v0).abs() < EDGE_EPSILON {
        return 0.5;
    }
    ((iso_level - v0) / (v1 - v0)).clamp(0.0, 1.0)
}
