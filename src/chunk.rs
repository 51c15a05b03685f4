// src/chunk.rs

//! One streamed terrain region: a fixed-footprint tile that samples the
//! density field into a transient grid, meshes it, and keeps the mesh.

use log::debug;
use thiserror::Error;

use crate::coords::{ChunkCoords, CHUNK_HEIGHT, CHUNK_SIZE};
use crate::field::{ColorField, DensityField};
use crate::mesh::Mesh;
use crate::mesher::{MarchingCubes, MeshingPolicy};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("density field produced a non-finite sample at lattice point ({x}, {y}, {z})")]
    NonFiniteDensity { x: usize, y: usize, z: usize },
}

pub struct Chunk {
    coords: ChunkCoords,
    mesh: Mesh,
    generated: bool,
}

impl Chunk {
    pub fn new(coords: ChunkCoords) -> Self {
        Self {
            coords,
            mesh: Mesh::new(coords.origin()),
            generated: false,
        }
    }

    pub fn coords(&self) -> ChunkCoords {
        self.coords
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Sample the density field over this chunk's lattice, extract the
    /// isosurface, then shade and colour it. The sample grid is dropped
    /// when this returns; only the mesh persists.
    ///
    /// On error the chunk is left untouched and may be regenerated.
    pub fn generate(
        &mut self,
        density: &dyn DensityField,
        color: &dyn ColorField,
        iso_level: f32,
        policy: MeshingPolicy,
        restitution: f32,
    ) -> Result<(), GenerateError> {
        let mut generator = MarchingCubes::new(CHUNK_SIZE, CHUNK_HEIGHT, CHUNK_SIZE)
            .with_iso_level(iso_level)
            .with_policy(policy);

        generator.fill_voxels(density, self.mesh.translation);
        if let Some(index) = generator
            .grid()
            .values()
            .iter()
            .position(|value| !value.is_finite())
        {
            let width = generator.grid().width();
            let height = generator.grid().height();
            return Err(GenerateError::NonFiniteDensity {
                x: index % width,
                y: (index / width) % height,
                z: index / (width * height),
            });
        }

        generator.fill_mesh(&mut self.mesh);
        match policy {
            MeshingPolicy::Flat => self.mesh.set_flat_normals(),
            MeshingPolicy::Welded => self.mesh.set_smooth_normals(),
        }
        self.mesh.set_colors_by(color);
        self.mesh.restitution = restitution;
        self.generated = true;

        debug!(
            "generated chunk ({}, {}): {} triangles",
            self.coords.x,
            self.coords.z,
            self.mesh.triangle_count()
        );
        Ok(())
    }

    /// Broad-phase reject: does the chunk's horizontal footprint,
    /// expanded by `radius`, contain the point `(x, z)`?
    pub fn overlaps_sphere_xz(&self, x: f32, z: f32, radius: f32) -> bool {
        let origin = self.mesh.translation;
        let size = CHUNK_SIZE as f32;
        x >= origin.x - radius
            && x <= origin.x + size + radius
            && z >= origin.z - radius
            && z <= origin.z + size + radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn flat_ground(_x: f32, y: f32, _z: f32) -> f32 {
        -y
    }

    fn white(_x: f32, _y: f32, _z: f32) -> Vector3<f32> {
        Vector3::new(1.0, 1.0, 1.0)
    }

    #[test]
    fn generate_produces_shaded_colored_mesh() {
        let mut chunk = Chunk::new(ChunkCoords { x: 0, z: 0 });
        chunk
            .generate(&flat_ground, &white, 0.0, MeshingPolicy::Flat, 0.0)
            .unwrap();

        assert!(chunk.is_generated());
        let mesh = chunk.mesh();
        assert!(mesh.triangle_count() > 0);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
        assert_eq!(mesh.colors.len(), mesh.positions.len());
    }

    #[test]
    fn ground_surface_sits_at_world_zero() {
        let mut chunk = Chunk::new(ChunkCoords { x: 2, z: -1 });
        chunk
            .generate(&flat_ground, &white, 0.0, MeshingPolicy::Flat, 0.0)
            .unwrap();

        // Density -y crosses zero at world y = 0; chunk-local vertices
        // plus the translation must land there.
        let mesh = chunk.mesh();
        for i in 0..mesh.vertex_count() as u32 {
            let world_y = mesh.vertex(i).y + mesh.translation.y;
            assert!(world_y.abs() < 1e-4, "surface vertex at y = {world_y}");
        }
    }

    #[test]
    fn non_finite_density_fails_without_committing() {
        let mut chunk = Chunk::new(ChunkCoords { x: 0, z: 0 });
        let result = chunk.generate(
            &|_x: f32, _y: f32, _z: f32| f32::NAN,
            &white,
            0.0,
            MeshingPolicy::Flat,
            0.0,
        );
        assert!(matches!(
            result,
            Err(GenerateError::NonFiniteDensity { .. })
        ));
        assert!(!chunk.is_generated());
        assert_eq!(chunk.mesh().triangle_count(), 0);
    }

    #[test]
    fn footprint_overlap_includes_radius() {
        let chunk = Chunk::new(ChunkCoords { x: 0, z: 0 });
        assert!(chunk.overlaps_sphere_xz(8.0, 8.0, 1.0));
        assert!(chunk.overlaps_sphere_xz(-1.5, 8.0, 2.0));
        assert!(!chunk.overlaps_sphere_xz(-3.0, 8.0, 2.0));
        assert!(!chunk.overlaps_sphere_xz(8.0, 20.0, 2.0));
    }
}
