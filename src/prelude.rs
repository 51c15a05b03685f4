// src/prelude.rs
//! A convenient prelude re-exporting the common types.

pub use crate::coords::{ChunkCoords, CHUNK_HEIGHT, CHUNK_SIZE};
pub use crate::field::{ColorField, DensityField, HeightBands, TerrainField};
pub use crate::grid::ScalarGrid;
pub use crate::mesh::Mesh;
pub use crate::mesher::{MarchingCubes, MeshingPolicy};
pub use crate::chunk::Chunk;
pub use crate::world::{World, WorldConfig};
pub use crate::player::{ControlInput, Player};
pub use crate::sim::{SimConfig, Simulation};
