// src/world.rs

//! Chunk streaming: decides which regions exist, the order they
//! generate in, and how many generate per tick.

use std::collections::HashMap;

use log::{debug, warn};
use nalgebra::Vector3;

use crate::chunk::Chunk;
use crate::coords::ChunkCoords;
use crate::field::{ColorField, DensityField};
use crate::mesher::MeshingPolicy;

/// Load state per known chunk key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChunkState {
    Queued,
    /// Index into the loaded-chunk list.
    Loaded(usize),
}

#[derive(Clone, Copy, Debug)]
pub struct WorldConfig {
    /// Iso-level handed to the mesher.
    pub iso_level: f32,
    /// Vertex sharing policy for generated meshes.
    pub policy: MeshingPolicy,
    /// Half-width, in chunks, of the square kept queued around the
    /// observer.
    pub load_radius: i32,
    /// Restitution stamped onto every generated mesh.
    pub restitution: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            iso_level: 0.0,
            policy: MeshingPolicy::Flat,
            load_radius: 5,
            restitution: 0.0,
        }
    }
}

/// The streamed chunk map. Chunks move from queued to loaded; nothing
/// is ever evicted.
pub struct World {
    density: Box<dyn DensityField>,
    color: Box<dyn ColorField>,
    config: WorldConfig,
    states: HashMap<ChunkCoords, ChunkState>,
    chunks: Vec<Chunk>,
    load_queue: Vec<Chunk>,
}

impl World {
    pub fn new(
        density: Box<dyn DensityField>,
        color: Box<dyn ColorField>,
        config: WorldConfig,
    ) -> Self {
        Self {
            density,
            color,
            config,
            states: HashMap::new(),
            chunks: Vec::new(),
            load_queue: Vec::new(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// All loaded chunks, for the render pass.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn loaded_len(&self) -> usize {
        self.chunks.len()
    }

    pub fn queued_len(&self) -> usize {
        self.load_queue.len()
    }

    pub fn is_known(&self, coords: ChunkCoords) -> bool {
        self.states.contains_key(&coords)
    }

    pub fn chunk_at(&self, coords: ChunkCoords) -> Option<&Chunk> {
        match self.states.get(&coords) {
            Some(ChunkState::Loaded(index)) => Some(&self.chunks[*index]),
            _ => None,
        }
    }

    /// Queue every unknown chunk within the configured square radius of
    /// `center`, then re-sort the queue so the nearest chunks generate
    /// first. Already-known chunks are untouched.
    pub fn ensure_queued(&mut self, center: &Vector3<f32>) {
        let around = ChunkCoords::from_world(center.x, center.z);
        let r = self.config.load_radius;
        let mut queued = 0;

        for dx in -r..=r {
            for dz in -r..=r {
                let coords = ChunkCoords {
                    x: around.x + dx,
                    z: around.z + dz,
                };
                if self.states.contains_key(&coords) {
                    continue;
                }
                self.states.insert(coords, ChunkState::Queued);
                self.load_queue.push(Chunk::new(coords));
                queued += 1;
            }
        }

        if queued > 0 {
            debug!("queued {queued} chunks around ({}, {})", around.x, around.z);
        }

        // Stable sort keeps insertion order between equidistant chunks.
        self.load_queue
            .sort_by(|a, b| {
                let da = a.coords().distance_sq_to(center);
                let db = b.coords().distance_sq_to(center);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            });
    }

    /// Generate up to `max_chunks` queued chunks, nearest first.
    /// Returns how many were loaded. A chunk that fails to generate is
    /// forgotten (not committed) so a later `ensure_queued` can retry
    /// it.
    pub fn advance(&mut self, max_chunks: usize) -> usize {
        let take = max_chunks.min(self.load_queue.len());
        if take == 0 {
            return 0;
        }

        let mut loaded = 0;
        for mut chunk in self.load_queue.drain(..take).collect::<Vec<_>>() {
            let result = chunk.generate(
                self.density.as_ref(),
                self.color.as_ref(),
                self.config.iso_level,
                self.config.policy,
                self.config.restitution,
            );
            match result {
                Ok(()) => {
                    self.states
                        .insert(chunk.coords(), ChunkState::Loaded(self.chunks.len()));
                    self.chunks.push(chunk);
                    loaded += 1;
                }
                Err(error) => {
                    warn!(
                        "chunk ({}, {}) failed to generate: {error}",
                        chunk.coords().x,
                        chunk.coords().z
                    );
                    self.states.remove(&chunk.coords());
                }
            }
        }
        loaded
    }

    /// Loaded chunks within `ring` chunk-widths of the chunk containing
    /// `center` — the candidate set for collision and raycasts.
    pub fn neighbors_of(&self, center: &Vector3<f32>, ring: i32) -> Vec<&Chunk> {
        let around = ChunkCoords::from_world(center.x, center.z);
        let mut neighbors = Vec::new();
        for dx in -ring..=ring {
            for dz in -ring..=ring {
                let coords = ChunkCoords {
                    x: around.x + dx,
                    z: around.z + dz,
                };
                if let Some(chunk) = self.chunk_at(coords) {
                    neighbors.push(chunk);
                }
            }
        }
        neighbors
    }

    /// Nearest positive ray hit against the meshes of the chunks around
    /// the ray origin.
    pub fn raycast(
        &self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        ring: i32,
    ) -> Option<f32> {
        let mut min_dist: Option<f32> = None;
        for chunk in self.neighbors_of(&origin, ring) {
            if let Some(d) = chunk.mesh().raycast(origin, direction) {
                if min_dist.map_or(true, |m| d < m) {
                    min_dist = Some(d);
                }
            }
        }
        min_dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn flat_ground(_x: f32, y: f32, _z: f32) -> f32 {
        -y
    }

    fn white(_x: f32, _y: f32, _z: f32) -> Vector3<f32> {
        Vector3::new(1.0, 1.0, 1.0)
    }

    fn test_world(load_radius: i32) -> World {
        World::new(
            Box::new(flat_ground),
            Box::new(white),
            WorldConfig {
                load_radius,
                ..WorldConfig::default()
            },
        )
    }

    fn loaded_keys(world: &World) -> HashSet<(i32, i32)> {
        world
            .chunks()
            .iter()
            .map(|c| (c.coords().x, c.coords().z))
            .collect()
    }

    #[test]
    fn ensure_queued_fills_square_and_is_idempotent() {
        let mut world = test_world(2);
        let center = Vector3::new(0.0, 0.0, 0.0);
        world.ensure_queued(&center);
        assert_eq!(world.queued_len(), 25);

        world.ensure_queued(&center);
        assert_eq!(world.queued_len(), 25);
    }

    #[test]
    fn nearest_chunk_loads_first() {
        let mut world = test_world(2);
        let center = Vector3::new(40.0, 0.0, -24.0);
        world.ensure_queued(&center);
        assert_eq!(world.advance(1), 1);

        let expected = ChunkCoords::from_world(center.x, center.z);
        assert_eq!(world.chunks()[0].coords(), expected);
    }

    #[test]
    fn streaming_is_deterministic_across_batch_sizes() {
        let center = Vector3::new(3.0, 0.0, 3.0);

        let mut one_by_one = test_world(2);
        one_by_one.ensure_queued(&center);
        while one_by_one.advance(1) > 0 {}

        let mut all_at_once = test_world(2);
        all_at_once.ensure_queued(&center);
        all_at_once.advance(usize::MAX);

        assert_eq!(loaded_keys(&one_by_one), loaded_keys(&all_at_once));
        assert_eq!(one_by_one.loaded_len(), 25);
        // No key loaded twice.
        assert_eq!(loaded_keys(&one_by_one).len(), one_by_one.loaded_len());
    }

    #[test]
    fn loaded_chunks_are_not_requeued() {
        let mut world = test_world(1);
        let center = Vector3::new(0.0, 0.0, 0.0);
        world.ensure_queued(&center);
        world.advance(usize::MAX);
        assert_eq!(world.loaded_len(), 9);

        world.ensure_queued(&center);
        assert_eq!(world.queued_len(), 0);
    }

    #[test]
    fn failed_generation_is_forgotten_and_retriable() {
        use std::cell::Cell;
        use std::rc::Rc;

        // Poison the density field for the first fill, then recover.
        let poisoned = Rc::new(Cell::new(true));
        let flag = Rc::clone(&poisoned);
        let density = move |_x: f32, y: f32, _z: f32| {
            if flag.get() {
                f32::NAN
            } else {
                -y
            }
        };

        let mut world = World::new(
            Box::new(density),
            Box::new(white),
            WorldConfig {
                load_radius: 0,
                ..WorldConfig::default()
            },
        );
        let center = Vector3::new(0.0, 0.0, 0.0);
        world.ensure_queued(&center);
        assert_eq!(world.advance(1), 0);
        assert_eq!(world.loaded_len(), 0);
        assert!(!world.is_known(ChunkCoords { x: 0, z: 0 }));

        poisoned.set(false);
        world.ensure_queued(&center);
        assert_eq!(world.advance(1), 1);
        assert_eq!(world.loaded_len(), 1);
    }

    #[test]
    fn neighbors_are_limited_to_the_ring() {
        let mut world = test_world(3);
        let center = Vector3::new(0.0, 0.0, 0.0);
        world.ensure_queued(&center);
        world.advance(usize::MAX);
        assert_eq!(world.loaded_len(), 49);

        let neighbors = world.neighbors_of(&center, 1);
        assert_eq!(neighbors.len(), 9);
        for chunk in neighbors {
            assert!(chunk.coords().x.abs() <= 1 && chunk.coords().z.abs() <= 1);
        }
    }

    #[test]
    fn raycast_hits_the_ground_below() {
        let mut world = test_world(1);
        let origin = Vector3::new(4.0, 10.0, 4.0);
        world.ensure_queued(&origin);
        world.advance(usize::MAX);

        // Ground surface is at world y = 0 (density = -y).
        let hit = world.raycast(origin, Vector3::new(0.0, -1.0, 0.0), 1);
        let distance = hit.expect("ray should hit the ground");
        assert!((distance - 10.0).abs() < 0.1, "distance {distance}");

        // Pointing up hits nothing.
        assert!(world
            .raycast(origin, Vector3::new(0.0, 1.0, 0.0), 1)
            .is_none());
    }
}
