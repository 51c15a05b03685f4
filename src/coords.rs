// src/coords.rs

use nalgebra::Vector3;

/// Chunk indices on the XZ plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkCoords {
    pub x: i32,
    pub z: i32,
}

impl ChunkCoords {
    /// The chunk containing a world-space position.
    pub fn from_world(x: f32, z: f32) -> Self {
        Self {
            x: (x / CHUNK_SIZE as f32).floor() as i32,
            z: (z / CHUNK_SIZE as f32).floor() as i32,
        }
    }

    /// World-space origin of this chunk (minimum corner of its lattice).
    /// Chunks are anchored at multiples of `CHUNK_SIZE` horizontally and
    /// centred on y = 0 vertically.
    pub fn origin(&self) -> Vector3<f32> {
        Vector3::new(
            (self.x * CHUNK_SIZE as i32) as f32,
            -(CHUNK_HEIGHT as f32) / 2.0,
            (self.z * CHUNK_SIZE as i32) as f32,
        )
    }

    /// World-space centre of the chunk's horizontal footprint.
    pub fn center_xz(&self) -> (f32, f32) {
        let half = CHUNK_SIZE as f32 / 2.0;
        let origin = self.origin();
        (origin.x + half, origin.z + half)
    }

    /// Squared horizontal distance from the chunk centre to a point.
    pub fn distance_sq_to(&self, point: &Vector3<f32>) -> f32 {
        let (cx, cz) = self.center_xz();
        let dx = cx - point.x;
        let dz = cz - point.z;
        dx * dx + dz * dz
    }
}

/// How many cube cells per horizontal edge of a chunk.
pub const CHUNK_SIZE: usize = 16;

/// How many cube cells per vertical edge of a chunk.
pub const CHUNK_HEIGHT: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.0, 0.0 => ChunkCoords { x: 0, z: 0 })]
    #[test_case(15.9, 15.9 => ChunkCoords { x: 0, z: 0 })]
    #[test_case(16.0, 0.0 => ChunkCoords { x: 1, z: 0 })]
    #[test_case(-0.1, -0.1 => ChunkCoords { x: -1, z: -1 })]
    #[test_case(-16.1, 32.5 => ChunkCoords { x: -2, z: 2 })]
    fn from_world_floors_negative_coords(x: f32, z: f32) -> ChunkCoords {
        ChunkCoords::from_world(x, z)
    }

    #[test]
    fn origin_is_anchored_at_chunk_multiples() {
        let coords = ChunkCoords { x: -3, z: 2 };
        let origin = coords.origin();
        assert_eq!(origin.x, -48.0);
        assert_eq!(origin.y, -32.0);
        assert_eq!(origin.z, 32.0);
    }

    #[test]
    fn distance_is_measured_from_chunk_center() {
        let coords = ChunkCoords { x: 0, z: 0 };
        let at_center = Vector3::new(8.0, 0.0, 8.0);
        assert_eq!(coords.distance_sq_to(&at_center), 0.0);
        let off = Vector3::new(11.0, 99.0, 12.0);
        assert_eq!(coords.distance_sq_to(&off), 9.0 + 16.0);
    }
}
