// src/grid.rs

//! Dense 3D sample storage for one chunk's density values.

use nalgebra::Vector3;

use crate::field::DensityField;

/// Bilinear blend of four corner values, `x` then `y`.
fn blerp(a: f32, b: f32, c: f32, d: f32, x: f32, y: f32) -> f32 {
    let v0 = a + (b - a) * x;
    let v1 = c + (d - c) * x;
    v0 + (v1 - v0) * y
}

/// A dense 3D array of scalar samples, x fastest-varying.
///
/// Dimensions are fixed at construction. Callers meshing an
/// `n`-cell cube grid must allocate `n + 1` lattice points per axis so
/// that cell corner reads at `n` stay in range.
pub struct ScalarGrid {
    width: usize,
    height: usize,
    depth: usize,
    values: Vec<f32>,
}

impl ScalarGrid {
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        assert!(
            width > 0 && height > 0 && depth > 0,
            "grid dimensions must be positive"
        );
        Self {
            width,
            height,
            depth,
            values: vec![0.0; width * height * depth],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Flat index of a lattice point. Out-of-range access is a
    /// precondition violation and panics.
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        assert!(
            x < self.width && y < self.height && z < self.depth,
            "lattice access ({}, {}, {}) outside grid ({}, {}, {})",
            x,
            y,
            z,
            self.width,
            self.height,
            self.depth
        );
        x + y * self.width + z * self.width * self.height
    }

    pub fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        self.values[self.index(x, y, z)]
    }

    pub fn set_value(&mut self, x: usize, y: usize, z: usize, value: f32) {
        let index = self.index(x, y, z);
        self.values[index] = value;
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Overwrite every lattice point with `field` evaluated at the
    /// point's world position (`lattice + offset`).
    pub fn fill(&mut self, field: &dyn DensityField, offset: Vector3<f32>) {
        for z in 0..self.depth {
            for y in 0..self.height {
                for x in 0..self.width {
                    let value = field.density(
                        x as f32 + offset.x,
                        y as f32 + offset.y,
                        z as f32 + offset.z,
                    );
                    self.set_value(x, y, z, value);
                }
            }
        }
    }

    /// Trilinear interpolation at fractional lattice coordinates. The
    /// caller must keep the surrounding cell in range (one-cell halo).
    pub fn interpolate(&self, x: f32, y: f32, z: f32) -> f32 {
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let z0 = z.floor() as usize;

        let xd = x - x0 as f32;
        let yd = y - y0 as f32;
        let zd = z - z0 as f32;

        let c00 = self.value(x0, y0, z0) * (1.0 - xd) + self.value(x0 + 1, y0, z0) * xd;
        let c10 = self.value(x0, y0 + 1, z0) * (1.0 - xd) + self.value(x0 + 1, y0 + 1, z0) * xd;
        let c01 = self.value(x0, y0, z0 + 1) * (1.0 - xd) + self.value(x0 + 1, y0, z0 + 1) * xd;
        let c11 =
            self.value(x0, y0 + 1, z0 + 1) * (1.0 - xd) + self.value(x0 + 1, y0 + 1, z0 + 1) * xd;

        let c0 = c00 * (1.0 - yd) + c10 * yd;
        let c1 = c01 * (1.0 - yd) + c11 * yd;

        c0 * (1.0 - zd) + c1 * zd
    }

    /// Finite-difference gradient at fractional lattice coordinates:
    /// per-axis corner differences, bilinearly blended across the other
    /// two axes.
    pub fn gradient(&self, x: f32, y: f32, z: f32) -> Vector3<f32> {
        let ix = x.floor() as usize;
        let iy = y.floor() as usize;
        let iz = z.floor() as usize;

        let fx = x - ix as f32;
        let fy = y - iy as f32;
        let fz = z - iz as f32;

        let v000 = self.value(ix, iy, iz);
        let v001 = self.value(ix, iy, iz + 1);
        let v010 = self.value(ix, iy + 1, iz);
        let v011 = self.value(ix, iy + 1, iz + 1);
        let v100 = self.value(ix + 1, iy, iz);
        let v101 = self.value(ix + 1, iy, iz + 1);
        let v110 = self.value(ix + 1, iy + 1, iz);
        let v111 = self.value(ix + 1, iy + 1, iz + 1);

        let dvdx = blerp(v100, v110, v101, v111, fy, fz) - blerp(v000, v010, v001, v011, fy, fz);
        let dvdy = blerp(v010, v110, v011, v111, fx, fz) - blerp(v000, v100, v001, v101, fx, fz);
        let dvdz = blerp(v001, v101, v011, v111, fx, fy) - blerp(v000, v100, v010, v110, fx, fy);

        Vector3::new(dvdx, dvdy, dvdz)
    }
}
