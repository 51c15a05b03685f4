// src/field.rs

//! Density and colour field contracts plus the bundled implementations.
//!
//! Both traits are single-method capability interfaces: a field is a pure
//! function of world position, deterministic across calls. The mesher and
//! streamer only ever see the traits, so alternative terrain shapes drop
//! in without touching the core.

use colorgrad::{CustomGradient, Gradient};
use nalgebra::Vector3;
use noise::{NoiseFn, Perlin};

/// A scalar density sampled at world positions. Values at or above the
/// iso-level are solid, values below are air.
pub trait DensityField {
    fn density(&self, x: f32, y: f32, z: f32) -> f32;
}

impl<F> DensityField for F
where
    F: Fn(f32, f32, f32) -> f32,
{
    fn density(&self, x: f32, y: f32, z: f32) -> f32 {
        self(x, y, z)
    }
}

/// An RGB colour (components in `[0, 1]`) sampled at world positions,
/// evaluated once per triangle centroid.
pub trait ColorField {
    fn color(&self, x: f32, y: f32, z: f32) -> Vector3<f32>;
}

impl<F> ColorField for F
where
    F: Fn(f32, f32, f32) -> Vector3<f32>,
{
    fn color(&self, x: f32, y: f32, z: f32) -> Vector3<f32> {
        self(x, y, z)
    }
}

/// Fractal Perlin terrain density: several octaves of 3D noise, biased
/// downward with altitude so the field transitions from solid ground to
/// open air around y = 0.
pub struct TerrainField {
    noise: Perlin,
    base_frequency: f64,
    octaves: usize,
    persistence: f64,
    lacunarity: f64,
    height_falloff: f32,
}

impl TerrainField {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: Perlin::new(seed),
            base_frequency: 0.01,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            height_falloff: 0.01,
        }
    }

    fn sample_noise(&self, x: f64, y: f64, z: f64) -> f32 {
        let mut amplitude = 1.0;
        let mut frequency = self.base_frequency;
        let mut noise_value = 0.0;
        let mut max_value = 0.0;

        for _ in 0..self.octaves {
            let sample = self
                .noise
                .get([x * frequency, y * frequency, z * frequency]);
            noise_value += sample * amplitude;

            max_value += amplitude;
            amplitude *= self.persistence;
            frequency *= self.lacunarity;
        }

        (noise_value / max_value) as f32
    }
}

impl DensityField for TerrainField {
    fn density(&self, x: f32, y: f32, z: f32) -> f32 {
        self.sample_noise(x as f64, y as f64, z as f64) - y * self.height_falloff
    }
}

/// Altitude-banded terrain colours from a fixed gradient: rock below,
/// grass around the midline, snow up high.
pub struct HeightBands {
    gradient: Gradient,
    min_y: f32,
    max_y: f32,
}

impl HeightBands {
    pub fn new(min_y: f32, max_y: f32) -> Self {
        let gradient = CustomGradient::new()
            .colors(&[
                colorgrad::Color::new(0.2, 0.2, 0.25, 1.0),
                colorgrad::Color::new(0.4, 0.3, 0.2, 1.0),
                colorgrad::Color::new(0.1, 0.55, 0.15, 1.0),
                colorgrad::Color::new(0.5, 0.5, 0.5, 1.0),
                colorgrad::Color::new(1.0, 1.0, 1.0, 1.0),
            ])
            .domain(&[0.0, 0.35, 0.5, 0.8, 1.0])
            .build()
            .unwrap();
        Self {
            gradient,
            min_y,
            max_y,
        }
    }
}

impl Default for HeightBands {
    fn default() -> Self {
        Self::new(-32.0, 32.0)
    }
}

impl ColorField for HeightBands {
    fn color(&self, _x: f32, y: f32, _z: f32) -> Vector3<f32> {
        let t = ((y - self.min_y) / (self.max_y - self.min_y)).clamp(0.0, 1.0);
        let c = self.gradient.at(t as f64);
        Vector3::new(c.r as f32, c.g as f32, c.b as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn terrain_field_is_deterministic() {
        let field = TerrainField::new(42);
        let a = field.density(12.5, -3.0, 7.25);
        let b = field.density(12.5, -3.0, 7.25);
        assert_eq!(a, b);
    }

    #[test]
    fn terrain_density_falls_with_altitude() {
        let field = TerrainField::new(42);
        // Far below any noise contribution the field is solid, far above
        // it is air.
        assert!(field.density(0.0, -200.0, 0.0) > 0.0);
        assert!(field.density(0.0, 200.0, 0.0) < 0.0);
    }

    #[test]
    fn height_bands_clamp_outside_range() {
        let bands = HeightBands::new(-32.0, 32.0);
        let below = bands.color(0.0, -100.0, 0.0);
        let floor = bands.color(0.0, -32.0, 0.0);
        assert_relative_eq!(below.x, floor.x);
        assert_relative_eq!(below.y, floor.y);
        assert_relative_eq!(below.z, floor.z);
        let snow = bands.color(0.0, 100.0, 0.0);
        assert!(snow.x > 0.9 && snow.y > 0.9 && snow.z > 0.9);
    }

    #[test]
    fn closures_are_fields() {
        let field = |x: f32, _y: f32, _z: f32| x * 2.0;
        assert_eq!(field.density(3.0, 0.0, 0.0), 6.0);
    }
}
