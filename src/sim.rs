// src/sim.rs

//! The per-tick entry point. One `Simulation` owns the player, the
//! world, and the tuning knobs; an external driver (the render loop)
//! calls [`Simulation::tick`] once per frame with that frame's control
//! input and time step.

use log::info;
use nalgebra::Vector3;

use crate::collision::collide_player_with_world;
use crate::field::{ColorField, DensityField};
use crate::player::{ControlInput, Player};
use crate::world::{World, WorldConfig};

#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    pub world: WorldConfig,
    /// Velocity gained per unit of control input per tick.
    pub player_speed: f32,
    /// Per-tick velocity damping factor.
    pub damping: f32,
    /// Player sphere radius.
    pub player_radius: f32,
    /// Chunks generated per tick.
    pub chunks_per_tick: usize,
    /// Integration/collision sub-steps per tick. More steps bound
    /// tunneling through thin geometry at proportional collision cost.
    pub substeps: usize,
    /// Chunk ring consulted for collision and raycasts.
    pub collision_ring: i32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            player_speed: 0.1,
            damping: 0.9,
            player_radius: 5.0,
            chunks_per_tick: 1,
            substeps: 1,
            collision_ring: 1,
        }
    }
}

/// Owns all mutable simulation state. No globals: everything a tick
/// touches lives here and is reached through `&mut self`.
pub struct Simulation {
    pub player: Player,
    pub world: World,
    config: SimConfig,
}

impl Simulation {
    pub fn new(
        density: Box<dyn DensityField>,
        color: Box<dyn ColorField>,
        config: SimConfig,
    ) -> Self {
        let player = Player::new(Vector3::new(0.0, 10.0, 0.0), config.player_radius);
        let world = World::new(density, color, config.world);
        info!("simulation ready (load radius {})", config.world.load_radius);
        Self {
            player,
            world,
            config,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Advance one frame.
    ///
    /// Ordering is the correctness contract: streaming runs before
    /// collision so geometry loaded this tick is collidable this tick,
    /// and every sub-step integrates before it resolves so the player
    /// never renders from inside a surface.
    pub fn tick(&mut self, input: &ControlInput, dt: f32) {
        self.player.apply_input(input, self.config.player_speed);
        self.player.damp(self.config.damping);

        self.world.ensure_queued(&self.player.position);
        self.world.advance(self.config.chunks_per_tick);

        let substeps = self.config.substeps.max(1);
        let step = dt / substeps as f32;
        for _ in 0..substeps {
            self.player.integrate(step);
            collide_player_with_world(&mut self.player, &self.world, self.config.collision_ring);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::ChunkCoords;

    fn flat_ground(_x: f32, y: f32, _z: f32) -> f32 {
        -y
    }

    fn white(_x: f32, _y: f32, _z: f32) -> Vector3<f32> {
        Vector3::new(1.0, 1.0, 1.0)
    }

    fn small_sim(substeps: usize) -> Simulation {
        let config = SimConfig {
            world: WorldConfig {
                load_radius: 1,
                ..WorldConfig::default()
            },
            chunks_per_tick: 16,
            substeps,
            ..SimConfig::default()
        };
        Simulation::new(Box::new(flat_ground), Box::new(white), config)
    }

    #[test]
    fn streaming_happens_before_collision() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut sim = small_sim(1);
        // Start the player already overlapping where the ground will
        // appear: the very first tick must load geometry and resolve
        // the contact.
        sim.player.position = Vector3::new(8.0, 4.0, 8.0);
        sim.player.velocity = Vector3::new(0.0, -1.0, 0.0);

        sim.tick(&ControlInput::default(), 1.0);

        assert!(sim.world.loaded_len() > 0);
        assert!(
            sim.player.position.y >= sim.player.radius - 1e-4,
            "player at y = {} penetrates the ground",
            sim.player.position.y
        );
    }

    #[test]
    fn player_settles_onto_the_surface() {
        let mut sim = small_sim(1);
        sim.player.position = Vector3::new(8.0, 20.0, 8.0);

        let falling = ControlInput {
            lift: -1.0,
            ..ControlInput::default()
        };
        for _ in 0..300 {
            sim.tick(&falling, 1.0);
        }

        // Ground surface is at y = 0; the player rests one radius up.
        let y = sim.player.position.y;
        assert!((y - sim.player.radius).abs() < 0.5, "rest height {y}");
    }

    #[test]
    fn substeps_conserve_per_tick_displacement() {
        let mut coarse = small_sim(1);
        let mut fine = small_sim(4);
        for sim in [&mut coarse, &mut fine] {
            // Keep clear of terrain so only integration runs.
            sim.player.position = Vector3::new(8.0, 500.0, 8.0);
            sim.player.velocity = Vector3::new(1.0, 0.0, 0.0);
            sim.tick(&ControlInput::default(), 1.0);
        }
        assert!((coarse.player.position.x - fine.player.position.x).abs() < 1e-4);
    }

    #[test]
    fn chunks_load_around_the_player() {
        let mut sim = small_sim(1);
        sim.player.position = Vector3::new(8.0, 100.0, 8.0);
        for _ in 0..9 {
            sim.tick(&ControlInput::default(), 1.0);
        }
        assert_eq!(sim.world.loaded_len(), 9);
        assert!(sim.world.chunk_at(ChunkCoords { x: 0, z: 0 }).is_some());
    }
}
