// src/player.rs

//! The moving observer: a sphere with position, velocity, and look
//! angles. Input devices stay outside; callers hand in per-tick axis
//! values and angle deltas already decoded from whatever raw input they
//! read.

use nalgebra::Vector3;

/// Per-tick control state, each axis in `[-1, 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ControlInput {
    /// Forward (+) / backward (-) along the current yaw heading.
    pub forward: f32,
    /// Right (+) / left (-) strafe.
    pub strafe: f32,
    /// Up (+) / down (-).
    pub lift: f32,
    pub yaw_delta: f32,
    pub pitch_delta: f32,
}

/// A spherical agent. Collision resolution and control input both
/// mutate its state once per tick.
#[derive(Clone, Debug)]
pub struct Player {
    pub position: Vector3<f32>,
    pub velocity: Vector3<f32>,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Player {
    pub fn new(position: Vector3<f32>, radius: f32) -> Self {
        Self {
            position,
            velocity: Vector3::zeros(),
            radius,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Turn and accelerate from one tick's control input. Forward is
    /// -Z at zero yaw; strafe follows the yaw heading.
    pub fn apply_input(&mut self, input: &ControlInput, speed: f32) {
        self.yaw += input.yaw_delta;
        self.pitch += input.pitch_delta;

        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        self.velocity.x += (sin_yaw * input.forward + cos_yaw * input.strafe) * speed;
        self.velocity.z += (-cos_yaw * input.forward + sin_yaw * input.strafe) * speed;
        self.velocity.y += input.lift * speed;
    }

    /// Exponential velocity damping, applied once per tick.
    pub fn damp(&mut self, factor: f32) {
        self.velocity *= factor;
    }

    /// Advance the position by one (sub-)step's worth of velocity.
    pub fn integrate(&mut self, step: f32) {
        self.position += self.velocity * step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn forward_at_zero_yaw_is_negative_z() {
        let mut player = Player::new(Vector3::zeros(), 1.0);
        player.apply_input(
            &ControlInput {
                forward: 1.0,
                ..ControlInput::default()
            },
            0.1,
        );
        assert_relative_eq!(player.velocity.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(player.velocity.z, -0.1, epsilon = 1e-6);
    }

    #[test]
    fn strafe_follows_yaw() {
        let mut player = Player::new(Vector3::zeros(), 1.0);
        player.yaw = std::f32::consts::FRAC_PI_2;
        player.apply_input(
            &ControlInput {
                strafe: 1.0,
                ..ControlInput::default()
            },
            0.1,
        );
        // At yaw 90° the strafe axis has rotated onto +Z.
        assert_relative_eq!(player.velocity.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(player.velocity.z, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn damping_and_integration() {
        let mut player = Player::new(Vector3::zeros(), 1.0);
        player.velocity = Vector3::new(1.0, 0.0, 0.0);
        player.damp(0.9);
        assert_relative_eq!(player.velocity.x, 0.9, epsilon = 1e-6);
        player.integrate(0.5);
        assert_relative_eq!(player.position.x, 0.45, epsilon = 1e-6);
    }
}
