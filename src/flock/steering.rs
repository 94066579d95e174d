//! Force-clamped velocity correction shared by every steering behaviour.

use glam::Vec3;

/// Steering force that turns `velocity` towards `direction` at `max_speed`
///
/// A zero `direction` leaves `velocity` unchanged. When the requested velocity
/// already equals the current one, `direction` itself is returned.
pub fn steer_towards(velocity: Vec3, direction: Vec3, max_steer_force: f32, max_speed: f32) -> Vec3 {
    if direction.length_squared() == 0.0 {
        return velocity;
    }
    let desired = direction.normalize_or_zero() * max_speed - velocity;
    if desired.length_squared() == 0.0 {
        return direction;
    }
    desired.clamp_length_max(max_steer_force)
}
