//! Integrator
//!
//! Runs the full per-agent composition (neighbor rules, boundary, speed
//! limit) and produces the agent's next kinematics. Callers write the
//! result into the write buffer slot for the same index.

use glam::Vec3;

use super::influence::Evaluator;
use super::limiter::{boundary_delta, speed_limit_delta};

/// Bounds applied after the neighbor rules.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
    pub boundary_radius: f32,
    pub max_speed: f32,
}

/// Explicit Euler step: `position' = position + velocity' * dt`.
#[inline]
pub fn integrate(position: Vec3, velocity: Vec3, dt: f32) -> Vec3 {
    position + velocity * dt
}

/// Next `(position, velocity)` for agent `i`, reading only the current buffer.
#[inline]
pub fn advance_agent(eval: &Evaluator<'_>, limits: &Limits, i: usize, dt: f32) -> (Vec3, Vec3) {
    let position = eval.current.positions[i];

    let mut velocity = eval.evaluate(i).velocity;
    velocity += boundary_delta(position, limits.boundary_radius);
    velocity += speed_limit_delta(velocity, limits.max_speed);

    (integrate(position, velocity, dt), velocity)
}
