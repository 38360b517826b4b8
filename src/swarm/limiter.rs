//! Boundary containment and speed limiting. Pure per-agent functions.

use glam::Vec3;

/// Restoring delta for an agent outside the container sphere, growing
/// linearly with penetration depth. Zero inside.
#[inline]
pub fn boundary_delta(position: Vec3, boundary_radius: f32) -> Vec3 {
    let mag = position.length();
    if mag > boundary_radius {
        -position * (mag - boundary_radius)
    } else {
        Vec3::ZERO
    }
}

/// Delta that clamps `velocity` to at most `max_speed`, keeping direction.
#[inline]
pub fn speed_limit_delta(velocity: Vec3, max_speed: f32) -> Vec3 {
    velocity.clamp_length_max(max_speed) - velocity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inside_container_no_push() {
        assert_eq!(boundary_delta(Vec3::new(3.0, 4.0, 0.0), 5.0), Vec3::ZERO);
        assert_eq!(boundary_delta(Vec3::ZERO, 5.0), Vec3::ZERO);
    }

    #[test]
    fn outside_container_pulls_inward() {
        let p = Vec3::new(6.0, 8.0, 0.0); // |p| = 10
        let d = boundary_delta(p, 5.0);
        assert_eq!(d, -p * 5.0);
        assert!(d.dot(p) < 0.0);
    }

    #[test]
    fn push_grows_with_depth() {
        let shallow = boundary_delta(Vec3::new(0.0, 0.0, 11.0), 10.0).length();
        let deep = boundary_delta(Vec3::new(0.0, 0.0, 14.0), 10.0).length();
        assert!(deep > shallow);
    }

    #[test]
    fn slow_velocity_untouched() {
        assert_eq!(speed_limit_delta(Vec3::new(1.0, 1.0, 1.0), 10.0), Vec3::ZERO);
        assert_eq!(speed_limit_delta(Vec3::ZERO, 10.0), Vec3::ZERO);
    }

    #[test]
    fn fast_velocity_clamped_along_direction() {
        let v = Vec3::new(30.0, 0.0, 40.0); // |v| = 50
        let clamped = v + speed_limit_delta(v, 5.0);
        assert!((clamped.length() - 5.0).abs() < 1e-5);
        assert!(clamped.normalize().abs_diff_eq(v.normalize(), 1e-6));
    }
}
