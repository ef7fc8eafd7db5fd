//! Math types for Skylark.

pub use glam::Vec3;

/// Position plus orientation expressed as a forward/up vector pair, matching
/// the engine's double-6 orientation property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Pose {
    pub fn new(position: Vec3, forward: Vec3, up: Vec3) -> Self {
        Self {
            position,
            forward: forward.normalize_or_zero(),
            up: up.normalize_or_zero(),
        }
    }

    /// Listener at the origin facing +Y with +Z up.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Y,
            up: Vec3::Z,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Direction of a point relative to a listener, as the panner consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativeDirection {
    /// Azimuth in degrees, [0, 360): 0 straight ahead, 90 to the right.
    pub azimuth: f64,
    /// Elevation in degrees, [-90, 90].
    pub elevation: f64,
    pub distance: f64,
}

/// Projects `point` into the listener's basis and derives panning angles.
///
/// A point directly on the listener position comes back as azimuth 0,
/// elevation 0, distance 0.
pub fn relative_direction(listener: &Pose, point: Vec3) -> RelativeDirection {
    let rel = point - listener.position;
    let distance = rel.length() as f64;
    if distance < 1e-9 {
        return RelativeDirection {
            azimuth: 0.0,
            elevation: 0.0,
            distance: 0.0,
        };
    }

    let x = rel.dot(listener.right()) as f64;
    let y = rel.dot(listener.forward) as f64;
    let z = rel.dot(listener.up) as f64;

    let mut azimuth = x.atan2(y).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }
    let elevation = (z / distance).clamp(-1.0, 1.0).asin().to_degrees();

    RelativeDirection {
        azimuth,
        elevation,
        distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_pose_basis() {
        let pose = Pose::identity();
        assert!((pose.right() - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn direction_to_the_right() {
        let dir = relative_direction(&Pose::identity(), Vec3::new(10.0, 0.0, 0.0));
        assert!((dir.azimuth - 90.0).abs() < 1e-4);
        assert!(dir.elevation.abs() < 1e-4);
        assert!((dir.distance - 10.0).abs() < 1e-4);
    }

    #[test]
    fn direction_behind_wraps_positive() {
        let dir = relative_direction(&Pose::identity(), Vec3::new(0.0, -5.0, 0.0));
        assert!((dir.azimuth - 180.0).abs() < 1e-4);
    }

    #[test]
    fn direction_above() {
        let dir = relative_direction(&Pose::identity(), Vec3::new(0.0, 0.0, 3.0));
        assert!((dir.elevation - 90.0).abs() < 1e-4);
    }
}
