//! Conversion between the game's world frame and the engine frame
//!
//! The two frames share the X axis; Y and Z point the opposite way. Both
//! conversions negate Y and Z, so each is its own inverse, but callers use
//! the name that matches the direction of travel so the intent stays visible.

use glam::Vec3;

/// A position that can be moved between the world and engine frames
pub trait FramePoint: Copy {
    /// Negates the Y and Z components in place
    fn flip_yz(&mut self);
}

impl FramePoint for Vec3 {
    fn flip_yz(&mut self) {
        self.y = -self.y;
        self.z = -self.z;
    }
}

impl FramePoint for [f32; 3] {
    fn flip_yz(&mut self) {
        self[1] = -self[1];
        self[2] = -self[2];
    }
}

/// Converts a world-frame position to the engine frame
pub fn to_engine_frame<P: FramePoint>(pos: P) -> P {
    let mut out = pos;
    out.flip_yz();
    out
}

/// Converts an engine-frame position to the world frame
pub fn to_world_frame<P: FramePoint>(pos: P) -> P {
    let mut out = pos;
    out.flip_yz();
    out
}

/// Converts a world-frame position to the engine frame in place
pub fn to_engine_frame_mut<P: FramePoint>(pos: &mut P) {
    pos.flip_yz();
}

/// Converts an engine-frame position to the world frame in place
pub fn to_world_frame_mut<P: FramePoint>(pos: &mut P) {
    pos.flip_yz();
}

/// Engine-frame array for a world-frame position
pub(crate) fn engine_point(pos: Vec3) -> [f32; 3] {
    to_engine_frame(pos).to_array()
}

/// World-frame position for an engine-frame array
pub(crate) fn world_point(point: &[f32; 3]) -> Vec3 {
    to_world_frame(Vec3::from_array(*point))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_frame_negates_y_and_z() {
        let p = Vec3::new(-224.0, 60.0, -316.0);
        assert_eq!(to_engine_frame(p), Vec3::new(-224.0, -60.0, 316.0));
        assert_eq!(to_engine_frame([1.5, -2.0, 3.0]), [1.5, 2.0, -3.0]);
    }

    #[test]
    fn test_round_trip_is_identity() {
        let samples = [
            Vec3::ZERO,
            Vec3::new(153.0, 4.0, -98.0),
            Vec3::new(-0.25, 1e6, -1e-6),
            Vec3::new(f32::MAX, f32::MIN, 7.0),
        ];
        for p in samples {
            assert_eq!(to_world_frame(to_engine_frame(p)), p);
            assert_eq!(to_engine_frame(to_world_frame(p)), p);
        }
    }

    #[test]
    fn test_array_and_vector_forms_agree() {
        let p = Vec3::new(12.0, -7.5, 0.5);
        assert_eq!(to_engine_frame(p).to_array(), to_engine_frame(p.to_array()));
        assert_eq!(engine_point(p), to_engine_frame(p.to_array()));
        assert_eq!(world_point(&engine_point(p)), p);
    }

    #[test]
    fn test_in_place_conversion() {
        let mut v = Vec3::new(1.0, 2.0, 3.0);
        to_engine_frame_mut(&mut v);
        assert_eq!(v, Vec3::new(1.0, -2.0, -3.0));
        to_world_frame_mut(&mut v);
        assert_eq!(v, Vec3::new(1.0, 2.0, 3.0));

        let mut a = [4.0f32, 5.0, 6.0];
        to_engine_frame_mut(&mut a);
        assert_eq!(a, [4.0, -5.0, -6.0]);
    }
}
