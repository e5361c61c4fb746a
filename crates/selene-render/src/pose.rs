//! Camera pose consumed by the raymarcher each frame.

use glam::Vec3;

/// Viewer pose for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraPose {
    /// World x/y in voxels, z in elevation units.
    pub position: Vec3,
    /// Heading in radians. Zero looks toward -y.
    pub yaw: f32,
    /// Vertical screen offset of the horizon from its default row, in pixels.
    pub pitch: f32,
    /// Bank angle in radians. Clamped to the raymarcher's maximum roll.
    pub roll: f32,
}

impl CameraPose {
    pub fn new(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            yaw,
            ..Default::default()
        }
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_roll(mut self, roll: f32) -> Self {
        self.roll = roll;
        self
    }

    /// Unit ground-plane direction the camera faces.
    pub fn forward(&self) -> glam::Vec2 {
        let (sin, cos) = self.yaw.sin_cos();
        glam::Vec2::new(sin, -cos)
    }
}
