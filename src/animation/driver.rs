//! Scrolls the noise domain over time.

use crate::core::Vec3;

/// Accumulates a 3D sampling offset at a constant velocity.
///
/// The offset is added to every layer's offset on the next density run and
/// handed to the consumer as `_TextureOffset`.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationDriver {
    enabled: bool,
    speed: Vec3,
    offset: Vec3,
}

impl AnimationDriver {
    pub fn new(enabled: bool, speed: Vec3, initial_offset: Vec3) -> Self {
        Self {
            enabled,
            speed,
            offset: initial_offset,
        }
    }

    /// Advance by `dt` seconds. No-op while disabled.
    pub fn tick(&mut self, dt: f32) {
        if self.enabled {
            self.offset += self.speed * dt;
        }
    }

    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: Vec3) {
        self.offset = offset;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn speed(&self) -> Vec3 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: Vec3) {
        self.speed = speed;
    }
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new(false, Vec3::ZERO, Vec3::ZERO)
    }
}
