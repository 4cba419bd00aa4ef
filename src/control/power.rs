// Heading control law for the two-wheel differential base
//
// A single proportional law is reused with different (base speed, gain)
// pairs for ball pursuit, guidance following, and the restart turn.

use crate::config::Gain;

/// Raw wheel powers before saturation. Nominally percent, but may leave
/// [-100, 100] until `clamp_and_compensate` runs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelPowers {
    pub left: f32,
    pub right: f32,
}

impl WheelPowers {
    pub const STOP: Self = Self::new(0.0, 0.0);

    pub const fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    /// Same power on both wheels
    pub const fn straight(power: f32) -> Self {
        Self::new(power, power)
    }

    /// Commanded turning intensity
    pub fn differential(&self) -> f32 {
        (self.left - self.right).abs()
    }
}

impl From<(f32, f32)> for WheelPowers {
    fn from((left, right): (f32, f32)) -> Self {
        Self::new(left, right)
    }
}

/// P controller toward zero heading error with forward bias `base_speed`.
///
/// Positive `angle` (target to the right) speeds up the left wheel.
pub fn chase_by_angle(angle: f32, base_speed: f32, k: f32) -> WheelPowers {
    WheelPowers {
        left: base_speed + k * angle,
        right: base_speed - k * angle,
    }
}

/// `chase_by_angle` with a configured gain pair
pub fn chase(angle: f32, gain: Gain) -> WheelPowers {
    chase_by_angle(angle, gain.base_speed, gain.k)
}

/// Turn in place toward heading zero; the wheels run opposite and slow down
/// as the remaining angle shrinks.
pub fn turn_in_place(angle: f32, gain: Gain) -> WheelPowers {
    let left = gain.base_speed + gain.k * angle;
    WheelPowers { left, right: -left }
}

/// Body-angle heading that points into the rear hemisphere, where the
/// station is when the robot started facing away from it. Zero stays zero.
pub fn rear_hemisphere_heading(body_angle_decidegrees: i32) -> f32 {
    body_angle_decidegrees as f32 / 10.0 - body_angle_decidegrees.signum() as f32 * 180.0
}
