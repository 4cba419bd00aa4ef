// Saturation with differential compensation
//
// When one wheel saturates, the amount cut from it is added to the other
// wheel so the turning intent survives. Left is checked first: if both
// wheels saturate, only left's excess is carried over and right's is lost.
// The compensated wheel is not re-clamped; `MotorCommand` saturates at the
// device boundary.

use serde::{Deserialize, Serialize};

use super::power::WheelPowers;
use crate::messages::WheelActuation;

pub const MAX_POWER: f32 = 100.0;

/// Signed amount removed when clamping `v` to [-100, 100]
fn excess(v: f32) -> f32 {
    if v.abs() > MAX_POWER {
        v.signum() * MAX_POWER - v
    } else {
        0.0
    }
}

fn clamp(v: f32) -> f32 {
    v.clamp(-MAX_POWER, MAX_POWER)
}

pub fn clamp_and_compensate(raw: WheelPowers) -> WheelPowers {
    let left_excess = excess(raw.left);
    let right_excess = excess(raw.right);
    let left = clamp(raw.left);
    let right = clamp(raw.right);

    if left_excess != 0.0 {
        WheelPowers::new(left, right + left_excess)
    } else if right_excess != 0.0 {
        WheelPowers::new(left + right_excess, right)
    } else {
        WheelPowers::new(left, right)
    }
}

/// Integer wheel command as handed to the drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MotorCommand {
    pub left: i32,
    pub right: i32,
}

impl MotorCommand {
    pub const STOP: Self = Self { left: 0, right: 0 };

    pub const fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }
}

impl From<WheelPowers> for MotorCommand {
    /// Rounds and saturates; the wheel driver only accepts [-100, 100]
    fn from(p: WheelPowers) -> Self {
        let to_device = |v: f32| clamp(v).round() as i32;
        Self {
            left: to_device(p.left),
            right: to_device(p.right),
        }
    }
}

impl From<MotorCommand> for WheelActuation {
    fn from(cmd: MotorCommand) -> Self {
        Self {
            left: cmd.left,
            right: cmd.right,
        }
    }
}
