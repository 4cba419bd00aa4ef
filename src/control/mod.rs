// Motor control for the ball robot
//
// Provides:
// - Proportional heading law and command saturation
// - Chase sub-mode timer (pursue / search rotation)
// - Post-processors for stuck and swing detection
// - Corner escape and restart maneuvers
// - The mission state machine tying them together

pub mod chase_mode;
pub mod clamp;
pub mod corner;
mod mission;
pub mod power;
pub mod restart;
pub mod stuck;
pub mod swing;

pub use clamp::{MotorCommand, clamp_and_compensate};
pub use mission::MissionController;
pub use power::{WheelPowers, chase_by_angle};
