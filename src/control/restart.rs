// Restart sequence after a delivery
//
// The controller raises `preparing_restart` and idles until someone clears
// it, then backs away from the station and turns in place until the body
// heading is back near zero. One step per control tick.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::power::{WheelPowers, turn_in_place};
use crate::config::{Gain, MissionConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    AwaitHandshake,
    Back { since: Instant },
    Turn,
}

#[derive(Debug, Clone)]
pub struct RestartSequence {
    phase: Phase,
    back_speed: f32,
    back: Duration,
    tolerance: f32,
    turn_gain: Gain,
}

impl RestartSequence {
    pub fn new(config: &MissionConfig, turn_gain: Gain) -> Self {
        Self {
            phase: Phase::AwaitHandshake,
            back_speed: config.restart_back_speed,
            back: config.restart_back,
            tolerance: config.restart_heading_tolerance,
            turn_gain,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.phase == Phase::AwaitHandshake
    }

    /// `preparing_restart` is the handshake flag, `body_angle` in degrees.
    /// Returns `None` once the robot faces forward again.
    pub fn step(&mut self, preparing_restart: bool, body_angle: f32, now: Instant) -> Option<WheelPowers> {
        if self.phase == Phase::AwaitHandshake {
            if preparing_restart {
                return Some(WheelPowers::STOP);
            }
            info!("Restart released, backing off");
            self.phase = Phase::Back { since: now };
        }

        if let Phase::Back { since } = self.phase {
            if now.saturating_duration_since(since) < self.back {
                return Some(WheelPowers::straight(-self.back_speed));
            }
            debug!("Restart turn from {:.1} deg", body_angle);
            self.phase = Phase::Turn;
        }

        if body_angle.abs() < self.tolerance {
            info!("Restart turn complete at {:.1} deg", body_angle);
            return None;
        }
        Some(turn_in_place(body_angle, self.turn_gain))
    }
}
