// Corner handling while returning to the station
//
// The camera reports a wall in view; if it stays in view longer than
// `wall_stuck` the robot is assumed to be wedged in a corner and runs a
// fixed escape: back up, turn toward the open side, drive forward.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::power::WheelPowers;
use crate::config::CornerConfig;
use crate::state::Wall;

/// Tracks how long a wall has been continuously visible
#[derive(Debug, Clone)]
pub struct CornerDetector {
    wall_stuck: Duration,
    near_wall_since: Option<Instant>,
}

impl CornerDetector {
    pub fn new(config: &CornerConfig) -> Self {
        Self {
            wall_stuck: config.wall_stuck,
            near_wall_since: None,
        }
    }

    pub fn is_near_wall(&self) -> bool {
        self.near_wall_since.is_some()
    }

    /// Forget any wall sighting; the next one starts a fresh timer
    pub fn reset(&mut self) {
        self.near_wall_since = None;
    }

    /// Feed this tick's wall observation; true once the wall has been in
    /// view for longer than `wall_stuck`
    pub fn update(&mut self, wall: Option<Wall>, now: Instant) -> bool {
        if wall.is_none() {
            self.near_wall_since = None;
            return false;
        }
        match self.near_wall_since {
            Some(since) => {
                let stuck = now.saturating_duration_since(since) > self.wall_stuck;
                if stuck {
                    info!("Going into a corner");
                }
                stuck
            }
            None => {
                debug!("Wall in view");
                self.near_wall_since = Some(now);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Back,
    Turn(WheelPowers),
    Advance,
}

/// Back up, turn away from the wall, drive forward. Runs to completion.
#[derive(Debug, Clone)]
pub struct CornerEscape {
    config: CornerConfig,
    phase: Phase,
    phase_started: Instant,
}

impl CornerEscape {
    pub fn start(config: &CornerConfig, now: Instant) -> Self {
        info!("Escaping from corner");
        Self {
            config: config.clone(),
            phase: Phase::Back,
            phase_started: now,
        }
    }

    /// Command for this tick, or `None` when the maneuver is over.
    /// `wall` is sampled when the turn begins to pick the open side.
    pub fn step(&mut self, wall: Option<Wall>, now: Instant) -> Option<WheelPowers> {
        let elapsed = now.saturating_duration_since(self.phase_started);
        match self.phase {
            Phase::Back if elapsed >= self.config.back => {
                let turn = self.turn_away(wall);
                debug!("Corner escape: turning {:?}", turn);
                self.enter(Phase::Turn(turn), now);
                Some(turn)
            }
            Phase::Back => Some(WheelPowers::straight(-self.config.back_speed)),
            Phase::Turn(_) if elapsed >= self.config.turn => {
                self.enter(Phase::Advance, now);
                Some(WheelPowers::straight(self.config.advance_speed))
            }
            Phase::Turn(turn) => Some(turn),
            Phase::Advance if elapsed >= self.config.advance => {
                info!("Corner escape done");
                None
            }
            Phase::Advance => Some(WheelPowers::straight(self.config.advance_speed)),
        }
    }

    fn enter(&mut self, phase: Phase, now: Instant) {
        self.phase = phase;
        self.phase_started = now;
    }

    // Wall right of center -> spin left, otherwise spin right
    fn turn_away(&self, wall: Option<Wall>) -> WheelPowers {
        let s = self.config.turn_speed;
        match wall {
            Some(w) if w.x > 0 => WheelPowers::new(-s, s),
            _ => WheelPowers::new(s, -s),
        }
    }
}
