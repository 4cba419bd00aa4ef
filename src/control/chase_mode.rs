// Pursuit sub-mode while chasing with no ball in view
//
// Normal steers by the body-angle heuristic; after `max_normal` the robot
// switches to Swing (rotate in place to search) for `max_swing`, then back.
// The timers are evaluated lazily on `now()`, which must be called every
// tick for the switch to happen.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::ChaseModeConfig;
use crate::messages::ChaseMode;

#[derive(Debug, Clone)]
pub struct ChaseSubMode {
    mode: ChaseMode,
    entered_at: Instant,
    max_normal: Duration,
    max_swing: Duration,
}

impl ChaseSubMode {
    pub fn new(config: &ChaseModeConfig, now: Instant) -> Self {
        Self {
            mode: ChaseMode::Normal,
            entered_at: now,
            max_normal: config.max_normal,
            max_swing: config.max_swing,
        }
    }

    /// Advance the timers and return the current mode
    pub fn now(&mut self, now: Instant) -> ChaseMode {
        let limit = match self.mode {
            ChaseMode::Normal => self.max_normal,
            ChaseMode::Swing => self.max_swing,
        };
        if now.saturating_duration_since(self.entered_at) >= limit {
            let next = match self.mode {
                ChaseMode::Normal => ChaseMode::Swing,
                ChaseMode::Swing => ChaseMode::Normal,
            };
            debug!("Chase mode {:?} -> {:?}", self.mode, next);
            self.mode = next;
            self.entered_at = now;
        }
        self.mode
    }

    /// Force a mode and restart its timer
    pub fn set_mode(&mut self, mode: ChaseMode, now: Instant) {
        self.mode = mode;
        self.entered_at = now;
    }

    /// Last evaluated mode, without advancing timers
    pub fn current(&self) -> ChaseMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_normal_to_swing_and_back() {
        let t0 = Instant::now();
        let mut mode = ChaseSubMode::new(&ChaseModeConfig::default(), t0);

        assert_eq!(mode.now(t0 + secs(9.9)), ChaseMode::Normal);
        assert_eq!(mode.now(t0 + secs(10.0)), ChaseMode::Swing);
        assert_eq!(mode.now(t0 + secs(15.9)), ChaseMode::Swing);
        assert_eq!(mode.now(t0 + secs(16.0)), ChaseMode::Normal);
    }

    #[test]
    fn test_switch_waits_for_a_call() {
        let t0 = Instant::now();
        let mut mode = ChaseSubMode::new(&ChaseModeConfig::default(), t0);

        // Nothing read for 30s: only one transition happens, timed from the read
        let t1 = t0 + secs(30.0);
        assert_eq!(mode.now(t1), ChaseMode::Swing);
        assert_eq!(mode.now(t1 + secs(5.0)), ChaseMode::Swing);
        assert_eq!(mode.now(t1 + secs(6.0)), ChaseMode::Normal);
    }

    #[test]
    fn test_set_mode_resets_timer() {
        let t0 = Instant::now();
        let mut mode = ChaseSubMode::new(&ChaseModeConfig::default(), t0);

        mode.set_mode(ChaseMode::Normal, t0 + secs(8.0));
        assert_eq!(mode.now(t0 + secs(12.0)), ChaseMode::Normal);
        assert_eq!(mode.now(t0 + secs(18.0)), ChaseMode::Swing);
        assert_eq!(mode.current(), ChaseMode::Swing);
    }
}
