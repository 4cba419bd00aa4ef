// Pressed-against-obstacle detection
//
// If the previous tick asked for a sharp turn but the heading barely moved,
// a wheel is probably pushing into something. After `error_count_limit`
// such ticks in a row the robot backs straight up for `back_duration`.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::power::WheelPowers;
use crate::config::StuckConfig;

#[derive(Debug, Clone)]
pub struct StuckDetector {
    error_count_limit: u32,
    angle_delta_threshold: f32,
    turn_intent: f32,
    back_duration: Duration,
    back_speed: f32,

    mismatch_count: u32,
    prev_command: WheelPowers,
    prev_body_angle: Option<f32>,
    backing_since: Option<Instant>,
}

impl StuckDetector {
    pub fn new(config: &StuckConfig) -> Self {
        Self {
            error_count_limit: config.error_count_limit,
            angle_delta_threshold: config.angle_delta_threshold,
            turn_intent: config.turn_intent,
            back_duration: config.back_duration,
            back_speed: config.back_speed,
            mismatch_count: 0,
            prev_command: WheelPowers::STOP,
            prev_body_angle: None,
            backing_since: None,
        }
    }

    pub fn mismatch_count(&self) -> u32 {
        self.mismatch_count
    }

    pub fn is_backing(&self) -> bool {
        self.backing_since.is_some()
    }

    /// Filter this tick's proposed command. `body_angle` is in degrees.
    pub fn run(&mut self, proposed: WheelPowers, body_angle: f32, now: Instant) -> WheelPowers {
        let out = self.evaluate(proposed, body_angle, now);
        self.prev_command = out;
        self.prev_body_angle = Some(body_angle);
        out
    }

    fn evaluate(&mut self, proposed: WheelPowers, body_angle: f32, now: Instant) -> WheelPowers {
        let back = WheelPowers::straight(-self.back_speed);

        if let Some(since) = self.backing_since {
            if now.saturating_duration_since(since) < self.back_duration {
                return back;
            }
            debug!("Stuck backup finished");
            self.backing_since = None;
            self.mismatch_count = 0;
            return proposed;
        }

        let tried_to_turn = self.prev_command.differential() > self.turn_intent;
        let barely_moved = self
            .prev_body_angle
            .is_some_and(|prev| (body_angle - prev).abs() < self.angle_delta_threshold);

        if tried_to_turn && barely_moved {
            self.mismatch_count += 1;
            debug!("Turn/heading mismatch count {}", self.mismatch_count);
        } else {
            self.mismatch_count = 0;
        }

        if self.mismatch_count >= self.error_count_limit {
            info!("Pressed against obstacle, backing up");
            self.backing_since = Some(now);
            return back;
        }

        proposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    #[test]
    fn test_turning_robot_passes_through() {
        let t0 = Instant::now();
        let mut det = StuckDetector::new(&StuckConfig::default());
        let turn = WheelPowers::new(100.0, -100.0);

        let mut angle = 0.0;
        for i in 0..30 {
            angle += 5.0;
            let out = det.run(turn, angle, t0 + TICK * i);
            assert_eq!(out, turn);
        }
        assert_eq!(det.mismatch_count(), 0);
    }

    #[test]
    fn test_backup_after_limit_then_release() {
        let cfg = StuckConfig::default();
        let t0 = Instant::now();
        let mut det = StuckDetector::new(&cfg);
        let turn = WheelPowers::new(80.0, 10.0);
        let back = WheelPowers::straight(-cfg.back_speed);

        // First tick seeds the history, the next nine count up
        for i in 0..cfg.error_count_limit {
            assert_eq!(det.run(turn, 12.0, t0 + TICK * i), turn);
        }
        assert_eq!(det.mismatch_count(), cfg.error_count_limit - 1);

        let start = t0 + TICK * cfg.error_count_limit;
        assert_eq!(det.run(turn, 12.5, start), back);
        assert!(det.is_backing());

        // Backup holds for exactly back_duration regardless of input
        for i in 1..20 {
            assert_eq!(det.run(turn, 12.5, start + TICK * i), back);
        }
        assert_eq!(det.run(turn, 12.5, start + cfg.back_duration), turn);
        assert!(!det.is_backing());
        assert_eq!(det.mismatch_count(), 0);
    }

    #[test]
    fn test_gentle_command_resets_count() {
        let t0 = Instant::now();
        let mut det = StuckDetector::new(&StuckConfig::default());
        let turn = WheelPowers::new(90.0, 0.0);

        for i in 0..6 {
            det.run(turn, 0.0, t0 + TICK * i);
        }
        assert_eq!(det.mismatch_count(), 5);

        det.run(WheelPowers::straight(45.0), 0.0, t0 + TICK * 6);
        // The sharp turn is still the previous command on this tick
        assert_eq!(det.mismatch_count(), 6);
        det.run(turn, 0.0, t0 + TICK * 7);
        assert_eq!(det.mismatch_count(), 0);
    }
}
