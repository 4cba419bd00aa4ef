// Oscillation ("swing") detection
//
// Both wheels flipping direction at once, repeatedly and in quick
// succession, means the controller is hunting left/right around a target.
// Once flagged, a slow straight command is forced for `escape_duration`.

use std::time::{Duration, Instant};

use tracing::debug;

use super::power::WheelPowers;
use crate::config::SwingConfig;

#[derive(Debug, Clone)]
pub struct SwingDetector {
    count_threshold: u32,
    detect_interval: Duration,
    escape_duration: Duration,
    escape: WheelPowers,

    prev_command: WheelPowers,
    last_reversal: Option<Instant>,
    reversal_count: u32,
    escaping_since: Option<Instant>,
}

impl SwingDetector {
    pub fn new(config: &SwingConfig) -> Self {
        Self {
            count_threshold: config.count_threshold,
            detect_interval: config.detect_interval,
            escape_duration: config.escape_duration,
            escape: config.escape_speed.into(),
            prev_command: WheelPowers::STOP,
            last_reversal: None,
            reversal_count: 0,
            escaping_since: None,
        }
    }

    pub fn is_escaping(&self) -> bool {
        self.escaping_since.is_some()
    }

    pub fn run(&mut self, proposed: WheelPowers, now: Instant) -> WheelPowers {
        if let Some(since) = self.escaping_since {
            if now.saturating_duration_since(since) < self.escape_duration {
                return self.escape;
            }
            debug!("Swing escape end");
            self.escaping_since = None;
        }

        self.count_reversal(proposed, now);
        self.prev_command = proposed;

        if self.reversal_count > self.count_threshold {
            debug!("Swing detected after {} reversals", self.reversal_count);
            self.reversal_count = 0;
            self.last_reversal = None;
            self.escaping_since = Some(now);
            return self.escape;
        }
        proposed
    }

    fn count_reversal(&mut self, cmd: WheelPowers, now: Instant) {
        let prev = self.prev_command;
        let reversed = cmd.left * prev.left < 0.0
            && cmd.right * prev.right < 0.0
            && cmd.left != cmd.right;
        if !reversed {
            return;
        }

        let within_window = self
            .last_reversal
            .is_some_and(|t| now.saturating_duration_since(t) <= self.detect_interval);
        self.reversal_count = if within_window {
            self.reversal_count + 1
        } else {
            1
        };
        self.last_reversal = Some(now);
        debug!("Direction reversals {}", self.reversal_count);
    }
}
