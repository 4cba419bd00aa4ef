// Mock drivers for tests
//
// Each mock is a cheap handle onto shared state, so a test can keep one
// clone for inspection while the controller owns the other.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use super::{Gripper, Hardware, HardwareError, RangeSensor, WheelMotor};
use crate::messages::GripperCommand;

/// Wheel motor that records every power it is given
#[derive(Debug, Clone, Default)]
pub struct MockWheel {
    name: &'static str,
    history: Arc<Mutex<Vec<i32>>>,
    fail: Arc<AtomicBool>,
}

impl MockWheel {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn history(&self) -> Vec<i32> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<i32> {
        self.history.lock().ok().and_then(|h| h.last().copied())
    }

    /// Make subsequent `drive` calls fail
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl WheelMotor for MockWheel {
    fn drive(&mut self, power: i32) -> Result<(), HardwareError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(HardwareError::Unavailable {
                device: self.name,
                reason: "injected failure".to_string(),
            });
        }
        if !(-100..=100).contains(&power) {
            return Err(HardwareError::OutOfRange {
                device: self.name,
                power,
            });
        }
        trace!("{} wheel <- {}", self.name, power);
        self.history
            .lock()
            .map_err(|_| HardwareError::Poisoned)?
            .push(power);
        Ok(())
    }
}

/// Gripper servo that records its commands. Starts lifted.
#[derive(Debug, Clone)]
pub struct MockGripper {
    lifted: Arc<AtomicBool>,
    history: Arc<Mutex<Vec<GripperCommand>>>,
}

impl Default for MockGripper {
    fn default() -> Self {
        Self {
            lifted: Arc::new(AtomicBool::new(true)),
            history: Arc::default(),
        }
    }
}

impl MockGripper {
    pub fn history(&self) -> Vec<GripperCommand> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    fn record(&self, cmd: GripperCommand) -> Result<(), HardwareError> {
        self.lifted
            .store(cmd == GripperCommand::Up, Ordering::Relaxed);
        self.history
            .lock()
            .map_err(|_| HardwareError::Poisoned)?
            .push(cmd);
        Ok(())
    }
}

impl Gripper for MockGripper {
    fn up(&mut self) -> Result<(), HardwareError> {
        self.record(GripperCommand::Up)
    }

    fn down(&mut self) -> Result<(), HardwareError> {
        self.record(GripperCommand::Down)
    }

    fn is_lifted(&self) -> bool {
        self.lifted.load(Ordering::Relaxed)
    }
}

/// Distance sensor whose reading is set by the test. Starts at infinity.
#[derive(Debug, Clone)]
pub struct MockRange(Arc<AtomicU32>);

impl Default for MockRange {
    fn default() -> Self {
        Self(Arc::new(AtomicU32::new(f32::INFINITY.to_bits())))
    }
}

impl MockRange {
    pub fn set_cm(&self, cm: f32) {
        self.0.store(cm.to_bits(), Ordering::Relaxed);
    }
}

impl RangeSensor for MockRange {
    fn read_cm(&mut self) -> Result<f32, HardwareError> {
        Ok(f32::from_bits(self.0.load(Ordering::Relaxed)))
    }
}

/// Inspection handles for a mock `Hardware` set
#[derive(Debug, Clone, Default)]
pub struct MockRig {
    pub left: MockWheel,
    pub right: MockWheel,
    pub gripper: MockGripper,
    pub range: MockRange,
}

impl MockRig {
    pub fn new() -> Self {
        Self {
            left: MockWheel::new("left"),
            right: MockWheel::new("right"),
            gripper: MockGripper::default(),
            range: MockRange::default(),
        }
    }

    pub fn hardware(&self) -> Hardware {
        Hardware::new(
            self.left.clone(),
            self.right.clone(),
            self.gripper.clone(),
            self.range.clone(),
        )
    }

    /// Last (left, right) pair sent to the wheels
    pub fn last_wheels(&self) -> Option<(i32, i32)> {
        Some((self.left.last()?, self.right.last()?))
    }

    pub fn wheel_history(&self) -> Vec<(i32, i32)> {
        self.left
            .history()
            .into_iter()
            .zip(self.right.history())
            .collect()
    }
}
