// Zenoh-facing driver backend
//
// The wheel/servo processes live elsewhere on the bus. During a tick the
// controller writes into a staging buffer; after the tick the runtime takes
// the staged actuation and publishes it. The range sensor reads the latest
// value received on the sensor topic.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::{Gripper, Hardware, HardwareError, RangeSensor, WheelMotor};
use crate::messages::{GripperCommand, WheelActuation};

#[derive(Debug, Default)]
struct Staged {
    wheels: WheelActuation,
    gripper: Option<GripperCommand>,
}

/// Shared staging area between the bridge drivers and the runtime loop
#[derive(Debug, Clone)]
pub struct ActuationBridge {
    staged: Arc<Mutex<Staged>>,
    lifted: Arc<AtomicBool>,
    range_cm: Arc<AtomicU32>,
}

impl Default for ActuationBridge {
    fn default() -> Self {
        Self {
            staged: Arc::default(),
            lifted: Arc::new(AtomicBool::new(true)),
            range_cm: Arc::new(AtomicU32::new(f32::INFINITY.to_bits())),
        }
    }
}

/// What the runtime should publish after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickActuation {
    pub wheels: WheelActuation,
    /// Only set when the gripper was commanded this tick
    pub gripper: Option<GripperCommand>,
}

impl ActuationBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hardware(&self) -> Hardware {
        Hardware::new(
            BridgeWheel {
                side: Side::Left,
                bridge: self.clone(),
            },
            BridgeWheel {
                side: Side::Right,
                bridge: self.clone(),
            },
            BridgeGripper(self.clone()),
            BridgeRange(self.clone()),
        )
    }

    /// Latest range reading from the sensor topic; `None` means out of range
    pub fn set_range(&self, cm: Option<f32>) {
        let cm = cm.filter(|v| v.is_finite()).unwrap_or(f32::INFINITY);
        self.range_cm.store(cm.to_bits(), Ordering::Relaxed);
    }

    /// Wheel powers persist between ticks; gripper commands are consumed
    pub fn take(&self) -> Result<TickActuation, HardwareError> {
        let mut staged = self.staged.lock().map_err(|_| HardwareError::Poisoned)?;
        Ok(TickActuation {
            wheels: staged.wheels,
            gripper: staged.gripper.take(),
        })
    }

    /// Like `take`, but a broken staging buffer yields a stop so the loop
    /// keeps running
    pub fn take_or_stop(&self) -> TickActuation {
        self.take().unwrap_or_else(|e| {
            warn!("Failed to collect actuation: {}, stopping wheels", e);
            TickActuation {
                wheels: WheelActuation::default(),
                gripper: None,
            }
        })
    }

    fn stage<F: FnOnce(&mut Staged)>(&self, f: F) -> Result<(), HardwareError> {
        let mut staged = self.staged.lock().map_err(|_| HardwareError::Poisoned)?;
        f(&mut staged);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

struct BridgeWheel {
    side: Side,
    bridge: ActuationBridge,
}

impl WheelMotor for BridgeWheel {
    fn drive(&mut self, power: i32) -> Result<(), HardwareError> {
        let device = match self.side {
            Side::Left => "left wheel",
            Side::Right => "right wheel",
        };
        if !(-100..=100).contains(&power) {
            return Err(HardwareError::OutOfRange { device, power });
        }
        let side = self.side;
        self.bridge.stage(|s| match side {
            Side::Left => s.wheels.left = power,
            Side::Right => s.wheels.right = power,
        })
    }
}

struct BridgeGripper(ActuationBridge);

impl BridgeGripper {
    fn command(&mut self, cmd: GripperCommand) -> Result<(), HardwareError> {
        self.0.stage(|s| s.gripper = Some(cmd))?;
        self.0
            .lifted
            .store(cmd == GripperCommand::Up, Ordering::Relaxed);
        Ok(())
    }
}

impl Gripper for BridgeGripper {
    fn up(&mut self) -> Result<(), HardwareError> {
        self.command(GripperCommand::Up)
    }

    fn down(&mut self) -> Result<(), HardwareError> {
        self.command(GripperCommand::Down)
    }

    fn is_lifted(&self) -> bool {
        self.0.lifted.load(Ordering::Relaxed)
    }
}

struct BridgeRange(ActuationBridge);

impl RangeSensor for BridgeRange {
    fn read_cm(&mut self) -> Result<f32, HardwareError> {
        Ok(f32::from_bits(self.0.range_cm.load(Ordering::Relaxed)))
    }
}
