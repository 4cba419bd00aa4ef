// Driver boundary for the ball robot
//
// Provides:
// - Traits for the wheel motors, gripper servo and front distance sensor
// - A bridge backend that hands actuation to the runtime for publishing
// - Recording mocks for tests and dry runs

pub mod bridge;
pub mod mock;

pub use crate::error::HardwareError;

/// One wheel motor, power in percent [-100, 100]
pub trait WheelMotor: Send {
    fn drive(&mut self, power: i32) -> Result<(), HardwareError>;
}

/// Ball gripper servo. "Lifted" means not holding a ball.
pub trait Gripper: Send {
    fn up(&mut self) -> Result<(), HardwareError>;
    fn down(&mut self) -> Result<(), HardwareError>;
    fn is_lifted(&self) -> bool;
}

/// Front infrared distance sensor
pub trait RangeSensor: Send {
    /// Distance in cm; `f32::INFINITY` when nothing is in range
    fn read_cm(&mut self) -> Result<f32, HardwareError>;
}

/// Everything the mission controller actuates or reads directly
pub struct Hardware {
    pub left: Box<dyn WheelMotor>,
    pub right: Box<dyn WheelMotor>,
    pub gripper: Box<dyn Gripper>,
    pub range: Box<dyn RangeSensor>,
}

impl Hardware {
    pub fn new(
        left: impl WheelMotor + 'static,
        right: impl WheelMotor + 'static,
        gripper: impl Gripper + 'static,
        range: impl RangeSensor + 'static,
    ) -> Self {
        Self {
            left: Box::new(left),
            right: Box::new(right),
            gripper: Box::new(gripper),
            range: Box::new(range),
        }
    }
}
