// Perception/command blackboard shared between the collaborator listeners
// and the control loop.
//
// Every field has exactly one writer role:
// - perception: ball, station, wall, body angle (and ball-colour cues)
// - controller: `sound_phase`, setting `preparing_restart`
// - restart handshake owner: clearing `preparing_restart`
//
// Fields are independent atomics, so readers may see a frame that is partly
// old and partly new. The controller tolerates that; it never needs a
// consistent multi-field view.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

use crate::messages::{NOT_DETECTED, PerceptionFrame, SoundPhase};

#[derive(Debug)]
pub struct SharedRobotState {
    ball_angle: AtomicI32,
    ball_distance: AtomicI32,
    station_angle: AtomicI32,
    station_distance: AtomicI32,
    body_angle_decidegrees: AtomicI32,
    wall_x: AtomicI32,
    wall_size: AtomicI32,
    sound_phase: AtomicU8,
    preparing_restart: AtomicBool,
}

impl Default for SharedRobotState {
    fn default() -> Self {
        Self {
            ball_angle: AtomicI32::new(0),
            ball_distance: AtomicI32::new(NOT_DETECTED),
            station_angle: AtomicI32::new(0),
            station_distance: AtomicI32::new(NOT_DETECTED),
            body_angle_decidegrees: AtomicI32::new(0),
            wall_x: AtomicI32::new(0),
            wall_size: AtomicI32::new(NOT_DETECTED),
            sound_phase: AtomicU8::new(SoundPhase::FindingBall as u8),
            preparing_restart: AtomicBool::new(false),
        }
    }
}

impl SharedRobotState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current view with sentinels lifted into `Option`s
    pub fn snapshot(&self) -> RobotSnapshot {
        RobotSnapshot {
            ball: Target::from_wire(
                self.ball_angle.load(Ordering::Relaxed),
                self.ball_distance.load(Ordering::Relaxed),
            ),
            station: Target::from_wire(
                self.station_angle.load(Ordering::Relaxed),
                self.station_distance.load(Ordering::Relaxed),
            ),
            wall: Wall::from_wire(
                self.wall_x.load(Ordering::Relaxed),
                self.wall_size.load(Ordering::Relaxed),
            ),
            body_angle_decidegrees: self.body_angle_decidegrees.load(Ordering::Relaxed),
        }
    }

    pub fn sound_phase(&self) -> SoundPhase {
        SoundPhase::from_u8(self.sound_phase.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn preparing_restart(&self) -> bool {
        self.preparing_restart.load(Ordering::Acquire)
    }

    // Controller-owned fields

    pub(crate) fn set_sound_phase(&self, phase: SoundPhase) {
        self.sound_phase.store(phase as u8, Ordering::Relaxed);
    }

    pub(crate) fn begin_restart_handshake(&self) {
        self.preparing_restart.store(true, Ordering::Release);
    }
}

/// Write access for the perception role
#[derive(Debug, Clone)]
pub struct PerceptionWriter(Arc<SharedRobotState>);

impl PerceptionWriter {
    pub fn new(state: Arc<SharedRobotState>) -> Self {
        Self(state)
    }

    pub fn publish(&self, frame: &PerceptionFrame) {
        let s = &self.0;
        s.ball_angle.store(frame.ball_angle, Ordering::Relaxed);
        s.ball_distance.store(frame.ball_distance, Ordering::Relaxed);
        s.station_angle.store(frame.station_angle, Ordering::Relaxed);
        s.station_distance.store(frame.station_distance, Ordering::Relaxed);
        s.wall_x.store(frame.wall_x, Ordering::Relaxed);
        s.wall_size.store(frame.wall_size, Ordering::Relaxed);
        s.body_angle_decidegrees
            .store(frame.body_angle_decidegrees, Ordering::Relaxed);
        if let Some(phase) = frame.sound_phase {
            s.set_sound_phase(phase);
        }
    }

    pub fn set_body_angle(&self, decidegrees: i32) {
        self.0
            .body_angle_decidegrees
            .store(decidegrees, Ordering::Relaxed);
    }
}

/// Handle for whoever releases the controller from the restart wait
#[derive(Debug, Clone)]
pub struct RestartHandshake(Arc<SharedRobotState>);

impl RestartHandshake {
    pub fn new(state: Arc<SharedRobotState>) -> Self {
        Self(state)
    }

    /// Returns whether the controller was actually waiting
    pub fn release(&self) -> bool {
        self.0.preparing_restart.swap(false, Ordering::AcqRel)
    }
}

/// Angle [deg, camera-relative] and image distance of a detected marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub angle: i32,
    pub distance: i32,
}

impl Target {
    fn from_wire(angle: i32, distance: i32) -> Option<Self> {
        (distance != NOT_DETECTED).then_some(Self { angle, distance })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wall {
    pub x: i32,
    pub size: i32,
}

impl Wall {
    fn from_wire(x: i32, size: i32) -> Option<Self> {
        (size != NOT_DETECTED).then_some(Self { x, size })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotSnapshot {
    pub ball: Option<Target>,
    pub station: Option<Target>,
    pub wall: Option<Wall>,
    pub body_angle_decidegrees: i32,
}

impl RobotSnapshot {
    /// Body heading in degrees
    pub fn body_angle(&self) -> f32 {
        self.body_angle_decidegrees as f32 / 10.0
    }
}
