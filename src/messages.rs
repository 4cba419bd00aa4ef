// Wire messages exchanged with the collaborator processes

use serde::{Deserialize, Serialize};

/// "No detection" sentinel for distance/size fields on the wire
pub const NOT_DETECTED: i32 = -1;

/// "No guidance" sentinel for `heading_degrees`
pub const NO_GUIDANCE: i32 = 360;

/// Audio cue selector: the last significant event, read by the sound process
#[repr(u8)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SoundPhase {
    #[default]
    FindingBall = 0,
    DetectBlueBall = 1,
    DetectRedBall = 2,
    ReceivedGuidance = 3,
    DetectStation = 4,
    PrepareRestart = 5,
    DetectPressedWall = 6,
    DetectYellowBall = 7,
    Done = 8,
}

impl SoundPhase {
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::FindingBall,
            1 => Self::DetectBlueBall,
            2 => Self::DetectRedBall,
            3 => Self::ReceivedGuidance,
            4 => Self::DetectStation,
            5 => Self::PrepareRestart,
            6 => Self::DetectPressedWall,
            7 => Self::DetectYellowBall,
            8 => Self::Done,
            _ => return None,
        })
    }
}

// Camera process -> runtime, one per processed frame.
// Distances and sizes use -1 for "not detected" to stay compatible with the
// perception side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptionFrame {
    pub ball_angle: i32,
    pub ball_distance: i32,
    pub station_angle: i32,
    pub station_distance: i32,
    pub wall_x: i32,
    pub wall_size: i32,
    pub body_angle_decidegrees: i32,
    /// Ball colour events (red/blue/yellow) raised by perception
    #[serde(default)]
    pub sound_phase: Option<SoundPhase>,
}

impl Default for PerceptionFrame {
    fn default() -> Self {
        Self {
            ball_angle: 0,
            ball_distance: NOT_DETECTED,
            station_angle: 0,
            station_distance: NOT_DETECTED,
            wall_x: 0,
            wall_size: NOT_DETECTED,
            body_angle_decidegrees: 0,
            sound_phase: None,
        }
    }
}

/// Remote heading hint from the guidance collaborator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuidanceRecord {
    #[serde(alias = "degree", default = "no_guidance")]
    pub heading_degrees: i32,
    #[serde(alias = "wait", default)]
    pub hold: bool,
}

fn no_guidance() -> i32 {
    NO_GUIDANCE
}

/// What the controller does with the latest guidance record
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guidance {
    None,
    Hold,
    Heading(i32),
}

impl GuidanceRecord {
    pub fn none() -> Self {
        Self {
            heading_degrees: NO_GUIDANCE,
            hold: false,
        }
    }

    /// `hold` only counts alongside a real heading; 360 means nothing was sent
    pub fn interpret(&self) -> Guidance {
        if self.heading_degrees == NO_GUIDANCE {
            Guidance::None
        } else if self.hold {
            Guidance::Hold
        } else {
            Guidance::Heading(self.heading_degrees)
        }
    }
}

/// Runtime -> wheel driver process. Integer percent in [-100, 100].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct WheelActuation {
    pub left: i32,
    pub right: i32,
}

/// Runtime -> gripper servo
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GripperCommand {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    ChaseBall,
    GoToStation,
    PrepareRestart,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChaseMode {
    Normal,
    Swing,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    PerceptionStale,
}

/// Published every tick; the audio process keys off `sound_phase`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionStatus {
    pub mission: MissionState,
    pub chase_mode: ChaseMode,
    pub sound_phase: SoundPhase,
    pub preparing_restart: bool,
    pub health: RuntimeHealth,
    pub wheels: WheelActuation,
}
