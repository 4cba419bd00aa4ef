// Loop timing, topics, and controller tuning
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

// Runtime loop frequency (100ms period)
pub const LOOP_HZ: u64 = 10;

// Perception watchdog: status goes stale if no frame arrives in this window
pub const PERCEPTION_TIMEOUT: Duration = Duration::from_millis(1000);

// Zenoh topics
pub const TOPIC_PERCEPTION: &str = "ballbot/perception"; // camera process -> runtime
pub const TOPIC_RANGE: &str = "ballbot/sensor/range"; // distance sensor, cm
pub const TOPIC_GUIDE: &str = "ballbot/guide"; // remote heading hints
pub const TOPIC_RESTART: &str = "ballbot/cmd/restart"; // clears the restart handshake
pub const TOPIC_RT_WHEELS: &str = "ballbot/rt/wheels"; // wheel actuation
pub const TOPIC_RT_GRIPPER: &str = "ballbot/rt/gripper"; // gripper servo
pub const TOPIC_STATUS: &str = "ballbot/state/status"; // mission status + audio cue

/// Full controller tuning. Every section falls back to its defaults when
/// omitted from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub gains: GainConfig,
    pub mission: MissionConfig,
    pub chase_mode: ChaseModeConfig,
    pub stuck: StuckConfig,
    pub swing: SwingConfig,
    pub corner: CornerConfig,
}

impl ControlConfig {
    /// Load a JSON config file; absent fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// (base speed, proportional gain) pair for the heading law
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    pub base_speed: f32,
    pub k: f32,
}

impl Gain {
    pub const fn new(base_speed: f32, k: f32) -> Self {
        Self { base_speed, k }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "GainOverrides")]
pub struct GainConfig {
    /// Ball pursuit and body-angle fallbacks
    pub chase: Gain,
    /// Following a remote guidance heading
    pub station_guide: Gain,
    /// Restart turn-in-place
    pub turn: Gain,
}

impl Default for GainConfig {
    fn default() -> Self {
        Self {
            chase: Gain::new(45.0, 0.6),
            station_guide: Gain::new(10.0, 0.15),
            turn: Gain::new(20.0, 1.5),
        }
    }
}

// A gain may be given partially; missing halves keep that gain's own default
#[derive(Default, Deserialize)]
#[serde(default)]
struct GainOverrides {
    chase: GainPatch,
    station_guide: GainPatch,
    turn: GainPatch,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct GainPatch {
    base_speed: Option<f32>,
    k: Option<f32>,
}

impl GainPatch {
    fn apply(self, gain: Gain) -> Gain {
        Gain {
            base_speed: self.base_speed.unwrap_or(gain.base_speed),
            k: self.k.unwrap_or(gain.k),
        }
    }
}

impl From<GainOverrides> for GainConfig {
    fn from(o: GainOverrides) -> Self {
        let defaults = Self::default();
        Self {
            chase: o.chase.apply(defaults.chase),
            station_guide: o.station_guide.apply(defaults.station_guide),
            turn: o.turn.apply(defaults.turn),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Capture window, exclusive bounds
    pub capture_distance: (i32, i32),
    pub capture_angle: (i32, i32),
    /// Station arrival window on `station_distance`, exclusive bounds
    pub station_arrival: (i32, i32),
    /// Ball is considered lost above this range reading [cm]
    pub have_ball_cm: f32,
    /// Something is in the way below this range reading [cm] (gripper up only)
    pub stuck_cm: f32,
    /// Backward power used for close-obstacle avoidance
    pub back_speed: f32,
    /// Pause after capturing the ball
    #[serde(with = "secs")]
    pub capture_settle: Duration,
    /// Restart maneuver: backward power and duration before turning
    pub restart_back_speed: f32,
    #[serde(with = "secs")]
    pub restart_back: Duration,
    /// Restart turn ends once |body angle| drops below this [deg]
    pub restart_heading_tolerance: f32,
    /// Fixed rotation used while searching in swing mode
    pub swing_rotate: (f32, f32),
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            capture_distance: (100, 160),
            capture_angle: (-20, 20),
            station_arrival: (200, 310),
            have_ball_cm: 15.0,
            stuck_cm: 5.0,
            back_speed: 30.0,
            capture_settle: Duration::from_secs(1),
            restart_back_speed: 50.0,
            restart_back: Duration::from_secs(1),
            restart_heading_tolerance: 30.0,
            swing_rotate: (100.0, -100.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChaseModeConfig {
    #[serde(with = "secs")]
    pub max_normal: Duration,
    #[serde(with = "secs")]
    pub max_swing: Duration,
}

impl Default for ChaseModeConfig {
    fn default() -> Self {
        Self {
            max_normal: Duration::from_secs(10),
            max_swing: Duration::from_secs(6),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StuckConfig {
    pub enabled: bool,
    pub error_count_limit: u32,
    /// Heading change below this counts as "did not turn" [deg]
    pub angle_delta_threshold: f32,
    /// Commanded wheel difference above this counts as "tried to turn"
    pub turn_intent: f32,
    #[serde(with = "secs")]
    pub back_duration: Duration,
    pub back_speed: f32,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            error_count_limit: 10,
            angle_delta_threshold: 3.0,
            turn_intent: 50.0,
            back_duration: Duration::from_secs(2),
            back_speed: 30.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    pub enabled: bool,
    pub count_threshold: u32,
    #[serde(with = "secs")]
    pub detect_interval: Duration,
    #[serde(with = "secs")]
    pub escape_duration: Duration,
    pub escape_speed: (f32, f32),
}

impl Default for SwingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            count_threshold: 3,
            detect_interval: Duration::from_secs(2),
            escape_duration: Duration::from_secs(1),
            escape_speed: (5.0, 5.0),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CornerConfig {
    /// Wall continuously in view this long while returning => escape
    #[serde(with = "secs")]
    pub wall_stuck: Duration,
    pub back_speed: f32,
    #[serde(with = "secs")]
    pub back: Duration,
    pub turn_speed: f32,
    #[serde(with = "secs")]
    pub turn: Duration,
    pub advance_speed: f32,
    #[serde(with = "secs")]
    pub advance: Duration,
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self {
            wall_stuck: Duration::from_secs(3),
            back_speed: 30.0,
            back: Duration::from_secs(2),
            turn_speed: 100.0,
            turn: Duration::from_secs(1),
            advance_speed: 45.0,
            advance: Duration::from_secs(3),
        }
    }
}

// Durations are written as fractional seconds in config files
mod secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
