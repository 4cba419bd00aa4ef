// Mission state machine: chase the ball, carry it to the station, restart.
//
// `MissionController::tick` is called once per control period with the
// current time. Each tick it either steps an active maneuver (settle after
// capture, corner escape, restart sequence) or evaluates mission
// transitions, derives a base command from the heading law, runs the
// post-processors, clamps, and drives both wheels.
//
// Maneuvers are uninterruptible: while one is active no transition is
// evaluated and no post-processor runs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use super::chase_mode::ChaseSubMode;
use super::clamp::{MotorCommand, clamp_and_compensate};
use super::corner::{CornerDetector, CornerEscape};
use super::power::{WheelPowers, chase, rear_hemisphere_heading};
use super::restart::RestartSequence;
use super::stuck::StuckDetector;
use super::swing::SwingDetector;
use crate::config::ControlConfig;
use crate::hardware::Hardware;
use crate::messages::{ChaseMode, Guidance, GuidanceRecord, MissionState, SoundPhase};
use crate::state::{RobotSnapshot, SharedRobotState};

#[derive(Debug, Clone)]
enum Maneuver {
    /// Hold still while the gripper closes on the ball
    Settle { since: Instant, settle: Duration },
    CornerEscape(CornerEscape),
    Restart(RestartSequence),
}

pub struct MissionController {
    config: ControlConfig,
    state: Arc<SharedRobotState>,
    guidance: watch::Receiver<GuidanceRecord>,
    hw: Hardware,

    mission: MissionState,
    chase_mode: ChaseSubMode,
    stuck: StuckDetector,
    swing: SwingDetector,
    corner: CornerDetector,
    maneuver: Option<Maneuver>,

    last_raw: WheelPowers,
    last_command: MotorCommand,
}

impl MissionController {
    pub fn new(
        config: ControlConfig,
        state: Arc<SharedRobotState>,
        guidance: watch::Receiver<GuidanceRecord>,
        mut hw: Hardware,
        now: Instant,
    ) -> Self {
        if let Err(e) = hw.gripper.up() {
            warn!("Failed to raise gripper at startup: {}", e);
        }
        Self {
            chase_mode: ChaseSubMode::new(&config.chase_mode, now),
            stuck: StuckDetector::new(&config.stuck),
            swing: SwingDetector::new(&config.swing),
            corner: CornerDetector::new(&config.corner),
            config,
            state,
            guidance,
            hw,
            mission: MissionState::ChaseBall,
            maneuver: None,
            last_raw: WheelPowers::STOP,
            last_command: MotorCommand::STOP,
        }
    }

    pub fn mission(&self) -> MissionState {
        self.mission
    }

    pub fn chase_mode(&self) -> ChaseMode {
        self.chase_mode.current()
    }

    /// True while a settle, corner-escape or restart maneuver owns the wheels
    pub fn in_maneuver(&self) -> bool {
        self.maneuver.is_some()
    }

    /// Command of the last tick before clamping
    pub fn last_raw_command(&self) -> WheelPowers {
        self.last_raw
    }

    /// Command of the last tick as sent to the wheels
    pub fn last_command(&self) -> MotorCommand {
        self.last_command
    }

    /// Force the pursuit sub-mode (restarts its timer)
    pub fn set_chase_mode(&mut self, mode: ChaseMode, now: Instant) {
        self.chase_mode.set_mode(mode, now);
    }

    /// Run one control period
    pub fn tick(&mut self, now: Instant) -> MotorCommand {
        let snap = self.state.snapshot();

        if let Some(powers) = self.step_maneuver(&snap, now) {
            return self.send(powers);
        }
        if self.evaluate_transitions(&snap, now) {
            return self.last_command;
        }

        let mut cmd = self.base_command(&snap, now);

        if self.config.swing.enabled {
            cmd = self.swing.run(cmd, now);
        }

        if self.mission == MissionState::GoToStation && self.corner.update(snap.wall, now) {
            self.corner.reset();
            self.state.set_sound_phase(SoundPhase::DetectPressedWall);
            self.maneuver = Some(Maneuver::CornerEscape(CornerEscape::start(
                &self.config.corner,
                now,
            )));
            if let Some(powers) = self.step_maneuver(&snap, now) {
                return self.send(powers);
            }
        }

        if self.config.stuck.enabled {
            cmd = self.stuck.run(cmd, snap.body_angle(), now);
        }

        let stuck_cm = self.config.mission.stuck_cm;
        if self.hw.gripper.is_lifted() && self.read_range().is_some_and(|cm| cm < stuck_cm) {
            info!("Obstacle right in front, backing off");
            cmd = WheelPowers::straight(-self.config.mission.back_speed);
        }

        trace!(
            "{:?} ball={:?} station={:?} body={:.1} -> ({:.1}, {:.1})",
            self.mission,
            snap.ball,
            snap.station,
            snap.body_angle(),
            cmd.left,
            cmd.right
        );
        self.send(cmd)
    }

    /// Returns true when a transition happened and its side effects were
    /// issued; the rest of the tick is skipped.
    fn evaluate_transitions(&mut self, snap: &RobotSnapshot, now: Instant) -> bool {
        let m = &self.config.mission;
        match self.mission {
            MissionState::ChaseBall => {
                let captured = snap.ball.is_some_and(|b| {
                    m.capture_distance.0 < b.distance
                        && b.distance < m.capture_distance.1
                        && m.capture_angle.0 < b.angle
                        && b.angle < m.capture_angle.1
                });
                if captured {
                    info!("Capture ball");
                    let settle = m.capture_settle;
                    self.stop();
                    if let Err(e) = self.hw.gripper.down() {
                        warn!("Failed to lower gripper: {}", e);
                    }
                    self.maneuver = Some(Maneuver::Settle { since: now, settle });
                    self.set_mission(MissionState::GoToStation);
                    return true;
                }
                false
            }
            MissionState::GoToStation => {
                let (have_ball_cm, arrival) = (m.have_ball_cm, m.station_arrival);
                let lost_ball = self.read_range().is_some_and(|cm| cm > have_ball_cm);
                if lost_ball {
                    info!("Lost ball");
                    self.stop();
                    self.raise_gripper();
                    if snap.station.is_some() {
                        info!("Lost ball at the station, delivered");
                        self.finish_delivery(now);
                    } else {
                        self.chase_mode.set_mode(ChaseMode::Normal, now);
                        self.set_mission(MissionState::ChaseBall);
                    }
                    return true;
                }
                let arrived = snap
                    .station
                    .is_some_and(|s| arrival.0 < s.distance && s.distance < arrival.1);
                if arrived {
                    info!("Reached station");
                    self.stop();
                    self.raise_gripper();
                    self.finish_delivery(now);
                    return true;
                }
                false
            }
            MissionState::PrepareRestart => {
                info!("Prepare restart, waiting for release");
                self.stop();
                self.state.begin_restart_handshake();
                self.state.set_sound_phase(SoundPhase::PrepareRestart);
                self.maneuver = Some(Maneuver::Restart(RestartSequence::new(
                    &self.config.mission,
                    self.config.gains.turn,
                )));
                true
            }
        }
    }

    fn base_command(&mut self, snap: &RobotSnapshot, now: Instant) -> WheelPowers {
        let gains = &self.config.gains;
        match self.mission {
            MissionState::ChaseBall => {
                let mode = self.chase_mode.now(now);
                if let Some(ball) = snap.ball {
                    return chase(ball.angle as f32, gains.chase);
                }
                match mode {
                    ChaseMode::Normal => chase(snap.body_angle(), gains.chase),
                    ChaseMode::Swing => self.config.mission.swing_rotate.into(),
                }
            }
            MissionState::GoToStation => {
                if let Some(station) = snap.station {
                    self.state.set_sound_phase(SoundPhase::DetectStation);
                    return chase(station.angle as f32, gains.chase);
                }
                let record = *self.guidance.borrow();
                match record.interpret() {
                    Guidance::Hold => {
                        debug!("Guidance says hold");
                        self.state.set_sound_phase(SoundPhase::ReceivedGuidance);
                        WheelPowers::STOP
                    }
                    Guidance::Heading(deg) => {
                        debug!("Guidance heading {}", deg);
                        self.state.set_sound_phase(SoundPhase::ReceivedGuidance);
                        chase(-(deg as f32), gains.station_guide)
                    }
                    Guidance::None => chase(
                        rear_hemisphere_heading(snap.body_angle_decidegrees),
                        gains.chase,
                    ),
                }
            }
            MissionState::PrepareRestart => WheelPowers::STOP,
        }
    }

    fn step_maneuver(&mut self, snap: &RobotSnapshot, now: Instant) -> Option<WheelPowers> {
        let maneuver = self.maneuver.as_mut()?;
        let step = match maneuver {
            Maneuver::Settle { since, settle } => {
                (now.saturating_duration_since(*since) < *settle).then_some(WheelPowers::STOP)
            }
            Maneuver::CornerEscape(escape) => escape.step(snap.wall, now),
            Maneuver::Restart(seq) => seq.step(self.state.preparing_restart(), snap.body_angle(), now),
        };
        if step.is_none() {
            if let Some(Maneuver::Restart(_)) = self.maneuver.take() {
                info!("Restart done -> chase ball");
                self.chase_mode.set_mode(ChaseMode::Normal, now);
                self.set_mission(MissionState::ChaseBall);
            }
        }
        step
    }

    fn finish_delivery(&mut self, now: Instant) {
        self.state.set_sound_phase(SoundPhase::Done);
        self.chase_mode.set_mode(ChaseMode::Normal, now);
        self.set_mission(MissionState::PrepareRestart);
    }

    fn set_mission(&mut self, next: MissionState) {
        info!("Mission {:?} -> {:?}", self.mission, next);
        if self.mission == MissionState::GoToStation {
            self.corner.reset();
        }
        self.mission = next;
    }

    fn read_range(&mut self) -> Option<f32> {
        match self.hw.range.read_cm() {
            Ok(cm) => Some(cm),
            Err(e) => {
                warn!("Range sensor read failed: {}", e);
                None
            }
        }
    }

    fn raise_gripper(&mut self) {
        if let Err(e) = self.hw.gripper.up() {
            warn!("Failed to raise gripper: {}", e);
        }
    }

    fn stop(&mut self) {
        self.send(WheelPowers::STOP);
    }

    fn send(&mut self, raw: WheelPowers) -> MotorCommand {
        self.last_raw = raw;
        let cmd = MotorCommand::from(clamp_and_compensate(raw));
        if let Err(e) = self.hw.left.drive(cmd.left) {
            warn!("Left wheel drive failed: {}", e);
        }
        if let Err(e) = self.hw.right.drive(cmd.right) {
            warn!("Right wheel drive failed: {}", e);
        }
        self.last_command = cmd;
        cmd
    }
}
