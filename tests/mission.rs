// End-to-end scenarios for the mission controller on mock hardware

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use ballbot_runtime::config::ControlConfig;
use ballbot_runtime::control::{MissionController, MotorCommand, WheelPowers};
use ballbot_runtime::hardware::mock::MockRig;
use ballbot_runtime::messages::{
    ChaseMode, GripperCommand, GuidanceRecord, MissionState, PerceptionFrame, SoundPhase,
};
use ballbot_runtime::state::{PerceptionWriter, RestartHandshake, SharedRobotState};

const TICK: Duration = Duration::from_millis(100);

struct Bench {
    state: Arc<SharedRobotState>,
    perception: PerceptionWriter,
    handshake: RestartHandshake,
    guide: watch::Sender<GuidanceRecord>,
    rig: MockRig,
    controller: MissionController,
    now: Instant,
}

impl Bench {
    fn new() -> Self {
        Self::with_config(ControlConfig::default())
    }

    fn with_config(config: ControlConfig) -> Self {
        let state = SharedRobotState::new();
        let rig = MockRig::new();
        let (guide, guide_rx) = watch::channel(GuidanceRecord::none());
        let now = Instant::now();
        let controller = MissionController::new(config, state.clone(), guide_rx, rig.hardware(), now);
        Self {
            perception: PerceptionWriter::new(state.clone()),
            handshake: RestartHandshake::new(state.clone()),
            state,
            guide,
            rig,
            controller,
            now,
        }
    }

    fn see(&self, frame: PerceptionFrame) {
        self.perception.publish(&frame);
    }

    fn tick(&mut self) -> MotorCommand {
        let cmd = self.controller.tick(self.now);
        self.now += TICK;
        cmd
    }

    fn advance(&mut self, d: Duration) {
        self.now += d;
    }

    /// Capture a ball and wait out the settle pause while holding it
    fn carry_ball(&mut self) {
        self.see(PerceptionFrame {
            ball_distance: 130,
            ..Default::default()
        });
        self.tick();
        assert_eq!(self.controller.mission(), MissionState::GoToStation);
        self.rig.range.set_cm(8.0);
        self.see(PerceptionFrame::default());
        self.advance(Duration::from_secs(1));
    }
}

#[test]
fn capture_stops_before_heading_to_station() {
    let mut b = Bench::new();
    b.see(PerceptionFrame {
        ball_angle: 0,
        ball_distance: 130,
        ..Default::default()
    });

    let cmd = b.tick();
    assert_eq!(cmd, MotorCommand::STOP);
    assert_eq!(b.controller.mission(), MissionState::GoToStation);
    assert_eq!(b.rig.wheel_history(), vec![(0, 0)]);
    assert_eq!(b.rig.gripper.history(), vec![GripperCommand::Up, GripperCommand::Down]);

    // Gripper settles for a second; wheels stay stopped
    b.rig.range.set_cm(8.0);
    b.see(PerceptionFrame::default());
    for _ in 0..9 {
        assert_eq!(b.tick(), MotorCommand::STOP);
    }
    assert!(b.controller.in_maneuver());

    // Then the station phase drives: nothing in view, body angle 0 -> straight
    assert_eq!(b.tick(), MotorCommand::new(45, 45));
    assert!(!b.controller.in_maneuver());
}

#[test]
fn ball_outside_capture_window_is_chased() {
    let mut b = Bench::new();
    b.see(PerceptionFrame {
        ball_angle: 25,
        ball_distance: 130,
        ..Default::default()
    });
    let cmd = b.tick();
    assert_eq!(b.controller.mission(), MissionState::ChaseBall);
    // 45 + 0.6 * 25 = 60, 45 - 15 = 30
    assert_eq!(cmd, MotorCommand::new(60, 30));
}

#[test]
fn swing_mode_rotates_in_place() {
    let mut b = Bench::new();
    b.controller.set_chase_mode(ChaseMode::Swing, b.now);

    let cmd = b.tick();
    assert_eq!(b.controller.last_raw_command(), WheelPowers::new(100.0, -100.0));
    assert_eq!(cmd, MotorCommand::new(100, -100));
}

#[test]
fn normal_mode_switches_to_swing_after_timeout() {
    let mut b = Bench::new();
    assert_eq!(b.tick(), MotorCommand::new(45, 45));
    assert_eq!(b.controller.chase_mode(), ChaseMode::Normal);

    b.advance(Duration::from_secs(10));
    assert_eq!(b.tick(), MotorCommand::new(100, -100));
    assert_eq!(b.controller.chase_mode(), ChaseMode::Swing);
}

#[test]
fn guidance_hold_stops_the_robot() {
    let mut b = Bench::new();
    b.carry_ball();
    b.guide.send_replace(GuidanceRecord {
        heading_degrees: 45,
        hold: true,
    });

    assert_eq!(b.tick(), MotorCommand::STOP);
    assert_eq!(b.controller.mission(), MissionState::GoToStation);
    assert_eq!(b.state.sound_phase(), SoundPhase::ReceivedGuidance);
}

#[test]
fn guidance_heading_steers_gently() {
    let mut b = Bench::new();
    b.carry_ball();
    b.guide.send_replace(GuidanceRecord {
        heading_degrees: 20,
        hold: false,
    });

    // Station-guide law on the negated heading: 10 -/+ 0.15 * 20
    assert_eq!(b.tick(), MotorCommand::new(7, 13));
    assert_eq!(b.state.sound_phase(), SoundPhase::ReceivedGuidance);

    // Sentinel heading falls back to the rear-hemisphere heuristic
    b.guide.send_replace(GuidanceRecord::none());
    b.perception.set_body_angle(1500);
    // 150 - 180 = -30 -> 45 -/+ 18
    assert_eq!(b.tick(), MotorCommand::new(27, 63));
}

#[test]
fn visible_station_is_chased() {
    let mut b = Bench::new();
    b.carry_ball();
    b.see(PerceptionFrame {
        station_angle: -10,
        station_distance: 120,
        ..Default::default()
    });
    assert_eq!(b.tick(), MotorCommand::new(39, 51));
    assert_eq!(b.state.sound_phase(), SoundPhase::DetectStation);
}

#[test]
fn losing_ball_away_from_station_resumes_chase() {
    let mut b = Bench::new();
    b.carry_ball();
    b.rig.range.set_cm(40.0);

    assert_eq!(b.tick(), MotorCommand::STOP);
    assert_eq!(b.controller.mission(), MissionState::ChaseBall);
    assert_eq!(b.rig.gripper.history().last(), Some(&GripperCommand::Up));
}

#[test]
fn delivery_and_restart_sequence() {
    let mut b = Bench::new();
    b.carry_ball();

    // Station in arrival range
    b.see(PerceptionFrame {
        station_distance: 250,
        body_angle_decidegrees: 1000,
        ..Default::default()
    });
    assert_eq!(b.tick(), MotorCommand::STOP);
    assert_eq!(b.controller.mission(), MissionState::PrepareRestart);
    assert_eq!(b.state.sound_phase(), SoundPhase::Done);
    assert_eq!(b.rig.gripper.history().last(), Some(&GripperCommand::Up));

    // Entering PrepareRestart raises the handshake and waits
    assert_eq!(b.tick(), MotorCommand::STOP);
    assert!(b.state.preparing_restart());
    assert_eq!(b.state.sound_phase(), SoundPhase::PrepareRestart);
    for _ in 0..30 {
        assert_eq!(b.tick(), MotorCommand::STOP);
    }
    assert_eq!(b.controller.mission(), MissionState::PrepareRestart);

    // Released: back off for a second
    assert!(b.handshake.release());
    for _ in 0..10 {
        assert_eq!(b.tick(), MotorCommand::new(-50, -50));
    }

    // Turn in place: 20 + 1.5 * 100 = 170, saturated at the wheels
    assert_eq!(b.tick(), MotorCommand::new(100, -100));
    b.perception.set_body_angle(400);
    assert_eq!(b.tick(), MotorCommand::new(80, -80));

    // Heading within 30 deg ends the restart and chasing resumes this tick
    b.perception.set_body_angle(200);
    b.see(PerceptionFrame {
        body_angle_decidegrees: 200,
        ..Default::default()
    });
    let cmd = b.tick();
    assert_eq!(b.controller.mission(), MissionState::ChaseBall);
    assert_eq!(b.controller.chase_mode(), ChaseMode::Normal);
    assert!(!b.controller.in_maneuver());
    // Normal chase by body angle: 45 +/- 0.6 * 20
    assert_eq!(cmd, MotorCommand::new(57, 33));
}

#[test]
fn losing_ball_at_station_counts_as_delivery() {
    let mut b = Bench::new();
    b.carry_ball();
    b.see(PerceptionFrame {
        station_distance: 90,
        ..Default::default()
    });
    b.rig.range.set_cm(f32::INFINITY);

    b.tick();
    assert_eq!(b.controller.mission(), MissionState::PrepareRestart);
    assert_eq!(b.state.sound_phase(), SoundPhase::Done);
}

#[test]
fn wall_held_in_view_triggers_corner_escape() {
    let mut b = Bench::new();
    b.carry_ball();
    b.see(PerceptionFrame {
        wall_x: 40,
        wall_size: 120_000,
        ..Default::default()
    });

    // Wall in view for 3s: still normal driving
    for _ in 0..31 {
        assert_eq!(b.tick(), MotorCommand::new(45, 45));
    }
    assert!(!b.controller.in_maneuver());

    // Past 3s: back up for 2s
    assert_eq!(b.tick(), MotorCommand::new(-30, -30));
    assert!(b.controller.in_maneuver());
    assert_eq!(b.state.sound_phase(), SoundPhase::DetectPressedWall);
    for _ in 0..19 {
        assert_eq!(b.tick(), MotorCommand::new(-30, -30));
    }

    // Wall on the right: spin left for 1s, then forward for 3s
    for _ in 0..10 {
        assert_eq!(b.tick(), MotorCommand::new(-100, 100));
    }
    for _ in 0..30 {
        assert_eq!(b.tick(), MotorCommand::new(45, 45));
    }
    assert!(b.controller.in_maneuver());
}

#[test]
fn sharp_turn_without_heading_change_backs_up() {
    let mut b = Bench::new();
    // Ball far to the right, outside the capture window; heading never changes
    b.see(PerceptionFrame {
        ball_angle: 90,
        ball_distance: 200,
        ..Default::default()
    });

    for _ in 0..10 {
        assert_eq!(b.tick(), MotorCommand::new(99, -9));
    }
    assert_eq!(b.tick(), MotorCommand::new(-30, -30));
    for _ in 0..19 {
        assert_eq!(b.tick(), MotorCommand::new(-30, -30));
    }
    assert_eq!(b.tick(), MotorCommand::new(99, -9));
}

#[test]
fn obstacle_in_front_overrides_everything() {
    let mut b = Bench::new();
    b.rig.range.set_cm(3.0);
    b.see(PerceptionFrame {
        ball_angle: 10,
        ball_distance: 300,
        ..Default::default()
    });
    assert_eq!(b.tick(), MotorCommand::new(-30, -30));
}

#[test]
fn wheel_failure_does_not_stop_the_loop() {
    let mut b = Bench::new();
    b.rig.left.set_failing(true);

    assert_eq!(b.tick(), MotorCommand::new(45, 45));
    assert_eq!(b.rig.left.history(), Vec::<i32>::new());
    assert_eq!(b.rig.right.history(), vec![45]);

    b.rig.left.set_failing(false);
    b.tick();
    assert_eq!(b.rig.left.last(), Some(45));
}

#[test]
fn swing_escape_when_enabled() {
    let mut config = ControlConfig::default();
    config.swing.enabled = true;
    config.stuck.enabled = false;
    let mut b = Bench::with_config(config);

    // Ball jumping side to side makes both wheels reverse every tick
    let mut out = Vec::new();
    for i in 0..6 {
        let angle = if i % 2 == 0 { 120 } else { -120 };
        b.see(PerceptionFrame {
            ball_angle: angle,
            ball_distance: 300,
            ..Default::default()
        });
        out.push(b.tick());
    }
    // Seed + 3 reversals pass, the 4th reversal forces the slow escape
    assert_ne!(out[3], MotorCommand::new(5, 5));
    assert_eq!(out[4], MotorCommand::new(5, 5));
    assert_eq!(out[5], MotorCommand::new(5, 5));
}

#[test]
fn wall_timer_starts_over_after_leaving_station_phase() {
    let mut b = Bench::new();
    b.carry_ball();

    // Wall glimpsed once on the way to the station
    b.see(PerceptionFrame {
        wall_x: -20,
        wall_size: 1000,
        ..Default::default()
    });
    assert_eq!(b.tick(), MotorCommand::new(45, 45));

    // Ball drops out, back to chasing with no wall in view
    b.see(PerceptionFrame::default());
    b.rig.range.set_cm(40.0);
    b.tick();
    assert_eq!(b.controller.mission(), MissionState::ChaseBall);
    b.advance(Duration::from_secs(20));
    b.tick();

    // Recapture, then the wall shows up again: a new sighting, not a corner
    b.carry_ball();
    b.see(PerceptionFrame {
        wall_x: -20,
        wall_size: 1000,
        ..Default::default()
    });
    assert_eq!(b.tick(), MotorCommand::new(45, 45));
    assert!(!b.controller.in_maneuver());
}

#[test]
fn wall_still_in_view_after_escape_needs_another_full_wait() {
    let mut config = ControlConfig::default();
    config.corner.back = Duration::from_millis(100);
    config.corner.turn = Duration::from_millis(100);
    config.corner.advance = Duration::from_millis(100);
    let mut b = Bench::with_config(config);
    b.carry_ball();
    b.see(PerceptionFrame {
        wall_x: 40,
        wall_size: 120_000,
        ..Default::default()
    });

    for _ in 0..31 {
        b.tick();
    }
    assert_eq!(b.tick(), MotorCommand::new(-30, -30));
    // back, turn, advance: one tick each
    b.tick();
    b.tick();
    assert!(b.controller.in_maneuver());
    b.tick();
    assert!(!b.controller.in_maneuver());

    // Wall never left the frame; the escape does not fire again right away
    for _ in 0..5 {
        assert_eq!(b.tick(), MotorCommand::new(45, 45));
        assert!(!b.controller.in_maneuver());
    }
}

#[test]
fn huge_settle_time_does_not_panic() {
    let mut config = ControlConfig::default();
    config.mission.capture_settle = Duration::MAX;
    let mut b = Bench::with_config(config);
    b.see(PerceptionFrame {
        ball_distance: 130,
        ..Default::default()
    });

    assert_eq!(b.tick(), MotorCommand::STOP);
    b.rig.range.set_cm(8.0);
    b.advance(Duration::from_secs(3600));
    assert_eq!(b.tick(), MotorCommand::STOP);
    assert!(b.controller.in_maneuver());
}
