// 10 Hz control loop on the zenoh bus
//
// Each tick: drain every inbound topic (non-blocking, latest value wins),
// step the mission controller, publish the staged actuation and the mission
// status. Collaborator input is advisory; a malformed payload is logged and
// dropped, it never stops the loop.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::config::{
    ControlConfig, LOOP_HZ, PERCEPTION_TIMEOUT, TOPIC_GUIDE, TOPIC_PERCEPTION, TOPIC_RANGE,
    TOPIC_RESTART, TOPIC_RT_GRIPPER, TOPIC_RT_WHEELS, TOPIC_STATUS,
};
use crate::control::MissionController;
use crate::hardware::bridge::ActuationBridge;
use crate::messages::{
    GuidanceRecord, MissionStatus, PerceptionFrame, RuntimeHealth, WheelActuation,
};
use crate::state::{PerceptionWriter, RestartHandshake, SharedRobotState};

pub struct RunOptions {
    pub config: ControlConfig,
    /// Compute and log actuation without publishing it to the drivers
    pub dry_run: bool,
}

/// Applies collaborator payloads to the shared state and tracks perception
/// freshness
pub struct Inputs {
    perception: PerceptionWriter,
    handshake: RestartHandshake,
    guidance: watch::Sender<GuidanceRecord>,
    bridge: ActuationBridge,
    frame_received_at: Option<Instant>,
    health: RuntimeHealth,
}

impl Inputs {
    pub fn new(
        perception: PerceptionWriter,
        handshake: RestartHandshake,
        guidance: watch::Sender<GuidanceRecord>,
        bridge: ActuationBridge,
    ) -> Self {
        Self {
            perception,
            handshake,
            guidance,
            bridge,
            frame_received_at: None,
            health: RuntimeHealth::PerceptionStale, // Stale until the first frame
        }
    }

    pub fn on_perception(&mut self, payload: &[u8], now: Instant) {
        match serde_json::from_slice::<PerceptionFrame>(payload) {
            Ok(frame) => {
                self.perception.publish(&frame);
                self.frame_received_at = Some(now);
            }
            Err(e) => warn!("Failed to parse perception frame: {}", e),
        }
    }

    pub fn on_range(&self, payload: &[u8]) {
        match serde_json::from_slice::<Option<f32>>(payload) {
            Ok(cm) => self.bridge.set_range(cm),
            Err(e) => warn!("Failed to parse range reading: {}", e),
        }
    }

    /// A malformed record counts as "no guidance"
    pub fn on_guidance(&self, payload: &[u8]) {
        let record = match serde_json::from_slice::<GuidanceRecord>(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to parse guidance record: {}", e);
                GuidanceRecord::none()
            }
        };
        self.guidance.send_replace(record);
    }

    pub fn on_restart(&self) {
        if self.handshake.release() {
            info!("Restart handshake released");
        } else {
            debug!("Restart release received while not waiting");
        }
    }

    /// Perception watchdog
    pub fn health(&mut self, now: Instant) -> RuntimeHealth {
        let fresh = self
            .frame_received_at
            .is_some_and(|t| now.saturating_duration_since(t) <= PERCEPTION_TIMEOUT);
        let health = if fresh {
            RuntimeHealth::Ok
        } else {
            RuntimeHealth::PerceptionStale
        };
        if health == RuntimeHealth::PerceptionStale && self.health == RuntimeHealth::Ok {
            warn!(
                "No perception frame for {:?}, steering on stale data",
                PERCEPTION_TIMEOUT
            );
        }
        self.health = health;
        health
    }
}

pub async fn run(options: RunOptions) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_perception = session.declare_subscriber(TOPIC_PERCEPTION).await?;
    let sub_range = session.declare_subscriber(TOPIC_RANGE).await?;
    let sub_guide = session.declare_subscriber(TOPIC_GUIDE).await?;
    let sub_restart = session.declare_subscriber(TOPIC_RESTART).await?;
    let pub_wheels = session.declare_publisher(TOPIC_RT_WHEELS).await?;
    let pub_gripper = session.declare_publisher(TOPIC_RT_GRIPPER).await?;
    let pub_status = session.declare_publisher(TOPIC_STATUS).await?;

    let state = SharedRobotState::new();
    let bridge = ActuationBridge::new();
    let (guide_tx, guide_rx) = watch::channel(GuidanceRecord::none());
    let mut inputs = Inputs::new(
        PerceptionWriter::new(state.clone()),
        RestartHandshake::new(state.clone()),
        guide_tx,
        bridge.clone(),
    );
    let mut controller = MissionController::new(
        options.config,
        state.clone(),
        guide_rx,
        bridge.hardware(),
        Instant::now(),
    );

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Runtime started: {}Hz loop, dry run: {}", LOOP_HZ, options.dry_run);
    info!(
        "Subscribed to: {}, {}, {}, {}",
        TOPIC_PERCEPTION, TOPIC_RANGE, TOPIC_GUIDE, TOPIC_RESTART
    );
    info!(
        "Publishing to: {}, {}, {}",
        TOPIC_RT_WHEELS, TOPIC_RT_GRIPPER, TOPIC_STATUS
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down, stopping wheels");
                let stop = serde_json::to_string(&WheelActuation::default())?;
                pub_wheels.put(stop).await?;
                return Ok(());
            }
        }

        // 1. Drain all pending inputs (non-blocking), keep latest
        let now = Instant::now();
        while let Ok(Some(sample)) = sub_perception.try_recv() {
            inputs.on_perception(&sample.payload().to_bytes(), now);
        }
        while let Ok(Some(sample)) = sub_range.try_recv() {
            inputs.on_range(&sample.payload().to_bytes());
        }
        while let Ok(Some(sample)) = sub_guide.try_recv() {
            inputs.on_guidance(&sample.payload().to_bytes());
        }
        while let Ok(Some(_)) = sub_restart.try_recv() {
            inputs.on_restart();
        }
        let health = inputs.health(now);

        // 2. Step the controller
        controller.tick(now);
        let actuation = bridge.take_or_stop();

        // 3. Publish actuation
        if options.dry_run {
            debug!("Dry run actuation: {:?}", actuation);
        } else {
            let wheels_json = serde_json::to_string(&actuation.wheels)?;
            if let Err(e) = pub_wheels.put(wheels_json).await {
                warn!("Failed to publish wheel actuation: {}", e);
            }
            if let Some(gripper) = actuation.gripper {
                let gripper_json = serde_json::to_string(&gripper)?;
                if let Err(e) = pub_gripper.put(gripper_json).await {
                    warn!("Failed to publish gripper command: {}", e);
                }
            }
        }

        // 4. Publish status (mission phase, audio cue, handshake)
        let status = MissionStatus {
            mission: controller.mission(),
            chase_mode: controller.chase_mode(),
            sound_phase: state.sound_phase(),
            preparing_restart: state.preparing_restart(),
            health,
            wheels: actuation.wheels,
        };
        let status_json = serde_json::to_string(&status)?;
        if let Err(e) = pub_status.put(status_json).await {
            warn!("Failed to publish status: {}", e);
        }
    }
}
