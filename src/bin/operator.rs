// Operator console: A/D rotate guidance heading, H hold, C clear guidance,
// R release restart, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use ballbot_runtime::config::{TOPIC_GUIDE, TOPIC_RESTART};
use ballbot_runtime::messages::{GuidanceRecord, NO_GUIDANCE};

const HEADING_STEP: i32 = 15; // deg per key press
const REPUBLISH_INTERVAL: Duration = Duration::from_secs(1); // late subscribers still get the record

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let pub_guide = session.declare_publisher(TOPIC_GUIDE).await?;
    let pub_restart = session.declare_publisher(TOPIC_RESTART).await?;

    info!("Controls: A/D=heading, H=hold, C=clear, R=release restart, Q=quit");

    enable_raw_mode()?;
    let result = run_console(&pub_guide, &pub_restart).await;
    disable_raw_mode()?;

    result
}

async fn run_console(
    pub_guide: &zenoh::pubsub::Publisher<'_>,
    pub_restart: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut record = GuidanceRecord::none();
    let mut last_publish = Instant::now();
    let mut dirty = true;

    loop {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    KeyCode::Char('a') if pressed => {
                        record.heading_degrees = rotate(record.heading_degrees, -HEADING_STEP);
                        dirty = true;
                    }
                    KeyCode::Char('d') if pressed => {
                        record.heading_degrees = rotate(record.heading_degrees, HEADING_STEP);
                        dirty = true;
                    }
                    KeyCode::Char('h') if pressed => {
                        record.hold = !record.hold;
                        dirty = true;
                    }
                    KeyCode::Char('c') if pressed => {
                        record = GuidanceRecord::none();
                        dirty = true;
                    }
                    KeyCode::Char('r') if pressed => {
                        info!("Releasing restart");
                        pub_restart.put("release").await?;
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        if dirty || last_publish.elapsed() > REPUBLISH_INTERVAL {
            if dirty {
                print_record(&record);
            }
            pub_guide.put(serde_json::to_string(&record)?).await?;
            last_publish = Instant::now();
            dirty = false;
        }
    }

    Ok(())
}

// Headings live in (-180, 180]; starting from "no guidance" means straight ahead
fn rotate(heading: i32, step: i32) -> i32 {
    let base = if heading == NO_GUIDANCE { 0 } else { heading };
    let wrapped = (base + step).rem_euclid(360);
    if wrapped > 180 { wrapped - 360 } else { wrapped }
}

fn print_record(record: &GuidanceRecord) {
    if record.heading_degrees == NO_GUIDANCE {
        info!("Guidance: none");
    } else {
        info!(
            "Guidance: {} deg{}",
            record.heading_degrees,
            if record.hold { " (hold)" } else { "" }
        );
    }
}
