// Error types for the runtime

/// Failures at the driver boundary (wheels, gripper servo, range sensor)
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("Device {device} unavailable: {reason}")]
    Unavailable { device: &'static str, reason: String },

    #[error("Power {power} out of range for {device}")]
    OutOfRange { device: &'static str, power: i32 },

    #[error("Actuation buffer poisoned")]
    Poisoned,
}

/// Failures loading controller configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
