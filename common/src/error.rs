use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Sensor,
    Appliance,
    History,
}

impl Device {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "temperature sensor",
            Self::Appliance => "appliance",
            Self::History => "history store",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("{device} unreachable: {message}")]
    Communication { device: Device, message: String },
    #[error("{device} did not answer within {after_ms} ms")]
    Timeout { device: Device, after_ms: u64 },
    #[error("history persistence failed: {0}")]
    Persistence(String),
}

impl CycleError {
    pub fn communication(device: Device, message: impl Into<String>) -> Self {
        Self::Communication {
            device,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CadenceError {
    #[error("cadence needs at least one duration")]
    Empty,
    #[error("invalid ISO-8601 duration {0:?}")]
    InvalidDuration(String),
    #[error("duration {0:?} must be longer than zero")]
    ZeroDuration(String),
}
