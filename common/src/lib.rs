pub mod anomaly;
pub mod cadence;
pub mod config;
pub mod error;
pub mod thermostat;
pub mod topics;
pub mod trend;
pub mod types;

pub use anomaly::Anomaly;
pub use cadence::Cadence;
pub use config::{RuntimeConfig, TrendConfig, MIN_POWER};
pub use error::{CadenceError, CycleError, Device};
pub use thermostat::{ControlState, Decision, EngineAction, TemperatureRange, ThermostatEngine};
pub use topics::*;
pub use trend::{trend, RecentMetricsStats, Trend};
pub use types::{ApplianceStatus, ApplianceSummary, HistoryRecord, Sample, SensorReading};
