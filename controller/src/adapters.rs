use async_trait::async_trait;
use chrono::{DateTime, Utc};

use stove_common::{ApplianceSummary, CycleError, HistoryRecord, SensorReading};

#[async_trait]
pub trait Appliance: Send + Sync {
    async fn get_summary(&self) -> Result<ApplianceSummary, CycleError>;

    async fn configure_power(&self, power: u8) -> Result<(), CycleError>;

    async fn configure_convector_speed_modifier(&self, pct: i8) -> Result<(), CycleError>;
}

#[async_trait]
pub trait TemperatureSensor: Send + Sync {
    async fn read(&self) -> Result<SensorReading, CycleError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert(&self, record: &HistoryRecord) -> Result<(), CycleError>;

    async fn find_since(&self, since: DateTime<Utc>) -> Result<Vec<HistoryRecord>, CycleError>;
}
