use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trend::RecentMetricsStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplianceStatus {
    Running,
    Stopped,
    #[serde(other)]
    Other,
}

impl ApplianceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplianceSummary {
    pub status: ApplianceStatus,
    #[serde(rename = "configuredPower")]
    pub configured_power: u8,
    #[serde(rename = "configuredTemperature")]
    pub configured_temperature: f32,
    #[serde(rename = "burnTemperature")]
    pub burn_temperature: f32,
    #[serde(rename = "configuredConvectorSpeedModifierPct")]
    pub configured_convector_speed_modifier_pct: i8,
}

impl ApplianceSummary {
    pub fn is_running(&self) -> bool {
        self.status == ApplianceStatus::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f32,
    #[serde(rename = "batteryLevel")]
    pub battery_level: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub date: DateTime<Utc>,
    #[serde(rename = "measuredRoomTemperature")]
    pub measured_room_temperature: f32,
    #[serde(rename = "temperatureSensorBattery", default)]
    pub temperature_sensor_battery: Option<f32>,
    #[serde(rename = "applianceSummary")]
    pub appliance_summary: ApplianceSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerChangeReason {
    #[serde(rename = "measuredTemp-too-high")]
    TooHigh,
    #[serde(rename = "measuredTemp-too-low")]
    TooLow,
    #[serde(rename = "measuredTemp-normal-apply-idealPower")]
    ApplyIdealPower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdealPowerChangeReason {
    #[serde(rename = "measuredTemp-too-high-decrease-idealPower")]
    TooHighDecrease,
    #[serde(rename = "measuredTemp-too-low-increase-idealPower")]
    TooLowIncrease,
    #[serde(rename = "measuredTemp-increases")]
    TemperatureIncreases,
    #[serde(rename = "measuredTemp-decreases")]
    TemperatureDecreases,
    #[serde(rename = "maxPower-lowered-decrease-idealPower")]
    MaxPowerLowered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvectorReason {
    Peace,
    Gogogo,
    Normal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub sample: Sample,
    #[serde(rename = "previousIdealPower")]
    pub previous_ideal_power: u8,
    #[serde(rename = "computedIdealPower")]
    pub computed_ideal_power: u8,
    #[serde(rename = "maxPower")]
    pub max_power: u8,
    #[serde(rename = "appliedConfiguredPower")]
    pub applied_configured_power: Option<u8>,
    #[serde(rename = "appliedConfiguredPowerChangeReason")]
    pub applied_configured_power_change_reason: Option<PowerChangeReason>,
    #[serde(rename = "idealPowerComputeChangeReason")]
    pub ideal_power_compute_change_reason: Option<IdealPowerChangeReason>,
    #[serde(rename = "appliedConvectorSpeedModifier")]
    pub applied_convector_speed_modifier: Option<i8>,
    #[serde(rename = "convectorSpeedModifierChangeReason")]
    pub convector_speed_modifier_change_reason: Option<ConvectorReason>,
    #[serde(rename = "recentMetricsStats", default)]
    pub recent_metrics_stats: Option<RecentMetricsStats>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unknown_status_maps_to_other() {
        let raw = r#"{
            "status": "igniting",
            "configuredPower": 2,
            "configuredTemperature": 20.0,
            "burnTemperature": 310.0,
            "configuredConvectorSpeedModifierPct": -15
        }"#;

        let summary: ApplianceSummary = serde_json::from_str(raw).unwrap();

        assert_eq!(summary.status, ApplianceStatus::Other);
        assert!(!summary.is_running());
        assert_eq!(summary.configured_convector_speed_modifier_pct, -15);
    }

    #[test]
    fn reasons_serialize_to_wire_labels() {
        assert_eq!(
            serde_json::to_string(&IdealPowerChangeReason::TooHighDecrease).unwrap(),
            "\"measuredTemp-too-high-decrease-idealPower\""
        );
        assert_eq!(
            serde_json::to_string(&PowerChangeReason::ApplyIdealPower).unwrap(),
            "\"measuredTemp-normal-apply-idealPower\""
        );
        assert_eq!(
            serde_json::to_string(&ConvectorReason::Gogogo).unwrap(),
            "\"gogogo\""
        );
    }
}
