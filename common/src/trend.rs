use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    config::{TrendConfig, TrendThresholds},
    types::Sample,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Stable,
    Increase,
    Decrease,
    Instable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Increase => "increase",
            Self::Decrease => "decrease",
            Self::Instable => "instable",
        }
    }
}

// Steps that both rise and fall make the series instable, whatever its drift.
pub fn trend(values: &[f32], stability_threshold: f32, trend_threshold: f32) -> Option<Trend> {
    let (first, last) = match values {
        [first, .., last] => (*first, *last),
        _ => return None,
    };

    let mut rises = false;
    let mut falls = false;
    for step in values.windows(2) {
        let delta = step[1] - step[0];
        if delta.abs() <= stability_threshold {
            continue;
        }
        if delta > 0.0 {
            rises = true;
        } else {
            falls = true;
        }
    }

    if rises && falls {
        return Some(Trend::Instable);
    }

    let diff = last - first;
    if diff.abs() <= trend_threshold {
        Some(Trend::Stable)
    } else if diff < 0.0 {
        Some(Trend::Decrease)
    } else {
        Some(Trend::Increase)
    }
}

fn trend_with(values: &[f32], thresholds: TrendThresholds) -> Option<Trend> {
    trend(values, thresholds.stability, thresholds.trend)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentMetricsStats {
    #[serde(rename = "measuredTemperatureTrend")]
    pub measured_temperature_trend: Trend,
    #[serde(rename = "configuredPowerTrend")]
    pub configured_power_trend: Trend,
    #[serde(rename = "burnTemperatureTrend")]
    pub burn_temperature_trend: Trend,
}

impl RecentMetricsStats {
    pub fn assemble(samples: &[Sample], config: &TrendConfig) -> Option<Self> {
        let (first, last) = match samples {
            [first, .., last] => (first, last),
            _ => return None,
        };

        let span = last.date - first.date;
        if span < Duration::minutes(i64::from(config.min_span_minutes)) {
            return None;
        }

        let measured: Vec<f32> = samples
            .iter()
            .map(|sample| sample.measured_room_temperature)
            .collect();
        let power: Vec<f32> = samples
            .iter()
            .map(|sample| f32::from(sample.appliance_summary.configured_power))
            .collect();
        let burn: Vec<f32> = samples
            .iter()
            .map(|sample| sample.appliance_summary.burn_temperature)
            .collect();

        Some(Self {
            measured_temperature_trend: trend_with(&measured, config.measured_temperature)?,
            configured_power_trend: trend_with(&power, config.configured_power)?,
            burn_temperature_trend: trend_with(&burn, config.burn_temperature)?,
        })
    }

    pub fn all_in(&self, accepted: &[Trend]) -> bool {
        [
            self.measured_temperature_trend,
            self.configured_power_trend,
            self.burn_temperature_trend,
        ]
        .iter()
        .all(|trend| accepted.contains(trend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApplianceStatus, ApplianceSummary};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sample(minute: i64, measured: f32, power: u8, burn: f32) -> Sample {
        Sample {
            date: Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap() + Duration::minutes(minute),
            measured_room_temperature: measured,
            temperature_sensor_battery: Some(90.0),
            appliance_summary: ApplianceSummary {
                status: ApplianceStatus::Running,
                configured_power: power,
                configured_temperature: 20.0,
                burn_temperature: burn,
                configured_convector_speed_modifier_pct: 0,
            },
        }
    }

    #[test]
    fn fewer_than_two_values_has_no_trend() {
        assert_eq!(trend(&[], 0.1, 0.1), None);
        assert_eq!(trend(&[20.0], 0.1, 0.1), None);
    }

    #[test]
    fn oscillation_overrides_overall_drift() {
        // Net drift of +2.0 would otherwise be an increase.
        assert_eq!(
            trend(&[18.0, 19.0, 18.5, 20.0], 0.1, 0.1),
            Some(Trend::Instable)
        );
    }

    #[test]
    fn small_steps_are_ignored_for_oscillation() {
        assert_eq!(
            trend(&[18.0, 18.5, 18.45, 19.0], 0.1, 0.1),
            Some(Trend::Increase)
        );
    }

    #[test]
    fn drift_within_trend_threshold_is_stable() {
        assert_eq!(trend(&[300.0, 310.0, 325.0], 30.0, 30.0), Some(Trend::Stable));
        assert_eq!(trend(&[20.0, 20.0, 20.0], 0.1, 0.1), Some(Trend::Stable));
    }

    #[test]
    fn overall_fall_is_decrease() {
        assert_eq!(trend(&[21.0, 20.5, 20.0], 0.1, 0.1), Some(Trend::Decrease));
        assert_eq!(trend(&[3.0, 2.0], 0.0, 0.0), Some(Trend::Decrease));
    }

    #[test]
    fn zero_tolerance_flags_any_power_change() {
        assert_eq!(trend(&[3.0, 3.0, 4.0], 0.0, 0.0), Some(Trend::Increase));
        assert_eq!(trend(&[3.0, 4.0, 3.0], 0.0, 0.0), Some(Trend::Instable));
    }

    #[test]
    fn trend_is_deterministic() {
        let values = [19.0, 19.2, 19.1, 19.6];
        assert_eq!(trend(&values, 0.1, 0.1), trend(&values, 0.1, 0.1));
    }

    #[test]
    fn assemble_requires_minimum_span() {
        let config = TrendConfig::default();
        let samples = vec![sample(0, 20.0, 3, 300.0), sample(3, 20.5, 3, 300.0)];

        assert_eq!(RecentMetricsStats::assemble(&samples, &config), None);
        assert_eq!(RecentMetricsStats::assemble(&samples[..1], &config), None);
    }

    #[test]
    fn assemble_classifies_each_metric_independently() {
        let config = TrendConfig::default();
        let samples = vec![
            sample(0, 20.6, 3, 300.0),
            sample(5, 20.3, 3, 310.0),
            sample(10, 20.0, 3, 305.0),
            sample(12, 19.8, 3, 300.0),
        ];

        let stats = RecentMetricsStats::assemble(&samples, &config).unwrap();

        assert_eq!(
            stats,
            RecentMetricsStats {
                measured_temperature_trend: Trend::Decrease,
                configured_power_trend: Trend::Stable,
                burn_temperature_trend: Trend::Stable,
            }
        );
        assert!(stats.all_in(&[Trend::Stable, Trend::Decrease]));
        assert!(!stats.all_in(&[Trend::Stable, Trend::Increase]));
    }
}
