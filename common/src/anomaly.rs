use serde::Serialize;

use crate::{
    config::MIN_POWER,
    thermostat::Decision,
    trend::{RecentMetricsStats, Trend},
    types::ApplianceSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Anomaly {
    Overheat,
    Underheat,
}

impl Anomaly {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overheat => "Overheat",
            Self::Underheat => "Underheat",
        }
    }
}

pub fn detect(
    summary: &ApplianceSummary,
    measured: f32,
    decision: &Decision,
    stats: Option<&RecentMetricsStats>,
) -> Vec<Anomaly> {
    let Some(stats) = stats else {
        return Vec::new();
    };

    let mut anomalies = Vec::new();

    if summary.configured_power == MIN_POWER
        && measured > decision.range.max
        && stats.all_in(&[Trend::Stable, Trend::Increase])
    {
        anomalies.push(Anomaly::Overheat);
    }

    if summary.configured_power == decision.max_power
        && measured < decision.range.min
        && stats.all_in(&[Trend::Stable, Trend::Decrease])
    {
        anomalies.push(Anomaly::Underheat);
    }

    anomalies
}
