use serde::{Deserialize, Serialize};

use crate::{
    config::{ControlConfig, MIN_POWER},
    trend::{RecentMetricsStats, Trend},
    types::{
        ApplianceSummary, ConvectorReason, HistoryRecord, IdealPowerChangeReason,
        PowerChangeReason, Sample,
    },
};

const NEUTRAL_CONVECTOR_PCT: i8 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    #[serde(rename = "idealPower")]
    ideal_power: Option<u8>,
}

impl ControlState {
    pub fn ideal_power(&self) -> Option<u8> {
        self.ideal_power
    }

    #[cfg(test)]
    fn with_ideal_power(ideal_power: u8) -> Self {
        Self {
            ideal_power: Some(ideal_power),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureRange {
    pub min: f32,
    pub ideal: f32,
    pub max: f32,
}

impl TemperatureRange {
    pub fn around(configured_temperature: f32, half_width: f32) -> Self {
        Self {
            min: configured_temperature - half_width,
            ideal: configured_temperature,
            max: configured_temperature + half_width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "command", content = "value", rename_all = "camelCase")]
pub enum EngineAction {
    ConfigurePower(u8),
    ConfigureConvectorSpeedModifier(i8),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub range: TemperatureRange,
    pub max_power: u8,
    pub previous_ideal_power: u8,
    pub computed_ideal_power: u8,
    pub applied_power: Option<u8>,
    pub power_reason: Option<PowerChangeReason>,
    pub ideal_power_reason: Option<IdealPowerChangeReason>,
    pub applied_convector_pct: Option<i8>,
    pub convector_reason: Option<ConvectorReason>,
}

impl Decision {
    pub fn actions(&self) -> Vec<EngineAction> {
        let mut actions = Vec::new();
        if let Some(power) = self.applied_power {
            actions.push(EngineAction::ConfigurePower(power));
        }
        if let Some(pct) = self.applied_convector_pct {
            actions.push(EngineAction::ConfigureConvectorSpeedModifier(pct));
        }
        actions
    }

    pub fn into_record(
        self,
        sample: Sample,
        recent_metrics_stats: Option<RecentMetricsStats>,
    ) -> HistoryRecord {
        HistoryRecord {
            sample,
            previous_ideal_power: self.previous_ideal_power,
            computed_ideal_power: self.computed_ideal_power,
            max_power: self.max_power,
            applied_configured_power: self.applied_power,
            applied_configured_power_change_reason: self.power_reason,
            ideal_power_compute_change_reason: self.ideal_power_reason,
            applied_convector_speed_modifier: self.applied_convector_pct,
            convector_speed_modifier_change_reason: self.convector_reason,
            recent_metrics_stats,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThermostatEngine {
    pub config: ControlConfig,
}

impl ThermostatEngine {
    pub fn new(mut config: ControlConfig) -> Self {
        config.sanitize();
        Self { config }
    }

    pub fn range(&self, summary: &ApplianceSummary) -> TemperatureRange {
        TemperatureRange::around(summary.configured_temperature, self.config.range_half_width_c)
    }

    pub fn max_power(&self, measured: f32, range: &TemperatureRange) -> u8 {
        if measured < range.min - self.config.boost_deficit_c {
            self.config.boost_max_power
        } else {
            self.config.normal_max_power
        }
    }

    pub fn idle(&self, state: &mut ControlState, summary: &ApplianceSummary) -> Vec<EngineAction> {
        state.ideal_power = Some(MIN_POWER);

        let mut actions = Vec::new();
        if summary.configured_power != MIN_POWER {
            actions.push(EngineAction::ConfigurePower(MIN_POWER));
        }
        if summary.configured_convector_speed_modifier_pct != NEUTRAL_CONVECTOR_PCT {
            actions.push(EngineAction::ConfigureConvectorSpeedModifier(
                NEUTRAL_CONVECTOR_PCT,
            ));
        }
        actions
    }

    pub fn regulate(
        &self,
        state: &mut ControlState,
        summary: &ApplianceSummary,
        measured: f32,
        stats: Option<&RecentMetricsStats>,
    ) -> Decision {
        let range = self.range(summary);
        let max_power = self.max_power(measured, &range);

        let previous_ideal_power = state.ideal_power.unwrap_or(MIN_POWER);
        let mut ideal = previous_ideal_power.clamp(MIN_POWER, max_power);

        let mut applied_power = None;
        let mut power_reason = None;
        let mut ideal_power_reason =
            (ideal < previous_ideal_power).then_some(IdealPowerChangeReason::MaxPowerLowered);

        if measured >= range.max {
            if summary.configured_power != MIN_POWER {
                if ideal > MIN_POWER {
                    ideal -= 1;
                    ideal_power_reason = Some(IdealPowerChangeReason::TooHighDecrease);
                }
                applied_power = Some(MIN_POWER);
                power_reason = Some(PowerChangeReason::TooHigh);
            }
        } else if measured < range.min {
            if summary.configured_power != max_power {
                if ideal < max_power {
                    ideal += 1;
                    ideal_power_reason = Some(IdealPowerChangeReason::TooLowIncrease);
                }
                applied_power = Some(max_power);
                power_reason = Some(PowerChangeReason::TooLow);
            }
        } else {
            if let Some(stats) = stats {
                if stats.burn_temperature_trend == Trend::Stable
                    && stats.configured_power_trend == Trend::Stable
                {
                    match stats.measured_temperature_trend {
                        Trend::Increase if ideal > MIN_POWER => {
                            ideal -= 1;
                            ideal_power_reason = Some(IdealPowerChangeReason::TemperatureIncreases);
                        }
                        Trend::Decrease if ideal < max_power => {
                            ideal += 1;
                            ideal_power_reason = Some(IdealPowerChangeReason::TemperatureDecreases);
                        }
                        _ => {}
                    }
                }
            }

            if summary.configured_power != ideal {
                applied_power = Some(ideal);
                power_reason = Some(PowerChangeReason::ApplyIdealPower);
            }
        }

        state.ideal_power = Some(ideal);

        let effective_power = applied_power.unwrap_or(summary.configured_power);
        let (convector_pct, reason) = if effective_power == MIN_POWER && measured >= range.ideal {
            (self.config.peace_convector_pct, ConvectorReason::Peace)
        } else if measured < range.min {
            (self.config.boost_convector_pct, ConvectorReason::Gogogo)
        } else {
            (NEUTRAL_CONVECTOR_PCT, ConvectorReason::Normal)
        };

        let (applied_convector_pct, convector_reason) =
            if convector_pct != summary.configured_convector_speed_modifier_pct {
                (Some(convector_pct), Some(reason))
            } else {
                (None, None)
            };

        Decision {
            range,
            max_power,
            previous_ideal_power,
            computed_ideal_power: ideal,
            applied_power,
            power_reason,
            ideal_power_reason,
            applied_convector_pct,
            convector_reason,
        }
    }
}
