use std::{future::Future, time::Duration};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use stove_common::{
    anomaly, Anomaly, ApplianceStatus, ControlState, CycleError, Device, EngineAction,
    HistoryRecord, RecentMetricsStats, RuntimeConfig, Sample, ThermostatEngine, TrendConfig,
};

use crate::adapters::{Appliance, HistoryStore, TemperatureSensor};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CycleReport {
    Idle {
        date: DateTime<Utc>,
        status: ApplianceStatus,
        actions: Vec<EngineAction>,
    },
    Regulated {
        record: HistoryRecord,
        anomalies: Vec<Anomaly>,
    },
}

pub struct CycleRunner<A, S, H> {
    appliance: A,
    sensor: S,
    history: H,
    engine: ThermostatEngine,
    trend: TrendConfig,
    temperature_offset_c: f32,
    io_timeout: Duration,
}

impl<A, S, H> CycleRunner<A, S, H>
where
    A: Appliance,
    S: TemperatureSensor,
    H: HistoryStore,
{
    pub fn new(appliance: A, sensor: S, history: H, config: &RuntimeConfig) -> Self {
        Self {
            appliance,
            sensor,
            history,
            engine: ThermostatEngine::new(config.control.clone()),
            trend: config.trend.clone(),
            temperature_offset_c: config.sensor.temperature_offset_c,
            io_timeout: Duration::from_millis(config.cadence.io_timeout_ms),
        }
    }

    // `state` is only replaced once every command went out.
    pub async fn run_once(
        &self,
        state: &mut ControlState,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, CycleError> {
        let (summary, reading) = tokio::join!(
            self.bounded(Device::Appliance, self.appliance.get_summary()),
            self.bounded(Device::Sensor, self.sensor.read()),
        );
        let summary = summary?;

        if !summary.is_running() {
            if let Err(err) = &reading {
                debug!(
                    "ignoring sensor failure while appliance is {}: {err}",
                    summary.status.as_str()
                );
            }
            let mut next = *state;
            let actions = self.engine.idle(&mut next, &summary);
            self.apply(&actions).await?;
            *state = next;

            return Ok(CycleReport::Idle {
                date: now,
                status: summary.status,
                actions,
            });
        }

        let reading = reading?;
        let measured = reading.temperature + self.temperature_offset_c;
        let sample = Sample {
            date: now,
            measured_room_temperature: measured,
            temperature_sensor_battery: Some(reading.battery_level),
            appliance_summary: summary.clone(),
        };
        let stats = self.recent_metrics_stats(&sample).await?;

        let mut next = *state;
        let decision = self
            .engine
            .regulate(&mut next, &summary, measured, stats.as_ref());
        self.apply(&decision.actions()).await?;
        *state = next;

        let anomalies = anomaly::detect(&summary, measured, &decision, stats.as_ref());
        let record = decision.into_record(sample, stats);

        match serde_json::to_string(&record) {
            Ok(json) => info!(history = %json, "cycle complete"),
            Err(err) => warn!("history serialization failed: {err}"),
        }
        if let Err(err) = self.bounded(Device::History, self.history.insert(&record)).await {
            warn!("history insert failed, commands already applied: {err}");
        }
        for alert in &anomalies {
            warn!(
                measured,
                configured_power = summary.configured_power,
                "{}",
                alert.as_str()
            );
        }

        Ok(CycleReport::Regulated { record, anomalies })
    }

    async fn recent_metrics_stats(
        &self,
        current: &Sample,
    ) -> Result<Option<RecentMetricsStats>, CycleError> {
        let since = current.date - chrono::Duration::minutes(i64::from(self.trend.window_minutes));
        let mut samples: Vec<Sample> = self
            .bounded(Device::History, self.history.find_since(since))
            .await?
            .into_iter()
            .map(|record| record.sample)
            .filter(|sample| sample.appliance_summary.is_running())
            .collect();
        samples.push(current.clone());

        if let Some(first) = samples.first() {
            debug!(
                samples = samples.len(),
                minutes = (current.date - first.date).num_minutes(),
                "analyzing recent metrics"
            );
        }

        Ok(RecentMetricsStats::assemble(&samples, &self.trend))
    }

    async fn apply(&self, actions: &[EngineAction]) -> Result<(), CycleError> {
        for action in actions {
            info!("engine action: {action:?}");
            match *action {
                EngineAction::ConfigurePower(power) => {
                    self.bounded(Device::Appliance, self.appliance.configure_power(power))
                        .await?
                }
                EngineAction::ConfigureConvectorSpeedModifier(pct) => {
                    self.bounded(
                        Device::Appliance,
                        self.appliance.configure_convector_speed_modifier(pct),
                    )
                    .await?
                }
            }
        }
        Ok(())
    }

    async fn bounded<T>(
        &self,
        device: Device,
        operation: impl Future<Output = Result<T, CycleError>>,
    ) -> Result<T, CycleError> {
        match tokio::time::timeout(self.io_timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(CycleError::Timeout {
                device,
                after_ms: u64::try_from(self.io_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}
