use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, QoS};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use stove_common::{
    ApplianceSummary, CycleError, Device, SensorReading, TOPIC_APPLIANCE_SUMMARY,
    TOPIC_CMD_CONVECTOR, TOPIC_CMD_POWER, TOPIC_CONTROLLER_STATE, TOPIC_SENSOR_READING,
};

use crate::{
    adapters::{Appliance, TemperatureSensor},
    cycle::CycleReport,
};

const MAX_MQTT_PAYLOAD_BYTES: usize = 1024;

#[derive(Debug, Default)]
struct Latest {
    summary: Option<(ApplianceSummary, Instant)>,
    reading: Option<(SensorReading, Instant)>,
}

// Keeps the last published value of each device while it is fresher than
// `stale_after`.
#[derive(Clone)]
pub struct MqttLink {
    client: AsyncClient,
    latest: Arc<Mutex<Latest>>,
    stale_after: Duration,
}

impl MqttLink {
    pub fn new(client: AsyncClient, stale_timeout_ms: u64) -> Self {
        Self {
            client,
            latest: Arc::new(Mutex::new(Latest::default())),
            stale_after: Duration::from_millis(stale_timeout_ms),
        }
    }

    pub async fn subscribe(&self) -> anyhow::Result<()> {
        for topic in [TOPIC_APPLIANCE_SUMMARY, TOPIC_SENSOR_READING] {
            self.client.subscribe(topic, QoS::AtMostOnce).await?;
        }
        Ok(())
    }

    pub fn spawn_event_loop(&self, mut eventloop: EventLoop) {
        let link = self.clone();
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::Publish(message))) => {
                        if let Err(err) = link.handle_message(&message.topic, &message.payload).await
                        {
                            warn!("mqtt message handling error: {err:#}");
                        }
                    }
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        info!("mqtt connected");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!("mqtt poll error: {err}");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
    }

    async fn handle_message(&self, topic: &str, payload: &[u8]) -> anyhow::Result<()> {
        if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
            warn!(
                "dropping oversized MQTT payload on topic {} ({} bytes)",
                topic,
                payload.len()
            );
            return Ok(());
        }

        match topic {
            TOPIC_APPLIANCE_SUMMARY => {
                let summary: ApplianceSummary = serde_json::from_slice(payload)?;
                debug!(?summary, "appliance summary received");
                self.latest.lock().await.summary = Some((summary, Instant::now()));
            }
            TOPIC_SENSOR_READING => {
                let reading: SensorReading = serde_json::from_slice(payload)?;
                debug!(?reading, "sensor reading received");
                self.latest.lock().await.reading = Some((reading, Instant::now()));
            }
            _ => {}
        }
        Ok(())
    }

    pub async fn publish_report(&self, report: &CycleReport) {
        match serde_json::to_vec(report) {
            Ok(body) => {
                if let Err(err) = self
                    .client
                    .publish(TOPIC_CONTROLLER_STATE, QoS::AtLeastOnce, true, body)
                    .await
                {
                    warn!("controller state publish failed: {err}");
                }
            }
            Err(err) => warn!("controller state serialization failed: {err}"),
        }
    }

    fn fresh<T: Clone>(
        &self,
        entry: &Option<(T, Instant)>,
        device: Device,
    ) -> Result<T, CycleError> {
        match entry {
            Some((value, received)) if received.elapsed() < self.stale_after => Ok(value.clone()),
            Some((_, received)) => Err(CycleError::communication(
                device,
                format!("last update {}s ago", received.elapsed().as_secs()),
            )),
            None => Err(CycleError::communication(device, "no update received yet")),
        }
    }

    async fn send_command(&self, topic: &str, payload: String) -> Result<(), CycleError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|err| CycleError::communication(Device::Appliance, err.to_string()))
    }
}

#[async_trait]
impl Appliance for MqttLink {
    async fn get_summary(&self) -> Result<ApplianceSummary, CycleError> {
        let latest = self.latest.lock().await;
        self.fresh(&latest.summary, Device::Appliance)
    }

    async fn configure_power(&self, power: u8) -> Result<(), CycleError> {
        self.send_command(TOPIC_CMD_POWER, power.to_string()).await
    }

    async fn configure_convector_speed_modifier(&self, pct: i8) -> Result<(), CycleError> {
        self.send_command(TOPIC_CMD_CONVECTOR, pct.to_string()).await
    }
}

#[async_trait]
impl TemperatureSensor for MqttLink {
    async fn read(&self) -> Result<SensorReading, CycleError> {
        let latest = self.latest.lock().await;
        self.fresh(&latest.reading, Device::Sensor)
    }
}
