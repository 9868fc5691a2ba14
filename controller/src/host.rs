use std::{
    io::ErrorKind,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use rumqttc::{AsyncClient, MqttOptions};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{error, info, warn};

use stove_common::{Cadence, ControlState, CycleError, RuntimeConfig};

use crate::{
    adapters::{Appliance, HistoryStore, TemperatureSensor},
    cycle::{CycleReport, CycleRunner},
    history::JsonlHistoryStore,
    mqtt::MqttLink,
};

#[derive(Clone)]
struct AppState {
    last_report: Arc<Mutex<Option<CycleReport>>>,
    history: JsonlHistoryStore,
    history_window_minutes: u32,
}

#[derive(Clone)]
struct AppStore {
    data_dir: Arc<PathBuf>,
    runtime_path: Arc<PathBuf>,
    state_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    minutes: Option<u32>,
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    runtime.sanitize();

    let cadence =
        Cadence::parse(runtime.cadence.times.as_slice()).context("invalid cadence times")?;

    let mut control_state = store.load_control_state().await.unwrap_or_else(|err| {
        warn!("failed to load control state from store: {err:#}");
        ControlState::default()
    });
    info!(
        ideal_power = ?control_state.ideal_power(),
        intervals = ?cadence.intervals(),
        "regulator starting"
    );

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or(runtime.network.mqtt_host.clone());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.network.mqtt_port);

    let mut mqtt_options = MqttOptions::new("stove-controller-rust", mqtt_host, mqtt_port);
    let mqtt_user = std::env::var("MQTT_USER").unwrap_or(runtime.network.mqtt_user.clone());
    let mqtt_pass = std::env::var("MQTT_PASS").unwrap_or(runtime.network.mqtt_pass.clone());
    if !mqtt_user.is_empty() {
        mqtt_options.set_credentials(mqtt_user, mqtt_pass);
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);
    let link = MqttLink::new(mqtt, runtime.sensor.stale_timeout_ms);
    link.subscribe().await?;
    link.spawn_event_loop(eventloop);

    let history = JsonlHistoryStore::new(store.data_dir().join("history.jsonl"));
    let app_state = AppState {
        last_report: Arc::new(Mutex::new(None)),
        history: history.clone(),
        history_window_minutes: runtime.trend.window_minutes,
    };
    let runner = CycleRunner::new(link.clone(), link.clone(), history, &runtime);

    spawn_http_server(app_state.clone()).await?;

    tokio::select! {
        _ = control_loop(&runner, &cadence, &mut control_state, &app_state, &link) => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!("failed to listen for shutdown signal: {err}");
            }
            info!("shutting down");
        }
    }

    store
        .save_control_state(&control_state)
        .await
        .context("failed to save control state")?;
    Ok(())
}

async fn spawn_http_server(app_state: AppState) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/history", get(handle_get_history))
        .with_state(app_state);

    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!("http server stopped: {err}");
        }
    });
    Ok(())
}

// Cycles never overlap: the next delay is computed once the previous one returned.
async fn control_loop<A, S, H>(
    runner: &CycleRunner<A, S, H>,
    cadence: &Cadence,
    state: &mut ControlState,
    app_state: &AppState,
    link: &MqttLink,
) where
    A: Appliance,
    S: TemperatureSensor,
    H: HistoryStore,
{
    let start_ms = monotonic_ms();
    loop {
        let delay_ms = cadence.next_delay_ms(monotonic_ms().saturating_sub(start_ms));
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        match runner.run_once(state, Utc::now()).await {
            Ok(report) => {
                link.publish_report(&report).await;
                *app_state.last_report.lock().await = Some(report);
            }
            Err(err) => on_error(&err),
        }
    }
}

fn on_error(err: &CycleError) {
    error!("control cycle failed: {err}");
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.last_report.lock().await.clone();
    Json(report)
}

async fn handle_get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> axum::response::Response {
    let minutes = query.minutes.unwrap_or(state.history_window_minutes);
    let since = Utc::now() - chrono::Duration::minutes(i64::from(minutes));

    match state.history.find_since(since).await {
        Ok(records) => Json(records).into_response(),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
    }
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("STOVE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.stove"));
        Self::in_dir(data_dir)
    }

    fn in_dir(data_dir: PathBuf) -> Self {
        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
            state_path: Arc::new(data_dir.join("state.json")),
            data_dir: Arc::new(data_dir),
            lock: Arc::new(Mutex::new(())),
        }
    }

    fn data_dir(&self) -> &Path {
        self.data_dir.as_path()
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.runtime_path.as_path()).await {
            Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_control_state(&self) -> anyhow::Result<ControlState> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.state_path.as_path()).await {
            Ok(raw) => Ok(serde_json::from_slice::<ControlState>(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(ControlState::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save_control_state(&self, state: &ControlState) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;
        let path = self.state_path.to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(path, payload).await?;
        Ok(())
    }
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_files_load_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = AppStore::in_dir(temp_dir.path().to_path_buf());

        assert_eq!(
            store.load_runtime_config().await.unwrap(),
            RuntimeConfig::default()
        );
        assert_eq!(
            store.load_control_state().await.unwrap(),
            ControlState::default()
        );
    }

    #[tokio::test]
    async fn control_state_survives_restart() {
        let temp_dir = TempDir::new().unwrap();
        let store = AppStore::in_dir(temp_dir.path().join("data"));
        let state: ControlState = serde_json::from_str(r#"{"idealPower": 4}"#).unwrap();

        store.save_control_state(&state).await.unwrap();
        let reloaded = AppStore::in_dir(temp_dir.path().join("data"))
            .load_control_state()
            .await
            .unwrap();

        assert_eq!(reloaded.ideal_power(), Some(4));
    }

    #[tokio::test]
    async fn corrupt_runtime_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = AppStore::in_dir(temp_dir.path().to_path_buf());
        tokio::fs::write(temp_dir.path().join("runtime.json"), b"{ nope")
            .await
            .unwrap();

        assert!(store.load_runtime_config().await.is_err());
    }
}
