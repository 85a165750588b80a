use std::{
    collections::HashMap,
    io::ErrorKind,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{debug, info, warn};

use hvac_common::{
    EquipmentId, FanMode, HvacAction, HvacEngine, RuntimeConfig, SystemMode, COMMAND_TOPICS,
    TOPIC_CMD_COOL_SETPOINT, TOPIC_CMD_FAN, TOPIC_CMD_HEAT_SETPOINT, TOPIC_CMD_MODE,
    TOPIC_CONTROLLER_STATE, TOPIC_SENSOR_TEMP,
};

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<HvacEngine>>,
    mqtt: AsyncClient,
}

#[derive(Clone)]
struct AppStore {
    runtime_path: Arc<PathBuf>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;
const TEMPERATURE_RANGE_F: std::ops::RangeInclusive<f32> = -40.0..=150.0;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });

    let engine = HvacEngine::from_runtime(&runtime, monotonic_ms());
    info!(
        "hvac engine ready: mode {}, heat {:.1}F, cool {:.1}F, logic rate {} ms",
        engine.mode().label(),
        engine.heat_setpoint(),
        engine.cool_setpoint(),
        engine.config().logic_rate_ms
    );

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or(runtime.network.mqtt_host.clone());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.network.mqtt_port);

    let mut mqtt_options = MqttOptions::new("hvac-controller-rust", mqtt_host, mqtt_port);
    let mqtt_user = std::env::var("MQTT_USER").unwrap_or(runtime.network.mqtt_user.clone());
    let mqtt_pass = std::env::var("MQTT_PASS").unwrap_or(runtime.network.mqtt_pass.clone());
    if !mqtt_user.is_empty() {
        mqtt_options.set_credentials(mqtt_user, mqtt_pass);
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let app_state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        mqtt,
    };

    subscribe_topics(&app_state.mqtt).await?;
    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_control_loop(app_state.clone(), runtime.poll_interval_ms);
    spawn_state_publish_loop(app_state.clone(), runtime.state_publish_interval_ms);

    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/temperature", post(handle_set_temperature))
        .route("/api/mode", post(handle_set_mode))
        .route("/api/fan", post(handle_set_fan))
        .route("/api/setpoint/cool", post(handle_set_cool_setpoint))
        .route("/api/setpoint/heat", post(handle_set_heat_setpoint))
        .route("/api/equipment/{id}/available", post(handle_set_available))
        .route("/api/equipment/{id}/disabled", post(handle_set_disabled))
        .route("/api/runtime/reset", post(handle_reset_runtime))
        .with_state(app_state);

    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.network.http_port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn subscribe_topics(mqtt: &AsyncClient) -> anyhow::Result<()> {
    for topic in COMMAND_TOPICS {
        mqtt.subscribe(topic, QoS::AtMostOnce).await?;
    }
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_mqtt_message(&app_state, message.topic, message.payload.to_vec())
                            .await
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

fn spawn_control_loop(app_state: AppState, poll_interval_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(poll_interval_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let now_ms = monotonic_ms();

            let actions = {
                let mut engine = app_state.engine.lock().await;
                engine.poll(now_ms)
            };

            execute_actions(&actions);
        }
    });
}

fn spawn_state_publish_loop(app_state: AppState, publish_interval_ms: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(publish_interval_ms));
        loop {
            interval.tick().await;

            let payload = {
                let engine = app_state.engine.lock().await;
                serde_json::to_vec(&engine.state_payload())
            };

            match payload {
                Ok(body) => {
                    if let Err(err) = app_state
                        .mqtt
                        .publish(TOPIC_CONTROLLER_STATE, QoS::AtLeastOnce, true, body)
                        .await
                    {
                        warn!("controller state publish failed: {err}");
                    }
                }
                Err(err) => warn!("controller state serialization failed: {err}"),
            }
        }
    });
}

/// Hands engine actions to the outputs. On the host the outputs are the log.
fn execute_actions(actions: &[HvacAction]) {
    for action in actions {
        match *action {
            HvacAction::SetOutput { equipment, on } => {
                info!(
                    "output {} -> {}",
                    equipment.label(),
                    if on { "ON" } else { "OFF" }
                );
            }
            HvacAction::FanModeChanged { mode } => {
                info!("fan mode now {}", mode.label());
            }
            HvacAction::HardwareModeChanged { from, to } => {
                info!("hardware mode {} -> {}", from.label(), to.label());
            }
            HvacAction::NoValidTemperature => {
                debug!("no valid temperature reading; evaluation skipped");
            }
        }
    }
}

async fn handle_mqtt_message(
    app_state: &AppState,
    topic: String,
    payload: Vec<u8>,
) -> anyhow::Result<()> {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return Ok(());
    }

    let message = String::from_utf8(payload).context("non utf8 mqtt payload")?;
    let message = message.trim();

    match topic.as_str() {
        TOPIC_SENSOR_TEMP => {
            if let Some(temp) = parse_temperature(message) {
                app_state.engine.lock().await.set_temperature(temp);
            } else {
                warn!("dropping temperature reading {message:?}");
            }
        }
        TOPIC_CMD_MODE => {
            let mode = message.parse::<SystemMode>()?;
            app_state.engine.lock().await.set_mode(mode);
            info!("mode set to {} via mqtt", mode.label());
        }
        TOPIC_CMD_FAN => {
            let mode = message.parse::<FanMode>()?;
            app_state.engine.lock().await.set_fan_mode(mode);
        }
        TOPIC_CMD_COOL_SETPOINT => {
            let value = message.parse::<f32>().context("invalid cool setpoint")?;
            if !app_state.engine.lock().await.set_cool_setpoint(value) {
                warn!("rejected cool setpoint {value}");
            }
        }
        TOPIC_CMD_HEAT_SETPOINT => {
            let value = message.parse::<f32>().context("invalid heat setpoint")?;
            if !app_state.engine.lock().await.set_heat_setpoint(value) {
                warn!("rejected heat setpoint {value}");
            }
        }
        _ => {}
    }

    Ok(())
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let now_ms = monotonic_ms();
    let status = {
        let engine = state.engine.lock().await;
        engine.status(now_ms)
    };
    Json(status)
}

async fn handle_set_temperature(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let value = match value_param(&params) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let Some(temp) = parse_temperature(value) else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid temperature value");
    };

    state.engine.lock().await.set_temperature(temp);
    handle_get_status(State(state)).await.into_response()
}

async fn handle_set_mode(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let value = match value_param(&params) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let Ok(mode) = value.parse::<SystemMode>() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid mode. Use 'OFF', 'COOL', 'HEAT' or 'AUTO'",
        );
    };

    state.engine.lock().await.set_mode(mode);
    handle_get_status(State(state)).await.into_response()
}

async fn handle_set_fan(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let value = match value_param(&params) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let Ok(mode) = value.parse::<FanMode>() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid fan mode. Use 'AUTO', 'LOW', 'HIGH' or 'CIRCULATE'",
        );
    };

    state.engine.lock().await.set_fan_mode(mode);
    handle_get_status(State(state)).await.into_response()
}

async fn handle_set_cool_setpoint(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let value = match value_param(&params) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let Ok(setpoint) = value.parse::<f32>() else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid setpoint value");
    };

    if !state.engine.lock().await.set_cool_setpoint(setpoint) {
        return error_response(
            StatusCode::CONFLICT,
            "Cool setpoint must stay at least 2 degrees above the heat setpoint",
        );
    }
    handle_get_status(State(state)).await.into_response()
}

async fn handle_set_heat_setpoint(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let value = match value_param(&params) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let Ok(setpoint) = value.parse::<f32>() else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid setpoint value");
    };

    if !state.engine.lock().await.set_heat_setpoint(setpoint) {
        return error_response(
            StatusCode::CONFLICT,
            "Heat setpoint must stay at least 2 degrees below the cool setpoint",
        );
    }
    handle_get_status(State(state)).await.into_response()
}

async fn handle_set_available(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (id, available) = match equipment_flag(&id, &params) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let actions = {
        let mut engine = state.engine.lock().await;
        engine.set_available(id, available, monotonic_ms())
    };
    info!("{} available: {available}", id.label());
    execute_actions(&actions);
    handle_get_status(State(state)).await.into_response()
}

async fn handle_set_disabled(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let (id, disabled) = match equipment_flag(&id, &params) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };

    let actions = {
        let mut engine = state.engine.lock().await;
        engine.set_disabled(id, disabled, monotonic_ms())
    };
    info!("{} disabled: {disabled}", id.label());
    execute_actions(&actions);
    handle_get_status(State(state)).await.into_response()
}

async fn handle_reset_runtime(State(state): State<AppState>) -> Response {
    state.engine.lock().await.reset_run_times();
    info!("equipment run times reset");
    handle_get_status(State(state)).await.into_response()
}

impl AppStore {
    fn new() -> Self {
        let data_dir = std::env::var("HVAC_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.hvac"));

        Self {
            runtime_path: Arc::new(data_dir.join("runtime.json")),
        }
    }

    async fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        match tokio::fs::read(self.runtime_path.as_ref()).await {
            Ok(raw) => RuntimeConfig::from_slice(&raw)
                .with_context(|| format!("parsing {}", self.runtime_path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }
}

fn value_param(params: &HashMap<String, String>) -> Result<&str, Response> {
    params
        .get("value")
        .map(|value| value.trim())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter"))
}

fn equipment_flag(
    id: &str,
    params: &HashMap<String, String>,
) -> Result<(EquipmentId, bool), Response> {
    let id = id
        .parse::<EquipmentId>()
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Unknown equipment id"))?;
    let flag = parse_flag(value_param(params)?)
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "Use value=true or value=false"))?;
    Ok((id, flag))
}

fn parse_temperature(raw: &str) -> Option<f32> {
    raw.parse::<f32>()
        .ok()
        .filter(|temp| temp.is_finite() && TEMPERATURE_RANGE_F.contains(temp))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
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

    #[test]
    fn temperature_readings_outside_range_are_dropped() {
        assert_eq!(parse_temperature("72.5"), Some(72.5));
        assert_eq!(parse_temperature("-40"), Some(-40.0));
        assert_eq!(parse_temperature("150.1"), None);
        assert_eq!(parse_temperature("NaN"), None);
        assert_eq!(parse_temperature("warm"), None);
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn equipment_flag_requires_known_id_and_value() {
        let mut params = HashMap::new();
        params.insert("value".to_string(), "false".to_string());

        let parsed = equipment_flag("gas_heater", &params).ok();
        assert_eq!(parsed, Some((EquipmentId::GasHeater, false)));
        assert!(equipment_flag("boiler", &params).is_err());
        assert!(equipment_flag("fan_low", &HashMap::new()).is_err());
    }
}
