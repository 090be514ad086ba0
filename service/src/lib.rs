//! Local stand-in for the StableRoom reporting service.
//!
//! Serves the device-facing endpoints the node calls (status/live updates,
//! threshold pull, alert mail) plus a threshold write and a device lookup for
//! development. State lives in memory; thresholds are also written to disk.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stableroom_common::{
    AlertQuery, DeviceQuery, ThresholdResponse, PATH_ALERT_MAIL, PATH_DEVICE, PATH_THRESHOLD,
    PATH_UPDATE_DATA,
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod store;

pub use store::AppStore;

#[derive(Clone)]
pub struct AppState {
    devices: Arc<Mutex<HashMap<String, DeviceRecord>>>,
    thresholds: Arc<Mutex<HashMap<String, ThresholdResponse>>>,
    bearer_token: Arc<String>,
    store: Option<AppStore>,
}

/// Body of `update-data`: either the startup status or a live sample.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceUpdate {
    pub device_no: String,
    #[serde(default)]
    pub is_device_connected: Option<bool>,
    #[serde(default)]
    pub current_temperature: Option<f64>,
    #[serde(default)]
    pub current_humidity: Option<f64>,
    #[serde(default)]
    pub is_ac_on: Option<bool>,
    #[serde(default)]
    pub is_heater_on: Option<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlertRecord {
    pub current_temperature: f64,
    pub current_humidity: f64,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeviceRecord {
    pub device_no: String,
    pub is_device_connected: bool,
    pub current_temperature: Option<f64>,
    pub current_humidity: Option<f64>,
    pub is_ac_on: bool,
    pub is_heater_on: bool,
    pub live_updates: u64,
    pub alerts: u64,
    pub last_alert: Option<AlertRecord>,
    pub last_seen: DateTime<Utc>,
}

impl DeviceRecord {
    fn new(device_no: &str, now: DateTime<Utc>) -> Self {
        Self {
            device_no: device_no.to_string(),
            is_device_connected: false,
            current_temperature: None,
            current_humidity: None,
            is_ac_on: false,
            is_heater_on: false,
            live_updates: 0,
            alerts: 0,
            last_alert: None,
            last_seen: now,
        }
    }

    fn apply(&mut self, update: &DeviceUpdate, now: DateTime<Utc>) {
        if let Some(connected) = update.is_device_connected {
            self.is_device_connected = connected;
        }

        let is_live = update.current_temperature.is_some() || update.current_humidity.is_some();
        if is_live {
            // A live sample implies the device is up even if status was missed.
            self.is_device_connected = true;
            self.current_temperature = update.current_temperature;
            self.current_humidity = update.current_humidity;
            self.is_ac_on = update.is_ac_on.unwrap_or(false);
            self.is_heater_on = update.is_heater_on.unwrap_or(false);
            self.live_updates = self.live_updates.saturating_add(1);
        }

        self.last_seen = now;
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct Ack {
    ok: bool,
}

impl AppState {
    pub fn new(
        bearer_token: impl Into<String>,
        thresholds: HashMap<String, ThresholdResponse>,
        store: Option<AppStore>,
    ) -> Self {
        Self {
            devices: Arc::new(Mutex::new(HashMap::new())),
            thresholds: Arc::new(Mutex::new(thresholds)),
            bearer_token: Arc::new(bearer_token.into()),
            store,
        }
    }

    pub async fn device(&self, device_no: &str) -> Option<DeviceRecord> {
        self.devices.lock().await.get(device_no).cloned()
    }

    pub async fn set_thresholds(&self, device_no: &str, thresholds: ThresholdResponse) {
        self.thresholds
            .lock()
            .await
            .insert(device_no.to_string(), thresholds);
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        if self.bearer_token.is_empty() {
            return true;
        }
        let expected = format!("Bearer {}", self.bearer_token);
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value == expected)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PATH_UPDATE_DATA, post(handle_update_data))
        .route(
            PATH_THRESHOLD,
            get(handle_get_threshold).put(handle_put_threshold),
        )
        .route(PATH_ALERT_MAIL, post(handle_alert_mail))
        .route(PATH_DEVICE, get(handle_get_device))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_update_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<DeviceUpdate>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let device_no = update.device_no.trim();
    if device_no.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'device_no'");
    }

    let now = Utc::now();
    {
        let mut devices = state.devices.lock().await;
        devices
            .entry(device_no.to_string())
            .or_insert_with(|| DeviceRecord::new(device_no, now))
            .apply(&update, now);
    }

    match (update.current_temperature, update.current_humidity) {
        (Some(temperature), Some(humidity)) => info!(
            device_no,
            temperature,
            humidity,
            ac = update.is_ac_on.unwrap_or(false),
            heater = update.is_heater_on.unwrap_or(false),
            "live data"
        ),
        _ => info!(device_no, connected = ?update.is_device_connected, "device status"),
    }

    Json(Ack { ok: true }).into_response()
}

async fn handle_get_threshold(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DeviceQuery>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }

    let thresholds = state
        .thresholds
        .lock()
        .await
        .get(&query.device_no)
        .copied()
        .unwrap_or_default();

    Json(thresholds).into_response()
}

async fn handle_put_threshold(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DeviceQuery>,
    Json(thresholds): Json<ThresholdResponse>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if let Err(message) = validate_thresholds(&thresholds) {
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let snapshot = {
        let mut stored = state.thresholds.lock().await;
        stored.insert(query.device_no.clone(), thresholds);
        stored.clone()
    };

    if let Some(store) = &state.store {
        if let Err(err) = store.save_thresholds(&snapshot).await {
            warn!("failed to persist thresholds: {err:#}");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to persist thresholds",
            );
        }
    }

    info!(device_no = %query.device_no, ?thresholds, "thresholds updated");
    Json(thresholds).into_response()
}

async fn handle_alert_mail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(alert): Query<AlertQuery>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }

    let now = Utc::now();
    {
        let mut devices = state.devices.lock().await;
        let record = devices
            .entry(alert.device_no.clone())
            .or_insert_with(|| DeviceRecord::new(&alert.device_no, now));
        record.alerts = record.alerts.saturating_add(1);
        record.last_alert = Some(AlertRecord {
            current_temperature: alert.current_temperature,
            current_humidity: alert.current_humidity,
            received_at: now,
        });
        record.last_seen = now;
    }

    // Mail delivery is not wired up; the log line is the notification.
    warn!(
        device_no = %alert.device_no,
        temperature = alert.current_temperature,
        humidity = alert.current_humidity,
        "threshold alert"
    );

    Json(Ack { ok: true }).into_response()
}

async fn handle_get_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DeviceQuery>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }

    match state.device(&query.device_no).await {
        Some(record) => Json(record).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Unknown device"),
    }
}

fn validate_thresholds(thresholds: &ThresholdResponse) -> Result<(), &'static str> {
    let bounds = [
        thresholds.min_temperature,
        thresholds.max_temperature,
        thresholds.min_humidity,
        thresholds.max_humidity,
    ];
    if bounds.iter().flatten().any(|bound| !bound.is_finite()) {
        return Err("thresholds must be finite numbers");
    }

    let set = thresholds.into_set();
    if set.temp_min >= set.temp_max {
        return Err("min_temperature must be below max_temperature");
    }
    if set.hum_min >= set.hum_max {
        return Err("min_humidity must be below max_humidity");
    }
    Ok(())
}

fn unauthorized() -> Response {
    error_response(StatusCode::UNAUTHORIZED, "Missing or invalid bearer token")
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

#[cfg(test)]
mod tests {
    use axum::{body::to_bytes, http::HeaderValue};
    use stableroom_common::ThresholdSet;

    use super::*;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    fn device(device_no: &str) -> Query<DeviceQuery> {
        Query(DeviceQuery {
            device_no: device_no.to_string(),
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn live(device_no: &str, temperature: f64, humidity: f64, ac: bool) -> DeviceUpdate {
        DeviceUpdate {
            device_no: device_no.to_string(),
            is_device_connected: None,
            current_temperature: Some(temperature),
            current_humidity: Some(humidity),
            is_ac_on: Some(ac),
            is_heater_on: Some(false),
        }
    }

    #[tokio::test]
    async fn rejects_wrong_token() {
        let state = AppState::new("secret", HashMap::new(), None);

        let response =
            handle_get_threshold(State(state.clone()), bearer("nope"), device("D01")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response =
            handle_get_threshold(State(state), HeaderMap::new(), device("D01")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_device_gets_empty_thresholds() {
        let state = AppState::new("secret", HashMap::new(), None);

        let response = handle_get_threshold(State(state), bearer("secret"), device("D09")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({}));
    }

    #[tokio::test]
    async fn live_update_records_latest_state() {
        let state = AppState::new("", HashMap::new(), None);

        let response = handle_update_data(
            State(state.clone()),
            HeaderMap::new(),
            Json(live("D01", 27.4, 55.0, true)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let record = state.device("D01").await.unwrap();
        assert!(record.is_device_connected);
        assert_eq!(record.current_temperature, Some(27.4));
        assert!(record.is_ac_on);
        assert_eq!(record.live_updates, 1);
    }

    #[tokio::test]
    async fn status_update_does_not_count_as_live() {
        let state = AppState::new("", HashMap::new(), None);
        let update = DeviceUpdate {
            device_no: "D01".to_string(),
            is_device_connected: Some(true),
            current_temperature: None,
            current_humidity: None,
            is_ac_on: None,
            is_heater_on: None,
        };

        handle_update_data(State(state.clone()), HeaderMap::new(), Json(update)).await;

        let record = state.device("D01").await.unwrap();
        assert!(record.is_device_connected);
        assert_eq!(record.live_updates, 0);
        assert_eq!(record.current_temperature, None);
    }

    #[tokio::test]
    async fn alert_is_counted_per_device() {
        let state = AppState::new("", HashMap::new(), None);
        let alert = AlertQuery {
            current_temperature: 27.1,
            current_humidity: 50.0,
            device_no: "D01".to_string(),
        };

        handle_alert_mail(State(state.clone()), HeaderMap::new(), Query(alert.clone())).await;
        handle_alert_mail(State(state.clone()), HeaderMap::new(), Query(alert)).await;

        let record = state.device("D01").await.unwrap();
        assert_eq!(record.alerts, 2);
        assert_eq!(
            record.last_alert.map(|last| last.current_temperature),
            Some(27.1)
        );
    }

    #[tokio::test]
    async fn put_threshold_rejects_inverted_band() {
        let state = AppState::new("", HashMap::new(), None);
        let inverted = ThresholdResponse {
            min_temperature: Some(30.0),
            max_temperature: Some(20.0),
            ..Default::default()
        };

        let response =
            handle_put_threshold(State(state), HeaderMap::new(), device("D01"), Json(inverted))
                .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn put_then_get_threshold_round_trips() {
        let state = AppState::new("", HashMap::new(), None);
        let band: ThresholdResponse = ThresholdSet::new(20.0, 26.0, 30.0, 70.0).into();

        let response = handle_put_threshold(
            State(state.clone()),
            HeaderMap::new(),
            device("D01"),
            Json(band),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handle_get_threshold(State(state), HeaderMap::new(), device("D01")).await;
        let body = body_json(response).await;
        assert_eq!(body["min_temperature"], 20.0);
        assert_eq!(body["max_humidity"], 70.0);
    }

    #[tokio::test]
    async fn missing_device_is_not_found() {
        let state = AppState::new("", HashMap::new(), None);

        let response = handle_get_device(State(state), HeaderMap::new(), device("D42")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Unknown device");
    }
}
