use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use stableroom_common::{
    ActuatorCommand, AlertQuery, DeviceConfig, DeviceQuery, DeviceStatusPayload,
    LiveDataPayload, NodeError, Reading, ServiceConfig, ThresholdResponse, PATH_ALERT_MAIL,
    PATH_THRESHOLD, PATH_UPDATE_DATA,
};

use crate::ports::{ReportingPort, ThresholdSource};

/// Talks to the reporting service over HTTP with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpReporter {
    client: Client,
    base_url: String,
    bearer_token: String,
    device_no: String,
}

impl HttpReporter {
    pub fn new(device: &DeviceConfig, service: &ServiceConfig) -> Result<Self, NodeError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(service.timeout_ms))
            .build()
            .map_err(|err| NodeError::TransportFailure(format!("http client setup: {err}")))?;

        Ok(Self {
            client,
            base_url: service.base_url.trim_end_matches('/').to_string(),
            bearer_token: service.bearer_token.clone(),
            device_no: device.device_no.clone(),
        })
    }

    pub fn device_no(&self) -> &str {
        &self.device_no
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response, NodeError> {
        let request = if self.bearer_token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.bearer_token)
        };

        let response = request
            .send()
            .await
            .map_err(|err| NodeError::TransportFailure(format!("{what}: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NodeError::TransportFailure(format!(
                "{what} returned HTTP {status}"
            )));
        }
        Ok(response)
    }
}

impl ReportingPort for HttpReporter {
    async fn notify_active(&self) -> Result<(), NodeError> {
        let payload = DeviceStatusPayload::active(&self.device_no);
        let request = self.client.post(self.url(PATH_UPDATE_DATA)).json(&payload);
        self.send(request, "device status").await.map(|_| ())
    }

    async fn report_live(
        &self,
        reading: &Reading,
        command: ActuatorCommand,
    ) -> Result<(), NodeError> {
        let payload = LiveDataPayload::new(
            &self.device_no,
            reading,
            command.cooling_on,
            command.heater_on,
        );
        let request = self.client.post(self.url(PATH_UPDATE_DATA)).json(&payload);
        self.send(request, "live data").await.map(|_| ())
    }

    async fn report_alert(&self, reading: &Reading) -> Result<(), NodeError> {
        let query = AlertQuery::new(&self.device_no, reading);
        let request = self.client.post(self.url(PATH_ALERT_MAIL)).query(&query);
        self.send(request, "alert").await.map(|_| ())
    }
}

impl ThresholdSource for HttpReporter {
    async fn fetch_thresholds(&self) -> Result<ThresholdResponse, NodeError> {
        let query = DeviceQuery {
            device_no: self.device_no.clone(),
        };
        let request = self.client.get(self.url(PATH_THRESHOLD)).query(&query);
        let response = self.send(request, "threshold fetch").await?;

        let body = response
            .bytes()
            .await
            .map_err(|err| NodeError::TransportFailure(format!("threshold body: {err}")))?;
        ThresholdResponse::parse(&body)
    }
}
