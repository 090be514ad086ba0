use std::{
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use stableroom_common::{NodeError, RuntimeConfig};
use stableroom_node::{ConsoleDisplay, ControlLoop, HttpReporter, LoggedActuators, SimulatedSensor};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "./.stableroom/node.json";

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("STABLEROOM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let mut runtime = load_runtime_config(&config_path).await.unwrap_or_else(|err| {
        warn!(
            "failed to load runtime config from {}: {err:#}",
            config_path.display()
        );
        RuntimeConfig::default()
    });
    apply_overrides(&mut runtime, |key| std::env::var(key).ok());
    runtime.sanitize();

    let reporter = HttpReporter::new(&runtime.device, &runtime.service)
        .context("failed to build reporting client")?;
    let cycle = Duration::from_millis(runtime.control.cycle_interval_ms);

    let mut node = ControlLoop::new(
        runtime.control.initial_thresholds,
        SimulatedSensor::new(runtime.sensor.clone()),
        ConsoleDisplay::default(),
        LoggedActuators::default(),
        reporter,
    );

    if let Err(err) = node.start().await {
        return halt(err, cycle, ctrl_c()).await;
    }

    info!(
        device_no = %runtime.device.device_no,
        service = %runtime.service.base_url,
        cycle_ms = runtime.control.cycle_interval_ms,
        "node started"
    );

    let mut interval = tokio::time::interval(cycle);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                node.run_cycle().await;
            }
            result = &mut shutdown => {
                result.context("failed to listen for shutdown signal")?;
                node.shutdown();
                info!(cycles = node.cycles(), "node stopped");
                return Ok(());
            }
        }
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}

/// Sensor bring-up failed: keep signalling until `shutdown` resolves.
async fn halt(
    err: NodeError,
    every: Duration,
    shutdown: impl Future<Output = ()>,
) -> anyhow::Result<()> {
    let signalled = signal_until(&err, every, shutdown).await;
    let context = format!("node halted at startup after {signalled} signals");
    Err(anyhow::Error::new(err).context(context))
}

async fn signal_until(
    err: &NodeError,
    every: Duration,
    shutdown: impl Future<Output = ()>,
) -> u64 {
    tokio::pin!(shutdown);
    let mut interval = tokio::time::interval(every);
    let mut signalled = 0_u64;

    loop {
        tokio::select! {
            _ = &mut shutdown => return signalled,
            _ = interval.tick() => {
                signalled += 1;
                error!(signalled, "{err}; node halted, control loop will not start");
            }
        }
    }
}

async fn load_runtime_config(path: &Path) -> anyhow::Result<RuntimeConfig> {
    match tokio::fs::read(path).await {
        Ok(raw) => Ok(serde_json::from_slice::<RuntimeConfig>(&raw)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
        Err(err) => Err(err.into()),
    }
}

fn apply_overrides(runtime: &mut RuntimeConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("STABLEROOM_SERVICE_URL") {
        runtime.service.base_url = url;
    }
    if let Some(token) = lookup("STABLEROOM_TOKEN") {
        runtime.service.bearer_token = token;
    }
    if let Some(device_no) = lookup("STABLEROOM_DEVICE_NO") {
        runtime.device.device_no = device_no;
    }
    if let Some(cycle_ms) = lookup("STABLEROOM_CYCLE_MS").and_then(|value| value.parse().ok()) {
        runtime.control.cycle_interval_ms = cycle_ms;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("STABLEROOM_SERVICE_URL", "http://192.168.1.11:3000"),
            ("STABLEROOM_TOKEN", "secret"),
            ("STABLEROOM_CYCLE_MS", "2500"),
        ]);
        let mut runtime = RuntimeConfig::default();

        apply_overrides(&mut runtime, |key| env.get(key).map(|value| value.to_string()));

        assert_eq!(runtime.service.base_url, "http://192.168.1.11:3000");
        assert_eq!(runtime.service.bearer_token, "secret");
        assert_eq!(runtime.control.cycle_interval_ms, 2_500);
        assert_eq!(runtime.device.device_no, "D01");
    }

    #[test]
    fn unparsable_cycle_override_is_ignored() {
        let mut runtime = RuntimeConfig::default();

        apply_overrides(&mut runtime, |key| {
            (key == "STABLEROOM_CYCLE_MS").then(|| "soon".to_string())
        });

        assert_eq!(runtime.control.cycle_interval_ms, 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn halted_node_keeps_signalling_until_shutdown() {
        let err = NodeError::SensorUnavailable("no response on the bus".to_string());
        let shutdown = tokio::time::sleep(Duration::from_millis(3_500));

        let signalled = signal_until(&err, Duration::from_secs(1), shutdown).await;

        assert_eq!(signalled, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn halt_surfaces_the_sensor_error() {
        let err = NodeError::SensorUnavailable("no response on the bus".to_string());

        let result = halt(err, Duration::from_secs(1), async {}).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("node halted at startup"));
        assert!(matches!(
            err.downcast_ref::<NodeError>(),
            Some(NodeError::SensorUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn missing_config_file_means_defaults() {
        let path = Path::new("./.stableroom/does-not-exist.json");
        let runtime = load_runtime_config(path).await.unwrap();
        assert_eq!(runtime.device.device_no, "D01");
    }
}
