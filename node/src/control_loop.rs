use stableroom_common::{
    ActuatorCommand, AlertTransition, ControlContext, Evaluation, NodeError, Reading,
    SegmentBuffer, ThresholdSet,
};
use tracing::{debug, info, warn};

use crate::ports::{Actuators, ReportingPort, SegmentSink, Sensor, ThresholdSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    NotDue,
    Skipped,
    Sent,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub reading: Reading,
    pub evaluation: Evaluation,
    pub live: Delivery,
    pub alert: Delivery,
}

/// Owns every port and the control state; one task drives it cycle by cycle.
pub struct ControlLoop<S, D, A, R> {
    sensor: S,
    display: D,
    actuators: A,
    reporter: R,
    context: ControlContext,
    cycles: u64,
}

impl<S, D, A, R> ControlLoop<S, D, A, R>
where
    S: Sensor,
    D: SegmentSink,
    A: Actuators,
    R: ReportingPort + ThresholdSource,
{
    pub fn new(initial: ThresholdSet, sensor: S, display: D, actuators: A, reporter: R) -> Self {
        Self {
            sensor,
            display,
            actuators,
            reporter,
            context: ControlContext::new(initial),
            cycles: 0,
        }
    }

    pub fn context(&self) -> &ControlContext {
        &self.context
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Startup sequence. Only a sensor failure is returned; everything after
    /// it is best-effort.
    pub async fn start(&mut self) -> Result<(), NodeError> {
        self.sensor.init()?;
        self.actuators.apply(ActuatorCommand::OFF);

        match self.reporter.notify_active().await {
            Ok(()) => info!("device active status sent"),
            Err(err) => warn!("device active status failed: {err}"),
        }

        self.refresh_thresholds().await;
        self.display.write_screen(&SegmentBuffer::blank());
        Ok(())
    }

    /// Leaves both relays off before the process exits.
    pub fn shutdown(&mut self) {
        self.actuators.apply(ActuatorCommand::OFF);
        info!(cycles = self.cycles, "actuators released");
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.cycles = self.cycles.saturating_add(1);

        let reading = self.sensor.read();
        info!(
            cycle = self.cycles,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "sensor data"
        );

        self.display.write_screen(&SegmentBuffer::render(&reading));
        self.refresh_thresholds().await;

        let evaluation = self.context.evaluate(&reading);
        self.actuators.apply(evaluation.command);

        let live = self.send_live(&reading, evaluation.command).await;
        let alert = self.handle_transition(&reading, &evaluation).await;

        CycleReport {
            reading,
            evaluation,
            live,
            alert,
        }
    }

    async fn refresh_thresholds(&mut self) {
        let outcome = self.reporter.fetch_thresholds().await;
        match self.context.apply_thresholds(outcome) {
            Ok(set) => debug!(
                temp_min = set.temp_min,
                temp_max = set.temp_max,
                hum_min = set.hum_min,
                hum_max = set.hum_max,
                refreshed = self.context.threshold_store().refresh_count(),
                "thresholds refreshed"
            ),
            Err(err) => {
                let store = self.context.threshold_store();
                warn!(
                    failures = store.failure_count(),
                    refreshed = store.refresh_count(),
                    fetched_before = store.has_fetched(),
                    "threshold refresh failed, keeping current bounds: {err}"
                );
            }
        }
    }

    async fn send_live(&self, reading: &Reading, command: ActuatorCommand) -> Delivery {
        if let Err(err) = reading.validate() {
            warn!("{err}; skipping live update");
            return Delivery::Skipped;
        }

        match self.reporter.report_live(reading, command).await {
            Ok(()) => {
                debug!("live data sent");
                Delivery::Sent
            }
            Err(err) => {
                warn!("live data update failed: {err}");
                Delivery::Failed
            }
        }
    }

    async fn handle_transition(&self, reading: &Reading, evaluation: &Evaluation) -> Delivery {
        match evaluation.transition {
            Some(AlertTransition::Raised) => {
                warn!(
                    temp_out_of_range = evaluation.temp_out_of_range,
                    hum_out_of_range = evaluation.hum_out_of_range,
                    "threshold crossed, sending alert"
                );
                match self.reporter.report_alert(reading).await {
                    Ok(()) => Delivery::Sent,
                    Err(err) => {
                        warn!("alert delivery failed: {err}");
                        Delivery::Failed
                    }
                }
            }
            Some(AlertTransition::Recovered) => {
                info!("temperature and humidity returned to normal");
                Delivery::NotDue
            }
            Some(AlertTransition::Nominal) => {
                info!("temperature and humidity within thresholds");
                Delivery::NotDue
            }
            None => Delivery::NotDue,
        }
    }
}
