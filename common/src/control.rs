use crate::{
    error::NodeError,
    thresholds::{ThresholdResponse, ThresholdSet, ThresholdStore},
    types::Reading,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    /// Nothing evaluated since startup.
    Pending,
    Normal,
    Alerted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub cooling_on: bool,
    pub heater_on: bool,
}

impl ActuatorCommand {
    pub const OFF: Self = Self {
        cooling_on: false,
        heater_on: false,
    };
    pub const COOL: Self = Self {
        cooling_on: true,
        heater_on: false,
    };
    pub const HEAT: Self = Self {
        cooling_on: false,
        heater_on: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTransition {
    /// First cycle of an excursion; the one alert for it goes out now.
    Raised,
    /// Back inside every band after an alert.
    Recovered,
    /// First in-range cycle since startup.
    Nominal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub command: ActuatorCommand,
    pub temp_out_of_range: bool,
    pub hum_out_of_range: bool,
    pub transition: Option<AlertTransition>,
}

impl Evaluation {
    pub fn out_of_range(&self) -> bool {
        self.temp_out_of_range || self.hum_out_of_range
    }

    pub fn should_alert(&self) -> bool {
        self.transition == Some(AlertTransition::Raised)
    }
}

/// State carried from one control cycle to the next.
#[derive(Debug, Clone)]
pub struct ControlContext {
    thresholds: ThresholdStore,
    alert: AlertState,
    command: ActuatorCommand,
}

impl Default for ControlContext {
    fn default() -> Self {
        Self::new(ThresholdSet::default())
    }
}

impl ControlContext {
    pub fn new(initial: ThresholdSet) -> Self {
        Self {
            thresholds: ThresholdStore::new(initial),
            alert: AlertState::Pending,
            command: ActuatorCommand::OFF,
        }
    }

    pub fn thresholds(&self) -> ThresholdSet {
        self.thresholds.current()
    }

    pub fn threshold_store(&self) -> &ThresholdStore {
        &self.thresholds
    }

    pub fn alert_state(&self) -> AlertState {
        self.alert
    }

    /// Last command handed to the actuators.
    pub fn command(&self) -> ActuatorCommand {
        self.command
    }

    pub fn apply_thresholds(
        &mut self,
        outcome: Result<ThresholdResponse, NodeError>,
    ) -> Result<ThresholdSet, NodeError> {
        self.thresholds.apply(outcome)
    }

    /// Runs one cycle of the threshold rules against `reading`.
    ///
    /// NaN never compares true, so an unreadable sensor yields both actuators
    /// off and no excursion.
    pub fn evaluate(&mut self, reading: &Reading) -> Evaluation {
        let thresholds = self.thresholds.current();

        let temp_out_of_range = thresholds.temperature_out_of_range(reading.temperature);
        let command = if !temp_out_of_range {
            ActuatorCommand::OFF
        } else if reading.temperature >= thresholds.temp_max {
            ActuatorCommand::COOL
        } else {
            ActuatorCommand::HEAT
        };

        let hum_out_of_range = thresholds.humidity_out_of_range(reading.humidity);

        let transition = match (temp_out_of_range || hum_out_of_range, self.alert) {
            (true, AlertState::Pending | AlertState::Normal) => {
                self.alert = AlertState::Alerted;
                Some(AlertTransition::Raised)
            }
            (false, AlertState::Alerted) => {
                self.alert = AlertState::Normal;
                Some(AlertTransition::Recovered)
            }
            (false, AlertState::Pending) => {
                self.alert = AlertState::Normal;
                Some(AlertTransition::Nominal)
            }
            (true, AlertState::Alerted) | (false, AlertState::Normal) => None,
        };

        self.command = command;

        Evaluation {
            command,
            temp_out_of_range,
            hum_out_of_range,
            transition,
        }
    }
}
