//! Host stand-ins for the sensor, the e-paper panel and the two relays.

use std::f32::consts::TAU;

use stableroom_common::{ActuatorCommand, NodeError, Reading, SegmentBuffer, SensorConfig};
use tracing::{debug, info, warn};

use crate::ports::{Actuators, SegmentSink, Sensor};

/// Sine sweep around a base point, optionally dropping samples to NaN.
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    config: SensorConfig,
    tick: u64,
}

impl SimulatedSensor {
    pub fn new(config: SensorConfig) -> Self {
        Self { config, tick: 0 }
    }
}

impl Sensor for SimulatedSensor {
    fn init(&mut self) -> Result<(), NodeError> {
        if self.config.period_cycles < 2 {
            return Err(NodeError::SensorUnavailable(
                "simulated sensor needs a period of at least two cycles".to_string(),
            ));
        }
        info!(
            base_temperature = self.config.base_temperature,
            base_humidity = self.config.base_humidity,
            "simulated sensor ready"
        );
        Ok(())
    }

    fn read(&mut self) -> Reading {
        let tick = self.tick;
        self.tick = self.tick.saturating_add(1);

        let invalid_every = u64::from(self.config.invalid_every);
        if invalid_every > 0 && tick % invalid_every == invalid_every - 1 {
            return Reading::new(f32::NAN, f32::NAN);
        }

        let period = u64::from(self.config.period_cycles);
        let phase = (tick % period) as f32 / period as f32;
        let wave = (phase * TAU).sin();

        Reading::new(
            self.config.base_temperature + self.config.temperature_swing * wave,
            self.config.base_humidity - self.config.humidity_swing * wave,
        )
    }
}

/// Prints what the panel would show.
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    last: Option<SegmentBuffer>,
}

impl ConsoleDisplay {
    pub fn last_frame(&self) -> Option<&SegmentBuffer> {
        self.last.as_ref()
    }
}

impl SegmentSink for ConsoleDisplay {
    fn write_screen(&mut self, buffer: &SegmentBuffer) {
        debug!("segment frame [{buffer}]");
        match buffer.decode() {
            Some((temperature, humidity)) if temperature.is_blank() && humidity.is_blank() => {
                info!("display: cleared");
            }
            Some((temperature, humidity)) => {
                info!("display: {temperature} C  {humidity} %RH");
            }
            None => warn!("display: frame holds patterns outside the digit table"),
        }
        self.last = Some(*buffer);
    }
}

/// Relay pair that logs every switch. Both lines start off.
#[derive(Debug, Default)]
pub struct LoggedActuators {
    state: ActuatorCommand,
    switches: u64,
}

impl LoggedActuators {
    pub fn state(&self) -> ActuatorCommand {
        self.state
    }

    pub fn switch_count(&self) -> u64 {
        self.switches
    }
}

impl Actuators for LoggedActuators {
    fn apply(&mut self, command: ActuatorCommand) {
        debug_assert!(!(command.cooling_on && command.heater_on));

        if command == self.state {
            return;
        }
        info!(
            cooling = command.cooling_on,
            heater = command.heater_on,
            "actuators switched"
        );
        self.state = command;
        self.switches = self.switches.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_stays_within_swing() {
        let config = SensorConfig::default();
        let mut sensor = SimulatedSensor::new(config.clone());

        for _ in 0..(config.period_cycles * 3) {
            let reading = sensor.read();
            let temp_delta = (reading.temperature - config.base_temperature).abs();
            let hum_delta = (reading.humidity - config.base_humidity).abs();
            assert!(temp_delta <= config.temperature_swing + 1e-3);
            assert!(hum_delta <= config.humidity_swing + 1e-3);
        }
    }

    #[test]
    fn injects_invalid_samples() {
        let mut sensor = SimulatedSensor::new(SensorConfig {
            invalid_every: 3,
            ..Default::default()
        });

        let valid: Vec<bool> = (0..6).map(|_| sensor.read().is_valid()).collect();

        assert_eq!(valid, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn degenerate_period_is_unavailable() {
        let mut sensor = SimulatedSensor::new(SensorConfig {
            period_cycles: 1,
            ..Default::default()
        });
        assert!(matches!(sensor.init(), Err(NodeError::SensorUnavailable(_))));
    }

    #[test]
    fn actuators_start_off_and_count_switches() {
        let mut relays = LoggedActuators::default();
        assert_eq!(relays.state(), ActuatorCommand::OFF);

        relays.apply(ActuatorCommand::OFF);
        relays.apply(ActuatorCommand::COOL);
        relays.apply(ActuatorCommand::COOL);
        relays.apply(ActuatorCommand::HEAT);

        assert_eq!(relays.state(), ActuatorCommand::HEAT);
        assert_eq!(relays.switch_count(), 2);
    }

    #[test]
    fn console_display_keeps_last_frame() {
        let mut display = ConsoleDisplay::default();
        let frame = SegmentBuffer::render(&Reading::new(21.5, 48.0));

        display.write_screen(&SegmentBuffer::blank());
        display.write_screen(&frame);

        assert_eq!(display.last_frame(), Some(&frame));
    }
}
