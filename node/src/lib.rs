pub mod control_loop;
pub mod devices;
pub mod ports;
pub mod reporter;

pub use control_loop::{ControlLoop, CycleReport, Delivery};
pub use devices::{ConsoleDisplay, LoggedActuators, SimulatedSensor};
pub use ports::{Actuators, ReportingPort, SegmentSink, Sensor, ThresholdSource};
pub use reporter::HttpReporter;
