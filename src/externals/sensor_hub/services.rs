use std::time::Duration;

use crate::models::hub_error::HubError;

/// Zero volt output of the precision voltage sensor (1135).
const PRECISION_VOLTAGE_1135_OFFSET: f64 = 2.5;
/// Output volts per measured volt of the precision voltage sensor (1135).
const PRECISION_VOLTAGE_1135_GAIN: f64 = 0.0681;

/// What is plugged into an analog channel. Decides how the raw signal voltage
/// is scaled into the value `VoltageInput::voltage` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorType {
    /// No scaling, the raw signal voltage is reported.
    #[default]
    Voltage,

    /// Precision voltage sensor (1135), reports the measured voltage
    /// in volts (+-30 V).
    PrecisionVoltage1135,
}

impl SensorType {
    /// Scale a raw signal voltage into the value this sensor type reports.
    pub fn convert(&self, raw: f64) -> f64 {
        match self {
            SensorType::Voltage => raw,
            SensorType::PrecisionVoltage1135 => {
                (raw - PRECISION_VOLTAGE_1135_OFFSET) / PRECISION_VOLTAGE_1135_GAIN
            }
        }
    }
}

/// One analog input channel of the sensor hub.
///
/// This separates talking to the hub from the acquisition logic, so the loop
/// can be driven by real hardware, the simulated hub, or a test double.
///
/// All calls are synchronous and block the calling thread until the hub has
/// answered. Opening may block for the whole attach timeout. Async callers
/// must run on a multi-threaded runtime so other tasks, like the Ctrl+C
/// listener, keep running meanwhile.
pub trait VoltageInput {
    /// Bind the channel to a hub port. Must happen before opening.
    fn set_hub_port(&mut self, hub_port: u8);

    /// Open the channel and wait up to `timeout` for it to attach.
    /// Returns a `Timeout` error if it didn't.
    fn open_wait_for_attachment(&mut self, timeout: Duration) -> Result<(), HubError>;

    /// Change how the raw signal is scaled. Only valid once attached.
    fn set_sensor_type(&mut self, sensor_type: SensorType) -> Result<(), HubError>;

    /// Latest reading of the channel, scaled according to the sensor type.
    fn voltage(&mut self) -> Result<f64, HubError>;
}
