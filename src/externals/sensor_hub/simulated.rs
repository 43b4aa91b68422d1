//! Simulated sensor hub for running without hardware.
//!
//! Each hub port carries a device producing a raw signal voltage around a
//! nominal value with a little noise. Channels follow the same attachment
//! rules as real hardware: bind, open, then read.

use std::{collections::HashMap, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};

use crate::models::hub_error::HubError;

use super::services::{SensorType, VoltageInput};

/// Peak noise added to every raw reading, in volts.
const NOISE_VOLTS: f64 = 0.002;

/// Raw signal of a precision voltage sensor measuring 12 V.
pub const NOMINAL_VOLTAGE_SENSOR_RAW: f64 = 2.5 + 12.0 * 0.0681;

/// Raw signal of an ACS712-05B carrying 0.5 A.
pub const NOMINAL_CURRENT_SENSOR_RAW: f64 = 2.5 - 0.5 * 0.185;

#[derive(Debug, Clone)]
pub struct SimulatedSensorHub {
    /// Nominal raw signal voltage of the device on each hub port.
    devices: HashMap<u8, f64>,
    noise: f64,
}

/// One analog channel of a `SimulatedSensorHub`.
pub struct SimulatedVoltageInput {
    devices: HashMap<u8, f64>,
    noise: f64,
    hub_port: Option<u8>,
    sensor_type: SensorType,
    attached: bool,
    rng: StdRng,
}

impl Default for SimulatedSensorHub {
    /// Voltage sensor on hub port 0, current sensor on hub port 1.
    fn default() -> Self {
        Self::new()
            .with_device(0, NOMINAL_VOLTAGE_SENSOR_RAW)
            .with_device(1, NOMINAL_CURRENT_SENSOR_RAW)
    }
}

impl SimulatedSensorHub {
    /// A hub with nothing plugged in.
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
            noise: NOISE_VOLTS,
        }
    }

    /// Plug a device with the given nominal raw output into a hub port.
    pub fn with_device(mut self, hub_port: u8, nominal_raw: f64) -> Self {
        self.devices.insert(hub_port, nominal_raw);
        self
    }

    /// Set the peak noise on readings. Zero gives exact nominal readings.
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    pub fn channel(&self) -> SimulatedVoltageInput {
        SimulatedVoltageInput {
            devices: self.devices.clone(),
            noise: self.noise,
            hub_port: None,
            sensor_type: SensorType::default(),
            attached: false,
            rng: StdRng::from_entropy(),
        }
    }
}

impl SimulatedVoltageInput {
    fn ensure_attached(&self) -> Result<u8, HubError> {
        match self.hub_port {
            Some(hub_port) if self.attached => Ok(hub_port),
            Some(hub_port) => Err(HubError::not_attached(format!(
                "Hub port {} isn't attached.",
                hub_port
            ))),
            None => Err(HubError::not_attached("Channel isn't bound to a hub port.")),
        }
    }
}

impl VoltageInput for SimulatedVoltageInput {
    fn set_hub_port(&mut self, hub_port: u8) {
        self.hub_port = Some(hub_port);
        self.attached = false;
    }

    fn open_wait_for_attachment(&mut self, timeout: Duration) -> Result<(), HubError> {
        let hub_port = self
            .hub_port
            .ok_or_else(|| HubError::not_attached("Channel isn't bound to a hub port."))?;

        if !self.devices.contains_key(&hub_port) {
            return Err(HubError::timeout(format!(
                "Hub port {} didn't attach within {} ms.",
                hub_port,
                timeout.as_millis()
            )));
        }

        info!("Simulated hub port {} attached.", hub_port);
        self.attached = true;
        Ok(())
    }

    fn set_sensor_type(&mut self, sensor_type: SensorType) -> Result<(), HubError> {
        let hub_port = self.ensure_attached()?;
        debug!("Hub port {} sensor type set to {:?}.", hub_port, sensor_type);
        self.sensor_type = sensor_type;
        Ok(())
    }

    fn voltage(&mut self) -> Result<f64, HubError> {
        let hub_port = self.ensure_attached()?;
        let nominal = self.devices.get(&hub_port).copied().ok_or_else(|| {
            HubError::not_attached(format!("Hub port {} was unplugged.", hub_port))
        })?;

        let noise = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        };
        Ok(self.sensor_type.convert(nominal + noise))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::hub_error::HubErrorCode;

    use super::*;

    #[test]
    fn test_attach_and_read() {
        let hub = SimulatedSensorHub::default().with_noise(0.0);
        let mut input = hub.channel();
        input.set_hub_port(1);
        input
            .open_wait_for_attachment(Duration::from_millis(5000))
            .expect("Failed to attach.");
        assert_eq!(
            input.voltage().expect("Failed to read."),
            NOMINAL_CURRENT_SENSOR_RAW
        );
    }

    #[test]
    fn test_sensor_type_scales_reading() {
        let hub = SimulatedSensorHub::default().with_noise(0.0);
        let mut input = hub.channel();
        input.set_hub_port(0);
        input
            .open_wait_for_attachment(Duration::from_millis(5000))
            .expect("Failed to attach.");
        input
            .set_sensor_type(SensorType::PrecisionVoltage1135)
            .expect("Failed to set sensor type.");

        let volts = input.voltage().expect("Failed to read.");
        assert!((volts - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_noise_stays_bounded() {
        let hub = SimulatedSensorHub::default();
        let mut input = hub.channel();
        input.set_hub_port(1);
        input
            .open_wait_for_attachment(Duration::from_millis(5000))
            .expect("Failed to attach.");
        for _ in 0..100 {
            let raw = input.voltage().expect("Failed to read.");
            assert!((raw - NOMINAL_CURRENT_SENSOR_RAW).abs() <= NOISE_VOLTS + 1e-12);
        }
    }

    #[test]
    fn test_missing_device_times_out() {
        let hub = SimulatedSensorHub::new().with_device(0, NOMINAL_VOLTAGE_SENSOR_RAW);
        let mut input = hub.channel();
        input.set_hub_port(1);
        let err = input
            .open_wait_for_attachment(Duration::from_millis(5000))
            .expect_err("Nothing is plugged into hub port 1.");
        assert_eq!(err.code, HubErrorCode::Timeout);
        assert_eq!(err.detail, "Hub port 1 didn't attach within 5000 ms.");

        assert_eq!(
            input.voltage().expect_err("Read before attach.").code,
            HubErrorCode::NotAttached
        );
    }

    #[test]
    fn test_unbound_channel_cannot_open() {
        let mut input = SimulatedSensorHub::default().channel();
        let err = input
            .open_wait_for_attachment(Duration::from_millis(5000))
            .expect_err("Channel isn't bound.");
        assert_eq!(err.code, HubErrorCode::NotAttached);
    }
}
