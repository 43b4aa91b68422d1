use std::time::Duration;

use crate::models::hub_error::HubError;

use self::{
    serial::SerialSensorHub,
    services::{SensorType, VoltageInput},
    simulated::SimulatedSensorHub,
};

pub mod serial;
pub mod services;
pub mod simulated;

pub type BoxedVoltageInput = Box<dyn VoltageInput + Send>;

/// The two channel handles the acquisition loop works with.
/// Neither is bound nor opened yet.
pub struct SensorHubModule {
    pub voltage_input: BoxedVoltageInput,
    pub current_input: BoxedVoltageInput,
}

impl SensorHubModule {
    /// Channels on the USB serial hub, or on the simulated hub in demo mode.
    pub fn initialize(demo_mode: bool) -> Self {
        if demo_mode {
            let hub = SimulatedSensorHub::default();
            Self {
                voltage_input: Box::new(hub.channel()),
                current_input: Box::new(hub.channel()),
            }
        } else {
            let hub = SerialSensorHub::default();
            Self {
                voltage_input: Box::new(hub.channel()),
                current_input: Box::new(hub.channel()),
            }
        }
    }
}

impl<T: VoltageInput + ?Sized> VoltageInput for Box<T> {
    fn set_hub_port(&mut self, hub_port: u8) {
        (**self).set_hub_port(hub_port)
    }

    fn open_wait_for_attachment(&mut self, timeout: Duration) -> Result<(), HubError> {
        (**self).open_wait_for_attachment(timeout)
    }

    fn set_sensor_type(&mut self, sensor_type: SensorType) -> Result<(), HubError> {
        (**self).set_sensor_type(sensor_type)
    }

    fn voltage(&mut self) -> Result<f64, HubError> {
        (**self).voltage()
    }
}
