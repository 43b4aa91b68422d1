use derive_more::Display;

/// Physical voltage in volts, as reported by a sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Display)]
#[display(fmt = "{:.3}", value)]
pub struct Voltage {
    pub value: f64,
}

impl From<f64> for Voltage {
    fn from(value: f64) -> Self {
        Self { value }
    }
}
