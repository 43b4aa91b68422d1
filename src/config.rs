use std::{env, path::PathBuf, str::FromStr, time::Duration};

use derive_more::Display;
use thiserror::Error;
use tracing::debug;

/// Environment variable selecting the installed current sensor variant.
pub const ENV_SENSOR: &str = "VOLTAGE_LOGGER_SENSOR";
/// Environment variable overriding the zero-current output voltage.
pub const ENV_V_OFFSET: &str = "VOLTAGE_LOGGER_V_OFFSET";
/// Environment variable overriding the sample interval in milliseconds.
pub const ENV_INTERVAL_MS: &str = "VOLTAGE_LOGGER_INTERVAL_MS";
/// Environment variable overriding the directory log files are written to.
pub const ENV_LOG_DIR: &str = "VOLTAGE_LOGGER_LOG_DIR";
/// Environment variable enabling the simulated sensor hub.
pub const ENV_DEMO: &str = "VOLTAGE_LOGGER_DEMO";

/// ACS712 hall effect current sensor variants. They only differ in
/// sensitivity, the change in output voltage for 1 A of current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum CurrentSensorVariant {
    /// ACS712ELCTR-05B-T, 185 mV/A.
    #[display(fmt = "ACS712ELCTR-05B-T")]
    Acs712Elc05B,

    /// ACS712ELCTR-20A-T, 100 mV/A.
    #[display(fmt = "ACS712ELCTR-20A-T")]
    Acs712Elc20A,

    /// ACS712ELCTR-30A-T, 66 mV/A.
    #[display(fmt = "ACS712ELCTR-30A-T")]
    Acs712Elc30A,
}

impl CurrentSensorVariant {
    /// Sensitivity in volts per ampere.
    pub fn sensitivity(&self) -> f64 {
        match self {
            CurrentSensorVariant::Acs712Elc05B => 185.0 / 1000.0,
            CurrentSensorVariant::Acs712Elc20A => 100.0 / 1000.0,
            CurrentSensorVariant::Acs712Elc30A => 66.0 / 1000.0,
        }
    }
}

impl FromStr for CurrentSensorVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "05B" | "5A" | "ACS712ELCTR-05B-T" => Ok(CurrentSensorVariant::Acs712Elc05B),
            "20A" | "ACS712ELCTR-20A-T" => Ok(CurrentSensorVariant::Acs712Elc20A),
            "30A" | "ACS712ELCTR-30A-T" => Ok(CurrentSensorVariant::Acs712Elc30A),
            _ => Err(ConfigError::InvalidValue {
                name: ENV_SENSOR,
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}.")]
    InvalidValue { name: &'static str, value: String },
}

/// Calibration and run settings for one acquisition run.
/// Fixed once the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionConfig {
    /// Current sensor output in volts when no current is flowing.
    /// Needs to be calibrated by reading the open circuit voltage.
    pub v_offset: f64,

    /// Current sensor sensitivity in volts per ampere.
    pub sensitivity: f64,

    /// Time between two samples.
    pub sample_interval: Duration,

    /// Bound on waiting for each channel to attach.
    pub attach_timeout: Duration,

    pub voltage_hub_port: u8,
    pub current_hub_port: u8,

    /// Directory the CSV log is created in.
    pub log_directory: PathBuf,

    /// Use the simulated sensor hub instead of real hardware.
    pub demo_mode: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self::for_variant(CurrentSensorVariant::Acs712Elc05B)
    }
}

impl AcquisitionConfig {
    /// Defaults with the sensitivity of the given current sensor variant.
    pub fn for_variant(variant: CurrentSensorVariant) -> Self {
        Self {
            v_offset: 2.5,
            sensitivity: variant.sensitivity(),
            sample_interval: Duration::from_secs(1),
            attach_timeout: Duration::from_millis(5000),
            voltage_hub_port: 0,
            current_hub_port: 1,
            log_directory: PathBuf::from("."),
            demo_mode: false,
        }
    }

    /// Build a config from the defaults and the `VOLTAGE_LOGGER_*`
    /// environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from the defaults, overlaying any value `lookup`
    /// returns for the `VOLTAGE_LOGGER_*` names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let variant = parse_var::<CurrentSensorVariant>(&lookup, ENV_SENSOR)?
            .unwrap_or(CurrentSensorVariant::Acs712Elc05B);
        debug!("Using current sensor variant {}.", variant);

        let mut config = Self::for_variant(variant);

        if let Some(v_offset) = parse_var::<f64>(&lookup, ENV_V_OFFSET)? {
            if !v_offset.is_finite() {
                return Err(invalid(ENV_V_OFFSET, v_offset));
            }
            config.v_offset = v_offset;
        }

        if let Some(millis) = parse_var::<u64>(&lookup, ENV_INTERVAL_MS)? {
            config.sample_interval = Duration::from_millis(millis);
        }

        if let Some(dir) = lookup(ENV_LOG_DIR) {
            config.log_directory = PathBuf::from(dir);
        }

        if let Some(demo) = lookup(ENV_DEMO) {
            config.demo_mode = match demo.trim() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(invalid(ENV_DEMO, demo)),
            };
        }

        Ok(config)
    }
}

fn invalid(name: &'static str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(name, raw)),
    }
}
