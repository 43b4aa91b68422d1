use std::{io, path::PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    config::AcquisitionConfig,
    externals::{
        csv_log::CsvLog,
        sensor_hub::services::{SensorType, VoltageInput},
    },
    models::{current::Current, hub_error::HubError, sample::Sample, voltage::Voltage},
};

/// Why a run ended without completing.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// A channel failed to attach in time. No log file was created.
    #[error("Failed to attach sensor channel. {0}")]
    FailedToAttach(HubError),

    /// A channel attached but rejected its configuration.
    #[error("Failed to configure sensor channel. {0}")]
    FailedToConfigure(HubError),

    /// Reading a channel failed mid run.
    #[error("Failed to read sensor channel. {0}")]
    FailedToRead(HubError),

    /// Creating or writing the log file failed.
    #[error("Failed to write log file. {0}")]
    FailedToWriteLog(io::Error),

    /// Interrupted before sampling started. No log file was created.
    #[error("Interrupted before the main loop started.")]
    Cancelled,
}

/// Result of a run that was interrupted and shut down cleanly.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Number of samples taken and logged.
    pub samples: usize,
    pub log_path: PathBuf,
}

/// Task: Attach both sensor channels, then sample them every
/// `config.sample_interval`, printing and logging each sample.
/// Runs until cancelled, which is the normal way for it to end once
/// sampling started. Cancelling while the channels attach ends the run with
/// `Cancelled` instead. Any hub or log failure ends the run with an error.
///
/// The channel calls block, so this must run on a multi-threaded runtime.
#[tracing::instrument(skip_all)]
pub async fn task_acquisition_loop(
    token: CancellationToken,
    config: AcquisitionConfig,
    mut voltage_input: impl VoltageInput,
    mut current_input: impl VoltageInput,
) -> Result<RunSummary, AcquisitionError> {
    info!("Started.");

    attach_channels(&config, &mut voltage_input, &mut current_input)
        .map_err(AcquisitionError::FailedToAttach)?;
    println!("Sensors successfully attached!");

    voltage_input
        .set_sensor_type(SensorType::PrecisionVoltage1135)
        .map_err(AcquisitionError::FailedToConfigure)?;

    // An interrupt during attach ends the run without a log file.
    if token.is_cancelled() {
        warn!("Cancelled before the main loop.");
        return Err(AcquisitionError::Cancelled);
    }

    let mut log = CsvLog::create(&config.log_directory, Local::now())
        .map_err(AcquisitionError::FailedToWriteLog)?;
    info!("Logging to '{}'.", log.path().display());

    println!("Starting Main Loop: Press \"Ctrl+C\" to stop");
    let mut start_time: Option<DateTime<Local>> = None;

    loop {
        if token.is_cancelled() {
            warn!("Cancelled.");
            break;
        }

        let sample = business_logic(
            &config,
            &mut voltage_input,
            &mut current_input,
            &mut start_time,
        )?;

        println!("{}", sample);
        log.write_sample(&sample)
            .map_err(AcquisitionError::FailedToWriteLog)?;

        tokio::select! {
            _ = token.cancelled() => {
                warn!("Cancelled.");
                break;
            },
            _ = tokio::time::sleep(config.sample_interval) => {}
        };
    }

    let samples = log.rows();
    let log_path = log.close().map_err(AcquisitionError::FailedToWriteLog)?;
    println!("Ending Main Loop");

    Ok(RunSummary { samples, log_path })
}

/// Bind both channels to their hub ports and wait for them to attach.
#[tracing::instrument(skip_all)]
fn attach_channels(
    config: &AcquisitionConfig,
    voltage_input: &mut impl VoltageInput,
    current_input: &mut impl VoltageInput,
) -> Result<(), HubError> {
    voltage_input.set_hub_port(config.voltage_hub_port);
    current_input.set_hub_port(config.current_hub_port);

    debug!(
        "Waiting up to {} ms for hub ports {} and {}.",
        config.attach_timeout.as_millis(),
        config.voltage_hub_port,
        config.current_hub_port
    );
    voltage_input.open_wait_for_attachment(config.attach_timeout)?;
    current_input.open_wait_for_attachment(config.attach_timeout)?;
    info!("Both channels attached.");
    Ok(())
}

/// Perform task business logic.
/// Read both channels, convert the current sensor output and stamp the
/// sample. The first sample sets the run start time.
fn business_logic(
    config: &AcquisitionConfig,
    voltage_input: &mut impl VoltageInput,
    current_input: &mut impl VoltageInput,
    start_time: &mut Option<DateTime<Local>>,
) -> Result<Sample, AcquisitionError> {
    trace!("Executing business logic.");

    let voltage = Voltage::from(
        voltage_input
            .voltage()
            .map_err(AcquisitionError::FailedToRead)?,
    );
    let reading = current_input
        .voltage()
        .map_err(AcquisitionError::FailedToRead)?;
    let current = Current::from_sensor_reading(reading, config.v_offset, config.sensitivity);

    let now = Local::now();
    let start = *start_time.get_or_insert(now);

    Ok(Sample::new(start, now, voltage, current))
}
