pub mod config;
pub mod externals;
pub mod models;
pub mod tasks;

use anyhow::Result;
use config::AcquisitionConfig;
use externals::sensor_hub::SensorHubModule;
use tasks::acquisition::{task_acquisition_loop, AcquisitionError, RunSummary};
use tokio::{signal, task::JoinError};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = AcquisitionConfig::from_env()?;
    info!(
        "Voltage offset {} V, sensitivity {} V/A, sampling every {} ms.",
        config.v_offset,
        config.sensitivity,
        config.sample_interval.as_millis()
    );

    println!("Start of main function");

    let SensorHubModule {
        voltage_input,
        current_input,
    } = SensorHubModule::initialize(config.demo_mode);

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    let token_clone = token.clone();
    let acquisition = tracker.spawn(async move {
        task_acquisition_loop(token_clone, config, voltage_input, current_input).await
    });

    let token_clone = token.clone();
    tracker.spawn(async move {
        tokio::select! {
            _ = token_clone.cancelled() => {}
            res = signal::ctrl_c() => {
                match res {
                    Ok(_) => {
                        token_clone.cancel();
                    },
                    Err(e)=>{
                        tracing::error!("Failed to listen for ctrl_c. Error: {}", e);
                        token_clone.cancel();
                    }
                };
            },
        }
    });

    let outcome = acquisition.await;

    // Stops the ctrl_c listener if the run ended on its own.
    token.cancel();
    tracker.close();
    tracker.wait().await;

    report_outcome(outcome);

    Ok(())
}

/// Print how the acquisition run ended.
/// Returns whether the run completed, which is only the case when it was
/// interrupted after sampling started.
fn report_outcome(outcome: Result<Result<RunSummary, AcquisitionError>, JoinError>) -> bool {
    match outcome {
        Ok(Ok(summary)) => {
            info!(
                "Logged {} samples to '{}'.",
                summary.samples,
                summary.log_path.display()
            );
            return true;
        }
        Ok(Err(AcquisitionError::FailedToAttach(e))) => {
            error!("Failed to attach sensors. Error: {}", e);
            println!();
            println!("{}", e);
        }
        Ok(Err(e)) => {
            error!("Acquisition aborted. Error: {}", e);
        }
        Err(e) => {
            error!("Acquisition task failed. Error: {}", e);
        }
    }
    println!("Main function terminated prematurely!");
    false
}
