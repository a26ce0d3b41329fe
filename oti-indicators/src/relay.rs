//! Forwards dispatched job commands to the calculation worker
//!
//! Drains the receiving half of the dispatch queue. Each command is POSTed
//! once as JSON to the worker endpoint; failures are logged and the command
//! is dropped. Without a worker endpoint commands are only logged.

use oti_common::engine::JobCommand;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Run until every dispatcher handle is dropped
pub async fn run_relay(mut receiver: mpsc::Receiver<JobCommand>, worker_url: Option<String>) {
    let client = reqwest::Client::new();

    while let Some(command) = receiver.recv().await {
        let Some(url) = worker_url.as_deref() else {
            warn!(
                job_id = command.job_id,
                version = command.version,
                "No worker_url configured; job command dropped"
            );
            continue;
        };

        match forward(&client, url, &command).await {
            Ok(()) => info!(job_id = command.job_id, url, "Job command delivered to worker"),
            Err(e) => warn!(
                job_id = command.job_id,
                url,
                error = %e,
                "Job command delivery failed; command dropped"
            ),
        }
    }

    info!("Dispatch queue closed; relay stopped");
}

async fn forward(client: &reqwest::Client, url: &str, command: &JobCommand) -> reqwest::Result<()> {
    client
        .post(url)
        .json(command)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}
