//! Flush command - upload cached events to the collect endpoint

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tally_client::Buffer;
use tally_config::Config;
use tally_telemetry::{Analytics, ConsentFlow, ConsentState, FlushStatus, UploadResult};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct FlushArgs {
    /// Treat the user as inside this consent flow (e.g. pipl) and consenting
    #[arg(long, value_name = "ID")]
    pub consent_flow: Option<String>,
}

/// Run the flush command
pub async fn run(config: &Config, args: FlushArgs) -> Result<()> {
    let url = super::collect_url(config)?;

    let consent = Arc::new(ConsentState::new());
    match &args.consent_flow {
        Some(id) => {
            consent.set_geo_ip_result(ConsentFlow::Required(id.clone()));
            consent.set_user_consent(id, true);
        }
        None => consent.set_geo_ip_result(ConsentFlow::NotRequired),
    }

    let mut builder = Analytics::builder(&url, super::open_buffer(config))
        .consent(consent)
        .upload_timeout(config.upload.timeout);
    if let Some(version) = &config.collect.client_version {
        builder = builder.client_version(version);
    }
    let analytics = builder.build().context("failed to create uploader")?;
    analytics.initialize();

    let status = analytics.flush();
    info!(?status, url = %url, "flush requested");

    match status {
        FlushStatus::Dispatched { bytes, .. } => {
            let result = analytics.wait_idle().await;
            report(result, bytes)?;
        }
        FlushStatus::NothingToSend => println!("No cached events to send"),
        other => anyhow::bail!("upload not started: {:?}", other),
    }

    // Whatever is left stays cached for the next run.
    let remaining = analytics.slot().with(|buffer| {
        buffer.flush_to_disk();
        buffer.events_recorded()
    });
    if remaining > 0 {
        println!("{remaining} events remain cached");
    }
    Ok(())
}

fn report(result: Option<UploadResult>, bytes: usize) -> Result<()> {
    match result {
        Some(UploadResult::Accepted) => {
            println!("Uploaded {bytes} bytes");
            Ok(())
        }
        Some(UploadResult::Rejected) => {
            warn!("collect rejected the batch as malformed, events discarded");
            println!("Batch rejected as malformed, events discarded");
            Ok(())
        }
        Some(UploadResult::Failed(outcome)) => match outcome.network_error {
            Some(error) => anyhow::bail!("upload failed: {error}"),
            None => anyhow::bail!("upload failed with HTTP {}", outcome.status),
        },
        None => anyhow::bail!("upload finished without a result"),
    }
}
