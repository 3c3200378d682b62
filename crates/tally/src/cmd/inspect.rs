//! Inspect command - show what is waiting in the event cache
//!
//! # Usage
//!
//! ```bash
//! tally inspect
//! tally inspect --json
//! ```

use anyhow::{Context, Result};
use clap::Args;
use tally_client::{Buffer, EventBuffer};
use tally_config::Config;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Print every cached event as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the inspect command
pub fn run(config: &Config, args: InspectArgs) -> Result<()> {
    let Some(path) = super::cache_path(config) else {
        println!("Event cache is disabled in config");
        return Ok(());
    };

    let mut buffer = super::open_buffer(config);
    buffer.load_from_disk();

    let doc = cached_events(&buffer)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    print_summary(&path, &buffer, &doc);
    Ok(())
}

/// Every complete event in the buffer, ignoring the upload batch cap
fn cached_events(buffer: &EventBuffer) -> Result<serde_json::Value> {
    let Some(&end) = buffer.event_end_offsets().last() else {
        return Ok(serde_json::json!({ "eventList": [] }));
    };

    // Swap the trailing separator for the closing characters.
    let mut payload = buffer.raw_contents()[..end - 1].to_vec();
    payload.extend_from_slice(b"]}");
    serde_json::from_slice(&payload).context("cached events are not valid JSON")
}

fn print_summary(path: &std::path::Path, buffer: &EventBuffer, doc: &serde_json::Value) {
    println!("Cache file: {}", path.display());
    println!("Events:     {}", buffer.events_recorded());
    println!("Bytes:      {}", buffer.len());

    let events = doc["eventList"].as_array().map(Vec::as_slice).unwrap_or_default();
    if events.is_empty() {
        return;
    }

    println!();
    for event in events {
        println!(
            "  {}  {}",
            event["eventTimestamp"].as_str().unwrap_or("-"),
            event["eventName"].as_str().unwrap_or("-"),
        );
    }
}
