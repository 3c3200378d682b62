//! Record command - append one event to the event cache
//!
//! Parameter values are typed by what they parse as: integer, then float,
//! then `true`/`false`, otherwise a string.

use anyhow::{Context, Result};
use clap::Args;
use tally_client::{Buffer, DefaultSystemCalls, EventParams, Identity, ParamValue, SystemCalls};
use tally_config::Config;
use tally_telemetry::{install_id_path, load_or_create_install_id};
use tracing::info;

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Event name
    #[arg(long)]
    pub name: String,

    /// Event parameter as key=value (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, ParamValue)>,

    /// Event schema version
    #[arg(long)]
    pub version: Option<i64>,

    /// Include installation and player identifiers
    #[arg(long)]
    pub identity: bool,

    /// User ID written into the event
    #[arg(long, default_value = "tally-cli")]
    pub user_id: String,
}

/// Run the record command
pub fn run(config: &Config, args: RecordArgs) -> Result<()> {
    let Some(cache_path) = super::cache_path(config) else {
        anyhow::bail!("event cache is disabled in config, recorded events would be lost");
    };

    let system = DefaultSystemCalls;
    let install_path = install_id_path(&cache_path);
    let install_id = load_or_create_install_id(&install_path, &system)
        .with_context(|| format!("failed to load installation ID from {}", install_path.display()))?;

    let mut buffer = super::open_buffer(config);
    buffer.load_from_disk();
    buffer.set_identity(Identity {
        user_id: args.user_id,
        session_id: system.generate_uuid(),
        install_id,
        player_id: None,
    });

    let params = args
        .params
        .into_iter()
        .fold(EventParams::new(), |params, (key, value)| params.with(key, value));

    let before = buffer.events_recorded();
    buffer.record_event(
        &args.name,
        &system.now(),
        args.version,
        args.identity,
        &params,
    );
    if buffer.events_recorded() == before {
        anyhow::bail!("event '{}' was not recorded (too large?)", args.name);
    }
    buffer.flush_to_disk();

    info!(name = %args.name, events = buffer.events_recorded(), "event recorded");
    println!(
        "Recorded '{}' ({} events cached)",
        args.name,
        buffer.events_recorded()
    );
    Ok(())
}

fn parse_param(s: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in '{s}'"));
    }
    Ok((key.to_string(), parse_value(value)))
}

fn parse_value(value: &str) -> ParamValue {
    if let Ok(v) = value.parse::<i64>() {
        return ParamValue::Int64(v);
    }
    if let Ok(v) = value.parse::<f64>()
        && v.is_finite()
    {
        return ParamValue::Double(v);
    }
    match value {
        "true" => ParamValue::Bool(true),
        "false" => ParamValue::Bool(false),
        _ => ParamValue::String(value.to_string()),
    }
}
