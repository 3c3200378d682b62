//! Clear command - delete the event cache

use anyhow::Result;
use tally_config::Config;

/// Run the clear command
pub fn run(config: &Config) -> Result<()> {
    let Some(cache) = super::disk_cache(config) else {
        println!("Event cache is disabled in config, nothing to clear");
        return Ok(());
    };

    let existed = cache.path().exists();
    cache.clear();

    if existed {
        println!("Removed {}", cache.path().display());
    } else {
        println!("No event cache at {}", cache.path().display());
    }
    Ok(())
}
