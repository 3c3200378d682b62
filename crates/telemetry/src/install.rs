//! Installation ID persisted next to the event cache
//!
//! Written once on first use and reused afterwards, so events recorded by
//! separate processes on one machine carry the same `unityInstallationID`.

use std::path::{Path, PathBuf};

use tally_client::SystemCalls;
use tracing::{debug, warn};

/// File name of the persisted installation ID
pub const INSTALL_ID_FILE_NAME: &str = "installid";

/// Installation ID file stored beside `cache_path`
pub fn install_id_path(cache_path: &Path) -> PathBuf {
    cache_path.with_file_name(INSTALL_ID_FILE_NAME)
}

/// Load the installation ID from `path`, or generate and save a new one
///
/// A file that does not hold a hyphenated UUID is replaced.
pub fn load_or_create_install_id(path: &Path, system: &dyn SystemCalls) -> std::io::Result<String> {
    if path.exists() {
        let id = std::fs::read_to_string(path)?;
        let id = id.trim();
        if is_hyphenated_uuid(id) {
            return Ok(id.to_string());
        }
        warn!(path = %path.display(), "invalid installation ID file, regenerating");
    }

    let id = system.generate_uuid();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &id)?;
    debug!(path = %path.display(), "installation ID created");
    Ok(id)
}

fn is_hyphenated_uuid(id: &str) -> bool {
    let groups: Vec<&str> = id.split('-').collect();
    groups.iter().map(|g| g.len()).eq([8, 4, 4, 4, 12])
        && groups
            .iter()
            .all(|g| g.chars().all(|c| c.is_ascii_hexdigit()))
}
