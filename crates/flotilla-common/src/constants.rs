//! System-wide constants, container labels, and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for Flotilla data when `$HOME` is unusable.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/flotilla";

/// Returns the data directory, preferring `$HOME/.flotilla` and falling
/// back to `/var/lib/flotilla`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        let user_dir = PathBuf::from(home).join(".flotilla");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default path of the local runtime's state index.
pub fn default_state_file() -> PathBuf {
    data_dir().join("state.json")
}

/// Label carrying the (lowercase) project name.
pub const PROJECT_LABEL: &str = "com.flotilla.project";

/// Label carrying the service name.
pub const SERVICE_LABEL: &str = "com.flotilla.service";

/// Label marking ad-hoc containers (`"True"` / `"False"`).
pub const ONEOFF_LABEL: &str = "com.flotilla.oneoff";

/// Label carrying the replica number within a service.
pub const CONTAINER_NUMBER_LABEL: &str = "com.flotilla.container-number";

/// Grace period handed to the runtime's stop call.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;

/// Signal sent by `kill` when none is given.
pub const DEFAULT_KILL_SIGNAL: &str = "SIGKILL";

/// Environment variable overriding the state file path.
pub const ENV_STATE_FILE: &str = "FLOTILLA_STATE_FILE";

/// Environment variable overriding the stop timeout.
pub const ENV_STOP_TIMEOUT: &str = "FLOTILLA_STOP_TIMEOUT";

/// Environment variable providing the project name.
pub const ENV_PROJECT_NAME: &str = "FLOTILLA_PROJECT_NAME";

/// Application name used in CLI output and state files.
pub const APP_NAME: &str = "flotilla";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "flotilla";
