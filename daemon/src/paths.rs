/// Default file locations for the announcer daemon.
///
///   - events dir   Where the ranking tracker drops event files.
///   - announcer.toml         Optional tuning file, read once at startup.
///   - announcer-status.toml  Written by the daemon for operators.
use std::path::PathBuf;

pub const DEFAULT_EVENTS_DIR: &str = "/opt/scripts/lol_dashboard/events";
pub const CONFIG_FILE_NAME: &str = "announcer.toml";
pub const STATUS_FILE_NAME: &str = "announcer-status.toml";

/// Environment variable that overrides the tuning file location.
pub const CONFIG_PATH_ENV: &str = "ANNOUNCER_CONFIG";

/// Returns the tuning file path: `$ANNOUNCER_CONFIG`, else `./announcer.toml`.
pub fn config_file_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup(CONFIG_PATH_ENV)
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

pub fn default_status_file() -> PathBuf {
    PathBuf::from(STATUS_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_path_defaults_to_cwd_file() {
        assert_eq!(config_file_path(|_| None), PathBuf::from(CONFIG_FILE_NAME));
    }

    #[test]
    fn config_file_path_honours_override() {
        let path =
            config_file_path(|k| (k == CONFIG_PATH_ENV).then(|| "/etc/announcer.toml".to_string()));
        assert_eq!(path, PathBuf::from("/etc/announcer.toml"));
    }

    #[test]
    fn blank_override_is_ignored() {
        let path = config_file_path(|_| Some("  ".to_string()));
        assert_eq!(path, PathBuf::from(CONFIG_FILE_NAME));
    }

    #[test]
    fn default_status_file_has_correct_name() {
        assert_eq!(default_status_file().file_name().unwrap(), STATUS_FILE_NAME);
    }
}
