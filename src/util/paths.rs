use std::path::PathBuf;

// Well-known filenames inside the launchkit config directory
const COMMANDS_FILE_NAME: &str = "commands.toml";

/// Directory holding launchkit's config file and the canned-commands file.
/// Falls back to the current directory in environments without a home.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("launchkit")
}

/// Path to the canned-commands definition file.
pub fn commands_file() -> PathBuf {
    config_dir().join(COMMANDS_FILE_NAME)
}
