//! Minimal `--install` scaffolding: writes a starter config file under the
//! user's config directory if one isn't already there. Deliberately thin:
//! no profile detection, no shell completions, just a file a user can edit.

use directories::ProjectDirs;
use std::path::PathBuf;

const STARTER_CONFIG: &str = r#"# llmcmd configuration file.
# Every key is optional; unset keys fall back to environment variables
# and then to built-in defaults. See `llmcmd --help` for CLI overrides.

# model = "gpt-5"
# max_tokens = 2048
# temperature = 0.2
# max_api_calls = 50
# timeout_seconds = 300
# base_url = "https://api.openai.com/v1"
# pricing_catalog = "/path/to/pricing_catalog.json"
"#;

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "llmcmd").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Returns the path written to, or `None` if a config dir could not be
/// determined for this platform/user (e.g. no home directory).
pub fn install() -> std::io::Result<Option<PathBuf>> {
    let Some(path) = default_config_path() else {
        tracing::warn!("could not determine a config directory for this platform");
        return Ok(None);
    };
    if path.exists() {
        tracing::info!(path = %path.display(), "config file already exists, leaving it untouched");
        return Ok(Some(path));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, STARTER_CONFIG)?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_path_is_named_config_toml() {
        if let Some(path) = default_config_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }
}
