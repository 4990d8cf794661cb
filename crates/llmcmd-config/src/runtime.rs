//! Configuration layering: defaults < config file < environment < CLI
//! flags, resolved into one `RuntimeConfig`.

use crate::presets::resolve_preset;
use llmcmd_core::EngineError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-5";
const DEFAULT_MAX_TOKENS: u32 = 2048;
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_API_CALLS: u32 = 50;
const DEFAULT_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Raw CLI input, already parsed by clap in the `llmcmd` bin crate. Kept
/// free of clap dependencies here so this crate stays testable without it.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub inputs: Vec<String>,
    pub output: Option<String>,
    pub prompt: Option<String>,
    pub preset: Option<String>,
    pub config_path: Option<PathBuf>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub max_api_calls: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub stats: bool,
    pub verbose: bool,
}

/// On-disk config file shape (`--config <path>`, TOML). Every field is
/// optional; absence falls through to the next layer.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    max_api_calls: Option<u32>,
    timeout_seconds: Option<u64>,
    base_url: Option<String>,
    pricing_catalog: Option<PathBuf>,
}

/// Environment variable overlay.
#[derive(Debug, Clone, Default)]
struct EnvOverlay {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    max_api_calls: Option<u32>,
    timeout_seconds: Option<u64>,
}

impl EnvOverlay {
    fn from_process_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL").ok(),
            model: std::env::var("LLMCMD_MODEL").ok(),
            max_tokens: std::env::var("LLMCMD_MAX_TOKENS").ok().and_then(|v| v.parse().ok()),
            temperature: std::env::var("LLMCMD_TEMPERATURE").ok().and_then(|v| v.parse().ok()),
            max_api_calls: std::env::var("LLMCMD_MAX_API_CALLS").ok().and_then(|v| v.parse().ok()),
            timeout_seconds: std::env::var("LLMCMD_TIMEOUT_SECONDS").ok().and_then(|v| v.parse().ok()),
        }
    }
}

/// Fully resolved configuration for one process invocation.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_api_calls: u32,
    pub timeout: Duration,
    pub stats: bool,
    pub verbose: bool,
    pub input_allow_list: Vec<String>,
    pub output_allow_list: Vec<String>,
    /// Whether `-` appeared among `-i` inputs: bind real process stdin onto
    /// the reserved FD instead of (or alongside) any allow-listed files.
    pub stdin_requested: bool,
    /// Whether `-` was given as `-o`: write the session's output to the
    /// reserved stdout FD, which is already the table's default writer.
    pub stdout_requested: bool,
    pub preset: Option<String>,
    pub prompt: String,
    pub pricing_catalog_path: Option<PathBuf>,
}

impl RuntimeConfig {
    /// Layer built-in defaults, an optional TOML config file, environment
    /// variables, then CLI flags (later layers win). Never makes a network
    /// call; pure layering over in-memory/file/env data.
    pub fn resolve(cli: CliArgs) -> Result<Self, EngineError> {
        let mut file = ConfigFile::default();
        if let Some(path) = &cli.config_path {
            file = load_config_file(path)?;
        }
        let env = EnvOverlay::from_process_env();

        let preset_def = match &cli.preset {
            Some(key) => Some(resolve_preset(key).ok_or_else(|| {
                EngineError::ConfigError(format!("unknown preset '{key}'"))
            })?),
            None => None,
        };

        let api_key = env
            .api_key
            .ok_or_else(|| EngineError::ConfigError("OPENAI_API_KEY is not set".to_string()))?;

        let base_url = cli
            .config_path
            .as_ref()
            .map(|_| ())
            .and(file.base_url.clone())
            .or(env.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let model = cli
            .model
            .or(env.model)
            .or(file.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_tokens = cli
            .max_tokens
            .or(env.max_tokens)
            .or(file.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let temperature = cli
            .temperature
            .or(env.temperature)
            .or(file.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE);

        let max_api_calls = cli
            .max_api_calls
            .or(env.max_api_calls)
            .or(file.max_api_calls)
            .unwrap_or(DEFAULT_MAX_API_CALLS);

        let timeout_seconds = cli
            .timeout_seconds
            .or(env.timeout_seconds)
            .or(file.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        let prompt = match (cli.prompt.clone(), preset_def.map(|p| p.prompt_template.to_string())) {
            (Some(p), _) => p,
            (None, Some(template)) => template,
            (None, None) => {
                return Err(EngineError::ConfigError(
                    "a prompt is required (positional argument or --preset)".to_string(),
                ))
            }
        };

        let stdin_requested = cli.inputs.iter().any(|i| i == "-");
        let stdout_requested = cli.output.as_deref() == Some("-");

        let mut input_allow_list: Vec<String> = cli.inputs.iter().filter(|i| *i != "-").cloned().collect();
        if let Some(preset) = preset_def {
            for extra in preset.default_inputs {
                if !input_allow_list.contains(&extra.to_string()) {
                    input_allow_list.push(extra.to_string());
                }
            }
        }
        let output_allow_list: Vec<String> = cli
            .output
            .iter()
            .filter(|o| *o != "-")
            .cloned()
            .collect();

        Ok(RuntimeConfig {
            api_key,
            base_url,
            model,
            max_tokens,
            temperature,
            max_api_calls,
            timeout: Duration::from_secs(timeout_seconds),
            stats: cli.stats,
            verbose: cli.verbose,
            input_allow_list,
            output_allow_list,
            stdin_requested,
            stdout_requested,
            preset: cli.preset,
            prompt,
            pricing_catalog_path: file.pricing_catalog,
        })
    }
}

fn load_config_file(path: &Path) -> Result<ConfigFile, EngineError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| EngineError::ConfigError(format!("cannot read config '{}': {e}", path.display())))?;
    toml::from_str(&text)
        .map_err(|e| EngineError::ConfigError(format!("malformed config '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> CliArgs {
        CliArgs {
            prompt: Some("summarize this".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn resolve_requires_api_key() {
        std::env::remove_var("OPENAI_API_KEY");
        let err = RuntimeConfig::resolve(base_cli()).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn resolve_fills_defaults_when_api_key_present() {
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::remove_var("LLMCMD_MODEL");
        let cfg = RuntimeConfig::resolve(base_cli()).unwrap();
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(cfg.max_api_calls, DEFAULT_MAX_API_CALLS);
        assert_eq!(cfg.prompt, "summarize this");
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn cli_flags_win_over_env() {
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("LLMCMD_MODEL", "env-model");
        let cli = CliArgs {
            model: Some("cli-model".to_string()),
            ..base_cli()
        };
        let cfg = RuntimeConfig::resolve(cli).unwrap();
        assert_eq!(cfg.model, "cli-model");
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("LLMCMD_MODEL");
    }

    #[test]
    fn unknown_preset_is_a_config_error() {
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let cli = CliArgs {
            prompt: None,
            preset: Some("not-a-real-preset".to_string()),
            ..Default::default()
        };
        let err = RuntimeConfig::resolve(cli).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn missing_prompt_without_preset_is_a_config_error() {
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let err = RuntimeConfig::resolve(CliArgs::default()).unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn dash_input_is_excluded_from_the_allow_list_but_flagged_as_requested() {
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let cli = CliArgs {
            inputs: vec!["-".to_string(), "notes.txt".to_string()],
            ..base_cli()
        };
        let cfg = RuntimeConfig::resolve(cli).unwrap();
        assert_eq!(cfg.input_allow_list, vec!["notes.txt".to_string()]);
        assert!(cfg.stdin_requested);
        std::env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    fn dash_output_is_flagged_without_entering_the_allow_list() {
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        let cli = CliArgs {
            output: Some("-".to_string()),
            ..base_cli()
        };
        let cfg = RuntimeConfig::resolve(cli).unwrap();
        assert!(cfg.output_allow_list.is_empty());
        assert!(cfg.stdout_requested);
        std::env::remove_var("OPENAI_API_KEY");
    }
}
