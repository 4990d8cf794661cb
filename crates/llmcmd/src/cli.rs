//! Command-line surface: flags, presets, and the positional prompt argument,
//! all parsed with `clap`'s derive macros.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "llmcmd", version, about = "Run a local LLM tool-execution session over text files")]
pub struct Cli {
    /// Input file to make readable to the session. Repeatable; `-` means stdin.
    #[arg(short = 'i', long = "input", value_name = "file|-")]
    pub inputs: Vec<String>,

    /// Output file the session may write to. `-` means stdout (the default).
    #[arg(short = 'o', long = "output", value_name = "file|-")]
    pub output: Option<String>,

    /// The task prompt. Required unless `--preset` supplies one.
    pub prompt: Option<String>,

    /// Use a built-in prompt template instead of (or alongside) a positional prompt.
    #[arg(long)]
    pub preset: Option<String>,

    /// List built-in presets and exit without starting a session.
    #[arg(long)]
    pub list_presets: bool,

    /// Path to a TOML config file.
    #[arg(long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Seed a starter config file under the user config directory and exit.
    #[arg(long)]
    pub install: bool,

    #[arg(long)]
    pub model: Option<String>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_api_calls: Option<u32>,

    /// Wall-clock session deadline, in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print a usage/cost summary to stderr after the session ends.
    #[arg(long)]
    pub stats: bool,

    /// Raise log verbosity (equivalent to RUST_LOG=debug for this crate).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_config_args(self) -> llmcmd_config::CliArgs {
        llmcmd_config::CliArgs {
            inputs: self.inputs,
            output: self.output,
            prompt: self.prompt,
            preset: self.preset,
            config_path: self.config,
            model: self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            max_api_calls: self.max_api_calls,
            timeout_seconds: self.timeout,
            stats: self.stats,
            verbose: self.verbose,
        }
    }
}
