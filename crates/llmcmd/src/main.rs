mod cli;

use clap::Parser;
use cli::Cli;
use llmcmd_broker::{Broker, BrokerConfig};
use llmcmd_config::RuntimeConfig;
use llmcmd_core::SessionStats;
use llmcmd_fd::{FdTable, STDIN};
use llmcmd_session::{ExitOutcome, FileAuditLog, Session, SessionConfig};
use llmcmd_vfs::Vfs;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

/// Weighted-unit budget granted to a session up front, pending a richer
/// per-plan quota model.
const DEFAULT_INITIAL_BUDGET: f64 = 100_000.0;

const SYSTEM_PROMPT: &str = "You are llmcmd, a tool-execution agent. You can only affect the world \
    through the read, write, spawn, tee, close, and exit tools; you have no other way to see files \
    or run programs. Prefer small, composable spawns (grep, sed, cut, sort, ...) over reading whole \
    files into the conversation. Call exit as soon as the task is done.";

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list_presets {
        for (key, description) in llmcmd_config::list_presets() {
            println!("{key}\t{description}");
        }
        std::process::exit(0);
    }

    if cli.install {
        match llmcmd_config::install() {
            Ok(Some(path)) => {
                println!("wrote {}", path.display());
                std::process::exit(0);
            }
            Ok(None) => {
                eprintln!("could not determine a config directory for this platform");
                std::process::exit(1);
            }
            Err(err) => {
                eprintln!("install failed: {err}");
                std::process::exit(1);
            }
        }
    }

    let config = match RuntimeConfig::resolve(cli.into_config_args()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(1);
        }
    };

    match run(config).await {
        Ok(outcome) => {
            if let Some(message) = &outcome.message {
                println!("{message}");
            }
            std::process::exit(outcome.code as i32);
        }
        Err(err) => {
            eprintln!("llmcmd: {err}");
            std::process::exit(2);
        }
    }
}

/// Whether fd 0 should carry real process stdin: either `-i -` was given
/// explicitly, or no inputs were given at all and stdin is piped rather
/// than an interactive terminal.
fn should_bind_stdin(stdin_requested: bool, input_allow_list: &[String]) -> bool {
    let stdin_is_pipe = !std::io::stdin().is_terminal();
    stdin_requested || llmcmd_session::stdin_auto_binds(input_allow_list, stdin_is_pipe)
}

async fn run(config: RuntimeConfig) -> anyhow::Result<ExitOutcome> {
    let pricing_catalog = llmcmd_config::load_pricing_catalog(config.pricing_catalog_path.as_deref())?;
    let stats = Arc::new(SessionStats::new());

    let broker = Broker::new(
        BrokerConfig {
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            request_timeout: config.timeout,
        },
        pricing_catalog,
        DEFAULT_INITIAL_BUDGET,
        Arc::clone(&stats),
    )?;

    let root_dir = std::env::current_dir()?;
    let vfs = Vfs::new(root_dir, config.input_allow_list.clone(), config.output_allow_list.clone());

    let table = Arc::new(FdTable::new());
    if should_bind_stdin(config.stdin_requested, &config.input_allow_list) {
        let stdin_fd = llmcmd_session::resolve_dash("-").expect("\"-\" always resolves to a fd");
        debug_assert_eq!(stdin_fd, STDIN);
        let mut data = Vec::new();
        std::io::Read::read_to_end(&mut std::io::stdin(), &mut data)?;
        table.bind_stdin(data).await?;
    }

    let session_config = SessionConfig {
        model: config.model.clone(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt: config.prompt.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        max_api_calls: config.max_api_calls,
        deadline: config.timeout,
    };

    let audit_path: PathBuf = PathBuf::from(".llmcmd-audit.jsonl");
    let outcome = match FileAuditLog::init(&audit_path, Arc::clone(&stats)) {
        Ok(audit) => {
            let session = Session::new(table, broker, vfs, Arc::clone(&stats), Arc::new(audit), session_config);
            session.run().await
        }
        Err(err) => {
            tracing::warn!(%err, "could not open audit log, continuing without one");
            let session = Session::without_audit(table, broker, vfs, Arc::clone(&stats), session_config);
            session.run().await
        }
    }?;

    if config.stats {
        let snapshot = stats.snapshot();
        eprintln!(
            "api_calls={} bytes_read={} bytes_written={} tasks_spawned={} retries={} weighted_usage={:.2}",
            snapshot.api_calls,
            snapshot.bytes_read,
            snapshot.bytes_written,
            snapshot.tasks_spawned,
            snapshot.retries,
            snapshot.weighted_usage_total,
        );
    }

    Ok(outcome)
}
