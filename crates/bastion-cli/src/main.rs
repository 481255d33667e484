//! Entry point for the plugin orchestration core (§9): resolve config, set
//! up logging, load plugin manifests, spawn one worker bridge per plugin,
//! build the orchestrator, and serve the chat HTTP surface.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bastion_bridge::{BridgeTimeouts, WorkerBridge};
use bastion_chat::{AppState, InMemoryConversationStore, LlmProfiles};
use bastion_config::Config;
use bastion_db::InMemoryDbBackend;
use bastion_memory::InProcessStore;
use bastion_orchestrator::{Orchestrator, OrchestratorHandle};
use bastion_plugins::LoadedPlugin;
use bastion_syscall::{RateLimiter, SyscallHandler};
use bastion_telemetry::{LogConfig, LogFormat};

/// The command that runs sandboxed plugin entry files. Plugin manifests
/// declare a JS entry point (§3 `main`); this core assumes a `node`
/// runtime is on `PATH`.
const PLUGIN_RUNTIME_COMMAND: &str = "node";

/// The plugin orchestration core.
#[derive(Parser)]
#[command(name = "bastion")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format.
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Boot the orchestrator and serve the chat HTTP surface.
    Run {
        /// Path to a TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Validate configuration and plugin manifests without serving.
    Doctor {
        /// Path to a TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let format = match cli.log_format.as_str() {
        "json" => LogFormat::Json,
        "compact" => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };
    bastion_telemetry::setup_logging(&LogConfig::new(level).with_format(format)).context("setting up logging")?;

    match cli.command {
        Commands::Run { config } => run(config.as_deref()).await,
        Commands::Doctor { config } => doctor(config.as_deref()).await,
    }
}

async fn doctor(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = bastion_config::load(config_path).context("loading configuration")?;
    let plugins = load_plugins(&config);
    tracing::info!(plugin_count = plugins.len(), bind_address = %config.bind_address, "configuration and manifests are valid");
    for plugin in &plugins {
        tracing::info!(plugin_id = %plugin.manifest.id, version = %plugin.manifest.version, "plugin manifest loaded");
    }
    Ok(())
}

async fn run(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = bastion_config::load(config_path).context("loading configuration")?;
    let bind_address = config.bind_address.clone();

    let handle = OrchestratorHandle::new();

    let syscall_handler = Arc::new(SyscallHandler::new(
        Arc::new(RateLimiter::with_limits(
            config.rate_limit_window_secs as i64,
            config.rate_limit_budget as usize,
        )),
        Arc::new(InMemoryDbBackend::new()),
        Arc::new(InProcessStore::new()),
        reqwest::Client::new(),
        Arc::new(handle.clone()),
    ));

    let plugins = load_plugins(&config);
    let timeouts = BridgeTimeouts::from_millis(config.sandbox_ready_timeout_ms, config.hook_timeout_ms, config.syscall_timeout_ms);

    let mut bridges = HashMap::new();
    for plugin in &plugins {
        let permissions = Arc::new(plugin.manifest.permissions.clone());
        let init_payload = serde_json::json!({
            "pluginId": plugin.manifest.id.as_ref(),
            "config": plugin.config,
        });
        match WorkerBridge::spawn_process(
            plugin.manifest.id.clone(),
            PLUGIN_RUNTIME_COMMAND,
            &[],
            &plugin.entry_path,
            init_payload,
            syscall_handler.clone(),
            permissions,
            timeouts.clone(),
        )
        .await
        {
            Ok(bridge) => {
                bridges.insert(plugin.manifest.id.clone(), Arc::new(bridge));
            }
            Err(e) => {
                tracing::warn!(plugin_id = %plugin.manifest.id, error = %e, "plugin failed to start, orchestrator proceeds without it");
            }
        }
    }

    handle
        .set(Orchestrator::new(plugins, bridges))
        .map_err(|_| anyhow::anyhow!("orchestrator handle already filled"))?;

    // The model backend is an external collaborator (bastion-llm only
    // defines the `LlmProvider` seam); a real deployment registers its
    // provider(s) here before `AppState::new`.
    let llm = Arc::new(bastion_llm::testing::ScriptedProvider {
        final_text: String::new(),
    });
    let profiles = Arc::new(LlmProfiles::new(llm));
    let store = Arc::new(InMemoryConversationStore::new());
    let state = AppState::new(handle, profiles, store);

    let router = bastion_chat::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_address).await.context("binding chat HTTP listener")?;
    tracing::info!(%bind_address, "serving chat HTTP surface");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving chat HTTP surface")
}

fn load_plugins(config: &Config) -> Vec<LoadedPlugin> {
    let extra_paths: Vec<PathBuf> = config.extra_plugin_paths.iter().map(PathBuf::from).collect();
    bastion_plugins::load_plugins(
        std::path::Path::new(&config.plugin_dir),
        &extra_paths,
        &HashMap::new(),
        &config.plugin_deny_list,
    )
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
