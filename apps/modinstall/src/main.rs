//! modinstall - Install web application modules from source archives
//!
//! This is the CLI front-end. It loads configuration, wires the installer
//! crates together and renders their results and events.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use modinstall_config::Config;
use modinstall_events::{EventEmitter, EventReceiver, EventSender};
use modinstall_install::{InstallConfig, InstallContext, Installer};
use modinstall_manifest::PackageIdentifier;
use modinstall_migrate::{MigrationRunner, SqliteMigrationRunner};
use modinstall_net::{HttpFetcher, NetClient, NetConfig};
use modinstall_types::{ColorChoice, MigrationTarget};
use std::path::Path;
use std::process;
use std::sync::Arc;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Application error: {}", e);
            if !json_mode {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}

/// Main application logic; `Ok(false)` means the command ran and failed
async fn run(cli: Cli) -> Result<bool, CliError> {
    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global);
    config.validate()?;

    init_tracing(cli.global.json, cli.global.debug, &config.log_dir());
    info!("Starting modinstall v{}", env!("CARGO_PKG_VERSION"));

    let color = cli.global.color.unwrap_or(config.general.color);
    let renderer = OutputRenderer::new(cli.global.json, color);

    let colors_enabled = match color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
    };
    let mut event_handler = EventHandler::new(colors_enabled, cli.global.debug, cli.global.json);

    let (event_sender, event_receiver) = modinstall_events::channel();
    let output = execute_command_with_events(
        cli.command,
        config,
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&output)?;

    let success = !matches!(&output, CommandOutput::Install(result) if !result.success);
    info!(success, "Command finished");
    Ok(success)
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    config: Config,
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, config, event_sender));
    let mut events_open = true;

    // Handle events concurrently with command execution
    loop {
        select! {
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv(), if events_open => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => events_open = false,
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    config: Config,
    events: EventSender,
) -> Result<CommandOutput, CliError> {
    let operation = command.name();
    events.emit_operation_started(operation);

    let output = match command {
        Commands::Install { url, reference } => {
            let install_config = InstallConfig::from_config(&config)?;
            let client = NetClient::new(NetConfig::from(&config.network))?;
            let fetcher = HttpFetcher::new(client)
                .with_timeout(config.fetch_timeout())
                .with_event_sender(events.clone());
            let runner = open_runner(&config, &events).await?;

            let installer = Installer::new(install_config, Arc::new(fetcher), Arc::new(runner));
            let mut context = InstallContext::new(url).with_event_sender(events.clone());
            if let Some(reference) = reference {
                context = context.with_reference(reference);
            }

            CommandOutput::Install(installer.install(context).await)
        }

        Commands::Identify { dir } => {
            let identifier = PackageIdentifier::from_config(&config.manifest);
            CommandOutput::Identify(identifier.identify(&dir).await?)
        }

        Commands::Migrations { target, apply } => {
            let runner = open_runner(&config, &events).await?;
            let target = MigrationTarget::parse(&target);
            let pending = runner.pending_migrations(&target).await?;
            let applied = if apply {
                Some(runner.apply_pending(&target).await?)
            } else {
                None
            };
            CommandOutput::Migrations {
                target,
                pending,
                applied,
            }
        }
    };

    let success = !matches!(&output, CommandOutput::Install(result) if !result.success);
    events.emit_operation_completed(operation, success);
    Ok(output)
}

/// SQLite runner resolving namespaces under the target root
async fn open_runner(
    config: &Config,
    events: &EventSender,
) -> Result<SqliteMigrationRunner, CliError> {
    let mut runner = SqliteMigrationRunner::open(&config.database_path())
        .await?
        .with_event_sender(events.clone());
    if let Some(target_root) = &config.paths.target_root {
        runner = runner.with_namespace_root(&config.migration.namespace_prefix, target_root);
    }
    Ok(runner)
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool, log_dir: &Path) {
    // Check if debug logging is enabled
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let open_log_file = || -> std::io::Result<(std::path::PathBuf, std::fs::File)> {
        std::fs::create_dir_all(log_dir)?;
        let log_file = log_dir.join(format!(
            "modinstall-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));
        let file = std::fs::File::create(&log_file)?;
        Ok((log_file, file))
    };

    let debug_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new("info,modinstall=debug,modinstall_install=debug")
        })
    };

    if json_mode {
        // JSON mode: suppress all console output to avoid contaminating JSON
        if debug_enabled {
            if let Ok((_, file)) = open_log_file() {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(debug_filter())
                    .init();
                return;
            }
        }
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else if debug_enabled {
        // Debug mode: structured JSON logs to file
        match open_log_file() {
            Ok((path, file)) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(debug_filter())
                    .init();

                eprintln!("Debug logging enabled: {}", path.display());
            }
            Err(e) => {
                eprintln!("Warning: Failed to create log file: {e}");
                // Fallback to stderr
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(debug_filter())
                    .init();
            }
        }
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) {
    if let Some(color) = global.color {
        config.general.color = color;
    }
    if let Some(path) = &global.target_root {
        config.paths.target_root = Some(path.clone());
    }
    if let Some(path) = &global.staging_root {
        config.paths.staging_root = Some(path.clone());
    }
    if let Some(path) = &global.database {
        config.paths.database_path = Some(path.clone());
    }
    if global.insecure {
        config.network.verify_tls = false;
    }
}
