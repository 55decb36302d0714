//! chant-ui - command-line client for the chant counter
//!
//! Identify by phone number or username, add daily chant counts, and view
//! personal and global totals.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chant_common::config::{
    write_toml_config, ClientOverrides, ConfigResolver, LoggingConfig, NetworkFailurePolicy,
};
use chant_ui::commands::{self, ScreenCommand};
use chant_ui::HttpGateway;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for chant-ui
#[derive(Parser, Debug)]
#[command(name = "chant-ui")]
#[command(about = "Chant counter client")]
#[command(version)]
struct Args {
    /// Backend base URL, e.g. http://localhost:8080/api [env: CHANT_API_URL]
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Per-request timeout in seconds [env: CHANT_TIMEOUT_SECS]
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// What an add-chant transport failure means: "fail" or "provision"
    /// [env: CHANT_NETWORK_POLICY]
    #[arg(long, global = true)]
    network_policy: Option<NetworkFailurePolicy>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(flatten)]
    Screen(ScreenCommand),

    /// Write the resolved settings to the config file
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Log to the configured file, or to stderr when none is set
///
/// RUST_LOG wins over the config file's [logging] level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("chant_ui={0},chant_common={0}", logging.level).into()
    });

    let log_file = logging.open_log_file().context("Failed to open log file")?;
    let (file_layer, stderr_layer) = match log_file {
        Some(file) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            None,
        ),
        None => (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let resolver = ConfigResolver::new(args.config.clone());
    let toml_config = resolver.load_toml();

    init_tracing(&toml_config.logging)?;

    info!(
        "Starting chant-ui v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let overrides = ClientOverrides {
        api_base_url: args.api_url,
        request_timeout_secs: args.timeout_secs,
        network_failure_policy: args.network_policy,
    };
    let settings = resolver.resolve_loaded(&overrides, &toml_config);
    debug!(
        api = %settings.api_base_url,
        timeout = ?settings.request_timeout,
        policy = %settings.network_failure_policy,
        "Resolved settings"
    );

    match args.command {
        Command::InitConfig { force } => {
            let path = resolver
                .config_path()
                .context("Could not determine a config file location; pass --config")?;
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            write_toml_config(&settings.to_toml_config(), &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Command::Screen(screen) => {
            let gateway = HttpGateway::new(&settings.api_base_url, settings.request_timeout)
                .context("Failed to create backend client")?;

            let mut stdout = std::io::stdout();
            let ok = commands::run(
                screen,
                Arc::new(gateway),
                settings.network_failure_policy,
                &mut stdout,
            )
            .await?;

            if !ok {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chant_common::config::ENV_TIMEOUT_SECS;

    #[test]
    fn test_args_leave_environment_to_resolver() {
        // An unparseable env value must not fail argument parsing
        std::env::set_var(ENV_TIMEOUT_SECS, "soon");
        let args = Args::try_parse_from(["chant-ui", "leaderboard"]);
        std::env::remove_var(ENV_TIMEOUT_SECS);

        let args = args.unwrap();
        assert!(args.timeout_secs.is_none());
        assert!(args.api_url.is_none());
        assert!(args.network_policy.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "chant-ui",
            "stats",
            "--phone",
            "5551234567",
            "--timeout-secs",
            "3",
            "--network-policy",
            "provision",
        ])
        .unwrap();

        assert_eq!(args.timeout_secs, Some(3));
        assert_eq!(args.network_policy, Some(NetworkFailurePolicy::Provision));
        assert!(matches!(args.command, Command::Screen(ScreenCommand::Stats { .. })));
    }
}
