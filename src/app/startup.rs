//! Binary startup
//!
//! Configuration is loaded before the logger so that file settings can pick the log
//! format and destination; a configuration error is reported once logging is up.
//! SIGHUP re-reads the configuration and applies its log level; the format and
//! destination stay as they were at startup.

use crate::app::cli::{logging_options, Args};
use crate::app::listing::print_plugins;
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::{init_logging, reconfigure_level};
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version::{build_time, get_api_version, git_hash};
use crate::gateway::api::{MemoryDatabase, MemoryGateway};
use crate::host::api::{ConfigResult, Host, HostConfig};
use crate::plugin::api::{Catalog, LinkedProviders};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

pub const EXIT_SUCCESS: i32 = 0;
/// Startup aborted or the host could not be created
pub const EXIT_FAILURE: i32 = 1;
/// Configuration could not be loaded
pub const EXIT_CONFIG: i32 = 2;

/// Parse arguments, run the host until a termination signal, return the exit code
pub fn startup() -> i32 {
    let args = Args::parse_from_env();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("plughost: unable to start the async runtime: {}", error);
            return EXIT_FAILURE;
        }
    };

    runtime.block_on(run(args))
}

async fn run(args: Args) -> i32 {
    let use_color = args.use_color();

    let (mut config, config_error) = match HostConfig::load(args.config_file.as_deref()).await {
        Ok(config) => (config, None),
        Err(error) => (HostConfig::default(), Some(error)),
    };
    args.apply_to(&mut config);

    let options = match logging_options(&config.logging, use_color) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("plughost: {}", error);
            return EXIT_CONFIG;
        }
    };
    if let Err(error) = init_logging(&options) {
        eprintln!("plughost: {}", error);
        return EXIT_CONFIG;
    }
    if let Some(error) = config_error {
        log_error_with_context(&error, "Loading configuration");
        return EXIT_CONFIG;
    }

    log::info!(
        "plughost {} starting (plugin API {}, built {}, commit {})",
        env!("CARGO_PKG_VERSION"),
        get_api_version(),
        build_time(),
        git_hash()
    );
    log::debug!("Configuration: {:?}", config);

    let catalog = Catalog::new(LinkedProviders, config.catalog_config());
    if args.list_plugins {
        print_plugins(&catalog.discover(), use_color);
        return EXIT_SUCCESS;
    }

    let mut host = match Host::new(
        catalog,
        Arc::new(MemoryGateway::new()),
        Arc::new(MemoryDatabase::new()),
        config,
    ) {
        Ok(host) => host,
        Err(error) => {
            log_error_with_context(&error, "Creating host");
            return EXIT_FAILURE;
        }
    };

    let coordinator = ShutdownCoordinator::new();
    coordinator.install_signal_handlers();
    spawn_level_reloader(&coordinator, &args);

    let started = tokio::select! {
        result = host.start() => Some(result),
        _ = coordinator.wait() => None,
    };

    let status = match started {
        Some(Ok(())) => {
            if !host.faults().is_empty() {
                log::warn!(
                    "{} fault(s) recorded during startup; {} plugin(s) running",
                    host.faults().len(),
                    host.loaded_plugins().await.len()
                );
            }
            log::info!("Serving; send SIGINT or SIGTERM to stop");
            coordinator.wait().await;
            EXIT_SUCCESS
        }
        Some(Err(error)) => {
            log_error_with_context(&error, "Starting host");
            EXIT_FAILURE
        }
        None => {
            log::warn!("Startup interrupted during {}", host.state());
            EXIT_SUCCESS
        }
    };

    if let Some(report) = host.stop().await {
        if !report.drained {
            log::warn!(
                "{} plugin task(s) did not finish within the grace period",
                report.aborted
            );
        }
    }
    status
}

fn spawn_level_reloader(coordinator: &ShutdownCoordinator, args: &Args) {
    let mut reloads = coordinator.subscribe_reload();
    let args = args.clone();
    tokio::spawn(async move {
        loop {
            match reloads.recv().await {
                Ok(()) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
            let level = match reloaded_level(&args).await {
                Ok(level) => level,
                Err(error) => {
                    log::warn!("Reload: keeping the current log level: {}", error);
                    continue;
                }
            };
            match reconfigure_level(&level) {
                Ok(()) => log::info!("Reload: log level is now {}", level),
                Err(error) => log::warn!("Reload: {}", error),
            }
        }
    });
}

/// Log level from a fresh read of the configuration, flags still taking precedence
async fn reloaded_level(args: &Args) -> ConfigResult<String> {
    let mut config = HostConfig::load(args.config_file.as_deref()).await?;
    args.apply_to(&mut config);
    Ok(logging_options(&config.logging, false)?.level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::api::ConfigError;

    fn args_for(file: &std::path::Path) -> Args {
        Args {
            config_file: Some(file.to_path_buf()),
            ..Args::default()
        }
    }

    #[tokio::test]
    async fn test_reloaded_level_follows_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plughost.toml");
        std::fs::write(&file, "[logging]\nlevel = \"info\"\n").unwrap();
        let args = args_for(&file);
        assert_eq!(reloaded_level(&args).await.unwrap(), "info");

        std::fs::write(&file, "[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(reloaded_level(&args).await.unwrap(), "debug");
    }

    #[tokio::test]
    async fn test_reloaded_level_keeps_flag() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plughost.toml");
        std::fs::write(&file, "[logging]\nlevel = \"debug\"\n").unwrap();
        let args = Args {
            log_level: Some("warn".to_string()),
            ..args_for(&file)
        };
        assert_eq!(reloaded_level(&args).await.unwrap(), "warn");
    }

    #[tokio::test]
    async fn test_reloaded_level_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = args_for(&dir.path().join("gone.toml"));
        assert!(matches!(
            reloaded_level(&args).await,
            Err(ConfigError::NotFound { .. })
        ));
    }
}
