//! Host / Orchestrator
//!
//! Owns the plugin table and drives every loaded plugin through the lifecycle:
//!
//! ```text
//! Constructing -> PreInit -> Init -> [connect] -> PostInit -> [commands] -> Ready -> Shutdown
//! ```
//!
//! Each stage fans out one task per plugin on the worker pool and joins them all
//! before the next stage starts. Plugin faults are handled at that barrier: Severe
//! is logged, Fatal unloads the plugin, an unclassified panic is treated as Severe.
//! Only infrastructure failures (pool, gateway, listener registry) abort `start()`.

use crate::core::logging::{log_fatal, log_severe, log_unclassified};
use crate::gateway::api::{ChatGateway, CommandDefinition, DatabaseRegistrar};
use crate::host::commands::aggregate_commands;
use crate::host::config::HostConfig;
use crate::host::context::HostHandle;
use crate::host::error::{HostError, HostResult};
use crate::host::pool::{ShutdownReport, WorkerPool};
use crate::host::records::{FaultClass, FaultRecord};
use crate::core::error_handling::panic_message;
use crate::host::stage::{describe_join_error, run_stage, StageResult, TaskOutcome};
use crate::host::state::{HostState, Stage};
use crate::host::table::PluginTable;
use crate::listeners::api::ListenerRegistry;
use crate::plugin::api::{Catalog, FaultResult, LoadedPlugin, PluginInfo};
use futures::future::join_all;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

pub struct Host {
    catalog: Catalog,
    gateway: Arc<dyn ChatGateway>,
    database: Arc<dyn DatabaseRegistrar>,
    config: HostConfig,
    pool: WorkerPool,
    table: PluginTable,
    listeners: Arc<ListenerRegistry>,
    state: HostState,
    // Last stage entered; infrastructure faults are recorded against it
    stage: Stage,
    faults: Vec<FaultRecord>,
    discovered: usize,
    submitted: Vec<CommandDefinition>,
}

impl Host {
    /// Discover plugins and register each one with the listener registry.
    /// Construction faults are recorded; the failing plugins never enter the table.
    pub fn new(
        catalog: Catalog,
        gateway: Arc<dyn ChatGateway>,
        database: Arc<dyn DatabaseRegistrar>,
        config: HostConfig,
    ) -> HostResult<Self> {
        let discovery = catalog.discover();

        let faults: Vec<FaultRecord> = discovery
            .failures
            .iter()
            .map(|failure| {
                FaultRecord::new(
                    FaultClass::Construction,
                    failure.plugin_name(),
                    Stage::Construct,
                    failure.to_string(),
                )
            })
            .collect();

        let listeners = Arc::new(ListenerRegistry::new(gateway.pre_connection()));
        for plugin in &discovery.plugins {
            listeners.register(plugin.name())?;
        }

        let discovered = discovery.plugins.len();
        log::info!(
            "Host: {} plugin(s) loaded, parallelism {}",
            discovered,
            config.max_parallelism
        );

        Ok(Self {
            catalog,
            gateway,
            database,
            pool: WorkerPool::new(config.max_parallelism),
            config,
            table: PluginTable::new(discovery.plugins),
            listeners,
            state: HostState::Constructing,
            stage: Stage::Construct,
            faults,
            discovered,
            submitted: Vec::new(),
        })
    }

    /// Run every stage. Valid once, from `Constructing`.
    pub async fn start(&mut self) -> HostResult<()> {
        if self.state != HostState::Constructing {
            return Err(HostError::InvalidTransition {
                from: self.state,
                to: HostState::PreInit,
                operation: "start",
            });
        }

        let started = Instant::now();
        match self.run_startup().await {
            Ok(()) => {
                log::info!(
                    "Host: ready in {:?}, {} of {} plugin(s) loaded",
                    started.elapsed(),
                    self.table.len().await,
                    self.discovered
                );
                Ok(())
            }
            Err(error) => {
                if error.is_infrastructure() {
                    self.faults.push(FaultRecord::new(
                        FaultClass::Infrastructure,
                        None,
                        self.stage,
                        error.to_string(),
                    ));
                }
                log::error!("Host: startup aborted during {}: {}", self.stage, error);
                Err(error)
            }
        }
    }

    async fn run_startup(&mut self) -> HostResult<()> {
        self.run_lifecycle_stage(Stage::PreInit).await?;
        self.run_lifecycle_stage(Stage::Init).await?;
        self.connect().await?;
        self.run_lifecycle_stage(Stage::PostInit).await?;
        self.submit_commands().await?;
        self.run_lifecycle_stage(Stage::Ready).await
    }

    async fn run_lifecycle_stage(&mut self, stage: Stage) -> HostResult<()> {
        self.state.advance(stage.into(), "start")?;
        self.stage = stage;

        let started = Instant::now();
        let plugins = self.table.snapshot().await;
        let results = run_stage(&self.pool, stage, plugins, |plugin| {
            self.stage_task(stage, plugin)
        })
        .await?;

        let mut fatal = Vec::new();
        for result in results {
            if let Some(name) = self.handle_result(stage, result) {
                fatal.push(name);
            }
        }
        join_all(fatal.iter().map(|name| self.unload(name))).await;

        log::debug!(
            "Host: stage {} complete in {:?}, {} plugin(s) loaded",
            stage,
            started.elapsed(),
            self.table.len().await
        );
        Ok(())
    }

    fn stage_task(
        &self,
        stage: Stage,
        plugin: LoadedPlugin,
    ) -> impl Future<Output = FaultResult> + Send + 'static {
        let handle = HostHandle::new(
            &plugin,
            self.listeners.clone(),
            self.database.clone(),
            self.table.clone(),
        );
        async move {
            let instance = plugin.instance;
            match stage {
                Stage::Construct => Ok(()),
                Stage::PreInit => instance.pre_init(handle.listeners()).await,
                Stage::Init => instance.init(handle.listeners()).await,
                Stage::PostInit => instance.post_init(&handle).await,
                Stage::Ready => instance.on_ready(&handle).await,
            }
        }
    }

    /// Log and record the outcome; returns the plugin name if it must be unloaded
    fn handle_result(&mut self, stage: Stage, result: StageResult) -> Option<String> {
        let name = result.plugin.name().to_string();
        match result.outcome {
            TaskOutcome::Completed => {
                log::trace!("Host: '{}' completed {}", name, stage);
            }
            TaskOutcome::Faulted(fault) if fault.is_fatal() => {
                let cause = fault.cause().to_string();
                log_fatal(&name, stage, &cause);
                self.record(FaultClass::Fatal, &name, stage, cause);
                return Some(name);
            }
            TaskOutcome::Faulted(fault) => {
                let cause = fault.cause().to_string();
                log_severe(&name, stage, &cause);
                self.record(FaultClass::Severe, &name, stage, cause);
            }
            TaskOutcome::Unclassified(cause) => {
                log_unclassified(&name, stage, &cause);
                log_severe(&name, stage, &cause);
                self.record(FaultClass::Severe, &name, stage, cause);
            }
        }
        None
    }

    fn record(&mut self, class: FaultClass, plugin: &str, stage: Stage, cause: String) {
        self.faults
            .push(FaultRecord::new(class, Some(plugin), stage, cause));
    }

    async fn connect(&mut self) -> HostResult<()> {
        let connection = self
            .gateway
            .connect()
            .await
            .map_err(|source| HostError::Gateway {
                operation: "connect",
                source,
            })?;
        log::info!(
            "Host: gateway connected (session {})",
            connection.session_id()
        );
        self.listeners.set_connection(connection)?;
        Ok(())
    }

    async fn submit_commands(&mut self) -> HostResult<()> {
        let plugins = self.table.snapshot().await;
        let aggregation = aggregate_commands(&plugins, self.config.command_conflict);

        for (plugin, cause) in aggregation.panicked {
            log_unclassified(&plugin, "commands", &cause);
            log_severe(&plugin, "commands", &cause);
            self.record(FaultClass::Severe, &plugin, Stage::PostInit, cause);
        }

        log::info!(
            "Host: submitting {} command(s)",
            aggregation.batch.len()
        );
        self.gateway
            .submit_commands(aggregation.batch.clone())
            .await
            .map_err(|source| HostError::Gateway {
                operation: "submit commands",
                source,
            })?;
        self.submitted = aggregation.batch;
        Ok(())
    }

    /// Remove a plugin after a fatal fault: table, listeners, close, database.
    async fn unload(&self, name: &str) -> bool {
        let Some(plugin) = self.table.remove(name).await else {
            return false;
        };

        match self.listeners.unregister(name) {
            Ok(detached) => log::debug!("Host: detached {} listener(s) of '{}'", detached, name),
            Err(error) => log::error!("Host: could not detach listeners of '{}': {}", name, error),
        }

        self.close_with_timeout(&plugin).await;

        if plugin.info.needs_database {
            if let Err(error) = self.database.unload(name).await {
                log::warn!("Host: database release for '{}' failed: {}", name, error);
            }
        }

        log::info!("Host: unloaded '{}'", name);
        true
    }

    async fn close_with_timeout(&self, plugin: &LoadedPlugin) {
        let name = plugin.name().to_string();
        let task = {
            let plugin = plugin.clone();
            async move { close_quietly(&plugin).await }
        };
        let handle = match self.pool.spawn(task) {
            Ok(handle) => handle,
            Err(error) => {
                log::error!("Host: could not schedule close of '{}': {}", name, error);
                return;
            }
        };

        match tokio::time::timeout(self.config.close_timeout, handle).await {
            Ok(Ok(Ok(()))) => log::debug!("Host: '{}' closed", name),
            Ok(Ok(Err(cause))) => log::error!("Plugin '{}' failed to close: {}", name, cause),
            Ok(Err(error)) => log::error!(
                "Plugin '{}' failed to close: {}",
                name,
                describe_join_error(error)
            ),
            // Still running on the pool; shutdown will abort it if it never returns
            Err(_) => log::warn!(
                "Plugin '{}' did not close within {:?}",
                name,
                self.config.close_timeout
            ),
        }
    }

    /// Shut down: release databases, close every plugin, drain the pool within the
    /// grace period, then clear the table and the listener registry.
    /// Returns `None` if the host was already stopped.
    pub async fn stop(&mut self) -> Option<ShutdownReport> {
        if self.state == HostState::Shutdown {
            log::debug!("Host: already stopped");
            return None;
        }
        log::info!("Host: shutting down from state {}", self.state);
        self.state = HostState::Shutdown;

        self.catalog.reload();
        let remaining = self.table.snapshot().await;

        for plugin in remaining.iter().filter(|p| p.info.needs_database) {
            if let Err(error) = self.database.unload(plugin.name()).await {
                log::warn!(
                    "Host: database release for '{}' failed: {}",
                    plugin.name(),
                    error
                );
            }
        }

        for plugin in &remaining {
            let task = {
                let name = plugin.name().to_string();
                let plugin = plugin.clone();
                async move {
                    match close_quietly(&plugin).await {
                        Ok(()) => log::debug!("Host: '{}' closed", name),
                        Err(cause) => log::error!("Plugin '{}' failed to close: {}", name, cause),
                    }
                }
            };
            if let Err(error) = self.pool.spawn(task) {
                log::error!(
                    "Host: could not schedule close of '{}': {}",
                    plugin.name(),
                    error
                );
            }
        }

        let report = self.pool.shutdown(self.config.shutdown_grace).await;

        self.table.clear().await;
        if let Err(error) = self.listeners.clear() {
            log::error!("Host: could not clear listener registry: {}", error);
        }

        log::info!(
            "Host: shutdown complete in {:?}, {} task(s) aborted",
            report.elapsed,
            report.aborted
        );
        Some(report)
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Number of plugins constructed by the catalog
    pub fn discovered(&self) -> usize {
        self.discovered
    }

    /// Every fault recorded so far, oldest first
    pub fn faults(&self) -> &[FaultRecord] {
        &self.faults
    }

    pub fn faults_for(&self, plugin: &str) -> Vec<&FaultRecord> {
        self.faults.iter().filter(|r| r.is_for(plugin)).collect()
    }

    /// The command batch accepted by the gateway, empty until then
    pub fn submitted_commands(&self) -> &[CommandDefinition] {
        &self.submitted
    }

    /// Names of the loaded plugins, in load order
    pub async fn loaded_plugins(&self) -> Vec<String> {
        self.table.names().await
    }

    pub async fn is_loaded(&self, name: &str) -> bool {
        self.table.contains(name).await
    }

    pub async fn plugin_info(&self, name: &str) -> Option<Arc<PluginInfo>> {
        self.table.get(name).await.map(|p| p.info)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("state", &self.state)
            .field("pool", &self.pool)
            .field("faults", &self.faults.len())
            .finish_non_exhaustive()
    }
}

/// Run `close()`, turning an error or a panic into a message
async fn close_quietly(plugin: &LoadedPlugin) -> Result<(), String> {
    match AssertUnwindSafe(plugin.instance.close()).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(error.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload))),
    }
}
