//! Host Test Utilities
//!
//! A plugin whose behaviour per stage is scripted, a recorder for hook invocations
//! and a harness wiring a host to the in-memory gateway and database.

use crate::gateway::api::{
    CommandDefinition, DatabaseDescriptor, EventListener, GatewayEvent, MemoryDatabase,
    MemoryGateway,
};
use crate::host::api::{HostConfig, HostHandle, Stage};
use crate::host::host::Host;
use crate::listeners::api::PluginListeners;
use crate::plugin::api::{
    BoxError, Catalog, CatalogConfig, CommandProvider, Fault, FaultExt, FaultKind, FaultResult,
    LoadedPlugin, Plugin, PluginInfo, Provider, StaticProviders,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Records which hook ran for which plugin, and when
#[derive(Default)]
pub struct Recorder {
    entries: Mutex<Vec<(String, Stage, Instant)>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, plugin: &str, stage: Stage) {
        self.entries
            .lock()
            .unwrap()
            .push((plugin.to_string(), stage, Instant::now()));
    }

    pub fn stages_for(&self, plugin: &str) -> Vec<Stage> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _, _)| p == plugin)
            .map(|(_, s, _)| *s)
            .collect()
    }

    pub fn time_of(&self, plugin: &str, stage: Stage) -> Option<Instant> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|(p, s, _)| p == plugin && *s == stage)
            .map(|(_, _, t)| *t)
    }

    pub fn times(&self, stage: Stage) -> Vec<Instant> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, s, _)| *s == stage)
            .map(|(_, _, t)| *t)
            .collect()
    }
}

struct NamedListener(String);

impl EventListener for NamedListener {
    fn name(&self) -> &str {
        &self.0
    }

    fn on_event(&self, _event: &GatewayEvent) {}
}

enum Script {
    Fault(FaultKind, String),
    Panic(String),
}

enum CloseBehaviour {
    Succeed,
    Fail(String),
    Hang,
    Panic,
}

/// Plugin whose hooks do what the test tells them to
pub struct ScriptedPlugin {
    scripts: HashMap<Stage, Script>,
    delays: HashMap<Stage, Duration>,
    listeners: HashMap<Stage, Vec<String>>,
    commands: Option<Vec<CommandDefinition>>,
    panic_in_commands: bool,
    command_calls: Arc<AtomicUsize>,
    database: Option<DatabaseDescriptor>,
    close: CloseBehaviour,
    closed: Arc<AtomicBool>,
    recorder: Option<Arc<Recorder>>,
}

impl ScriptedPlugin {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            delays: HashMap::new(),
            listeners: HashMap::new(),
            commands: None,
            panic_in_commands: false,
            command_calls: Arc::new(AtomicUsize::new(0)),
            database: None,
            close: CloseBehaviour::Succeed,
            closed: Arc::new(AtomicBool::new(false)),
            recorder: None,
        }
    }

    pub fn fail(mut self, stage: Stage, kind: FaultKind, cause: &str) -> Self {
        self.scripts
            .insert(stage, Script::Fault(kind, cause.to_string()));
        self
    }

    pub fn panic_at(mut self, stage: Stage, message: &str) -> Self {
        self.scripts.insert(stage, Script::Panic(message.to_string()));
        self
    }

    pub fn delay(mut self, stage: Stage, duration: Duration) -> Self {
        self.delays.insert(stage, duration);
        self
    }

    /// Add a listener called `name` during `stage` (pre-init or init)
    pub fn listen(mut self, stage: Stage, name: &str) -> Self {
        self.listeners
            .entry(stage)
            .or_default()
            .push(name.to_string());
        self
    }

    pub fn with_commands(mut self, names: &[&str]) -> Self {
        let commands = self.commands.get_or_insert_with(Vec::new);
        for name in names {
            commands.push(CommandDefinition::new(*name, format!("{} command", name)));
        }
        self
    }

    pub fn with_command(mut self, command: CommandDefinition) -> Self {
        self.commands.get_or_insert_with(Vec::new).push(command);
        self
    }

    pub fn panic_in_commands(mut self) -> Self {
        self.panic_in_commands = true;
        self
    }

    /// Declare `needs_database` and register `descriptor` during post-init
    pub fn with_database(mut self, descriptor: DatabaseDescriptor) -> Self {
        self.database = Some(descriptor);
        self
    }

    pub fn close_fails(mut self, cause: &str) -> Self {
        self.close = CloseBehaviour::Fail(cause.to_string());
        self
    }

    pub fn close_hangs(mut self) -> Self {
        self.close = CloseBehaviour::Hang;
        self
    }

    pub fn close_panics(mut self) -> Self {
        self.close = CloseBehaviour::Panic;
        self
    }

    pub fn recorded_by(mut self, recorder: &Arc<Recorder>) -> Self {
        self.recorder = Some(recorder.clone());
        self
    }

    pub fn command_calls(&self) -> Arc<AtomicUsize> {
        self.command_calls.clone()
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }

    fn needs_database(&self) -> bool {
        self.database.is_some()
    }

    async fn run(
        &self,
        stage: Stage,
        plugin: &str,
        listeners: Option<&PluginListeners>,
    ) -> FaultResult {
        if let Some(recorder) = &self.recorder {
            recorder.record(plugin, stage);
        }
        if let Some(delay) = self.delays.get(&stage) {
            tokio::time::sleep(*delay).await;
        }
        if let (Some(listeners), Some(names)) = (listeners, self.listeners.get(&stage)) {
            for name in names {
                listeners
                    .add(Arc::new(NamedListener(name.clone())))
                    .fatal()?;
            }
        }
        match self.scripts.get(&stage) {
            Some(Script::Fault(kind, cause)) => Err(Fault::new(*kind, cause.clone())),
            Some(Script::Panic(message)) => panic!("{}", message),
            None => Ok(()),
        }
    }
}

impl Default for ScriptedPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Plugin for ScriptedPlugin {
    async fn pre_init(&self, listeners: &PluginListeners) -> FaultResult {
        self.run(Stage::PreInit, listeners.plugin_name(), Some(listeners))
            .await
    }

    async fn init(&self, listeners: &PluginListeners) -> FaultResult {
        self.run(Stage::Init, listeners.plugin_name(), Some(listeners))
            .await
    }

    async fn post_init(&self, host: &HostHandle) -> FaultResult {
        self.run(Stage::PostInit, &host.info().name, None).await?;
        if let Some(descriptor) = &self.database {
            host.register_database(descriptor.clone()).await.fatal()?;
        }
        Ok(())
    }

    async fn on_ready(&self, host: &HostHandle) -> FaultResult {
        self.run(Stage::Ready, &host.info().name, None).await
    }

    async fn close(&self) -> Result<(), BoxError> {
        match &self.close {
            CloseBehaviour::Succeed => {
                self.closed.store(true, Ordering::Release);
                Ok(())
            }
            CloseBehaviour::Fail(cause) => Err(cause.clone().into()),
            CloseBehaviour::Hang => {
                futures::future::pending::<()>().await;
                Ok(())
            }
            CloseBehaviour::Panic => panic!("close exploded"),
        }
    }

    fn as_command_provider(&self) -> Option<&dyn CommandProvider> {
        if self.commands.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl CommandProvider for ScriptedPlugin {
    fn get_commands(&self) -> Vec<CommandDefinition> {
        self.command_calls.fetch_add(1, Ordering::AcqRel);
        if self.panic_in_commands {
            panic!("command table corrupted");
        }
        self.commands.clone().unwrap_or_default()
    }
}

/// Wrap a scripted plugin as a loaded plugin without going through a catalog
pub fn loaded(name: &str, plugin: ScriptedPlugin) -> LoadedPlugin {
    let info = PluginInfo {
        name: name.to_string(),
        friendly_name: name.to_uppercase(),
        version: semver::Version::new(1, 0, 0),
        description: String::new(),
        provides_commands: plugin.as_command_provider().is_some(),
        needs_database: plugin.needs_database(),
        configuration_path: PathBuf::from(format!("{}.toml", name)),
        api_version: None,
    };
    LoadedPlugin {
        info: Arc::new(info),
        instance: Arc::new(plugin),
    }
}

/// Provider handing out one shared scripted instance
pub fn provider(name: &str, plugin: ScriptedPlugin) -> Provider {
    let manifest = format!(
        "name = \"{}\"\nfriendly_name = \"{}\"\nversion = \"1.0.0\"\nneeds_database = {}\n",
        name,
        name.to_uppercase(),
        plugin.needs_database()
    );
    let instance: Arc<dyn Plugin> = Arc::new(plugin);
    Provider::new(format!("tests::{}", name), manifest, move || {
        Ok(instance.clone())
    })
}

/// Host configuration with short timeouts
pub fn test_config() -> HostConfig {
    HostConfig {
        max_parallelism: 4,
        shutdown_grace: Duration::from_millis(300),
        close_timeout: Duration::from_millis(200),
        plugin_config_dir: PathBuf::from("plugins"),
        ..HostConfig::default()
    }
}

pub struct Harness {
    pub host: Host,
    pub gateway: Arc<MemoryGateway>,
    pub database: Arc<MemoryDatabase>,
}

pub fn harness(plugins: Vec<(&str, ScriptedPlugin)>) -> Harness {
    harness_with(plugins, MemoryGateway::new(), test_config())
}

pub fn harness_with(
    plugins: Vec<(&str, ScriptedPlugin)>,
    gateway: MemoryGateway,
    config: HostConfig,
) -> Harness {
    let providers = plugins
        .into_iter()
        .map(|(name, plugin)| provider(name, plugin))
        .collect();
    let catalog = Catalog::new(
        StaticProviders::new(providers),
        CatalogConfig {
            disabled: config.disabled.clone(),
            plugin_config_dir: config.plugin_config_dir.clone(),
            ..CatalogConfig::default()
        },
    );
    let gateway = Arc::new(gateway);
    let database = Arc::new(MemoryDatabase::new());
    let host = Host::new(catalog, gateway.clone(), database.clone(), config).unwrap();
    Harness {
        host,
        gateway,
        database,
    }
}
