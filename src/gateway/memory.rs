//! In-process gateway and database registrar
//!
//! Used by the binary when no platform connection is configured and by tests to
//! observe exactly which listeners are attached where and which commands were
//! submitted.

use crate::gateway::error::{DatabaseError, DatabaseResult, GatewayError, GatewayResult};
use crate::gateway::traits::{
    same_listener, ChatGateway, DatabaseRegistrar, EventListener, ListenerTarget, LiveConnection,
};
use crate::gateway::types::{CommandDefinition, DatabaseDescriptor, GatewayEvent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking listener must not wedge the test double
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A listener target that records attachments
#[derive(Default)]
pub struct MemoryTarget {
    listeners: Mutex<Vec<Arc<dyn EventListener>>>,
    attach_calls: AtomicUsize,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the currently attached listeners, in attachment order
    pub fn listener_names(&self) -> Vec<String> {
        guard(&self.listeners)
            .iter()
            .map(|l| l.name().to_string())
            .collect()
    }

    pub fn contains(&self, listener: &Arc<dyn EventListener>) -> bool {
        guard(&self.listeners)
            .iter()
            .any(|l| same_listener(l, listener))
    }

    pub fn len(&self) -> usize {
        guard(&self.listeners).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of `attach` calls received, including duplicates
    pub fn attach_calls(&self) -> usize {
        self.attach_calls.load(Ordering::Acquire)
    }

    /// Deliver an event to every attached listener
    pub fn dispatch(&self, event: &GatewayEvent) {
        let listeners: Vec<_> = guard(&self.listeners).clone();
        for listener in listeners {
            listener.on_event(event);
        }
    }
}

impl ListenerTarget for MemoryTarget {
    fn attach(&self, listener: Arc<dyn EventListener>) {
        self.attach_calls.fetch_add(1, Ordering::AcqRel);
        let mut listeners = guard(&self.listeners);
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    fn detach(&self, listener: &Arc<dyn EventListener>) {
        guard(&self.listeners).retain(|l| !same_listener(l, listener));
    }
}

/// Live side of [`MemoryGateway`]
pub struct MemoryConnection {
    session_id: String,
    target: MemoryTarget,
}

impl MemoryConnection {
    pub fn target(&self) -> &MemoryTarget {
        &self.target
    }
}

impl ListenerTarget for MemoryConnection {
    fn attach(&self, listener: Arc<dyn EventListener>) {
        self.target.attach(listener);
    }

    fn detach(&self, listener: &Arc<dyn EventListener>) {
        self.target.detach(listener);
    }
}

impl LiveConnection for MemoryConnection {
    fn session_id(&self) -> String {
        self.session_id.clone()
    }
}

/// Gateway that keeps everything in memory
pub struct MemoryGateway {
    pre: Arc<MemoryTarget>,
    live: Mutex<Option<Arc<MemoryConnection>>>,
    submitted: Mutex<Option<Vec<CommandDefinition>>>,
    connect_failure: Option<String>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            pre: Arc::new(MemoryTarget::new()),
            live: Mutex::new(None),
            submitted: Mutex::new(None),
            connect_failure: None,
        }
    }

    /// A gateway whose `connect()` always fails with `reason`
    pub fn failing_connect(reason: impl Into<String>) -> Self {
        Self {
            connect_failure: Some(reason.into()),
            ..Self::new()
        }
    }

    pub fn pre_target(&self) -> Arc<MemoryTarget> {
        self.pre.clone()
    }

    pub fn live_connection(&self) -> Option<Arc<MemoryConnection>> {
        guard(&self.live).clone()
    }

    /// The submitted command batch, if any
    pub fn submitted_commands(&self) -> Option<Vec<CommandDefinition>> {
        guard(&self.submitted).clone()
    }

    /// Deliver an event the way the platform would: to the live connection once it
    /// exists, otherwise to the pre-connection surface.
    pub fn dispatch(&self, event: &GatewayEvent) {
        match self.live_connection() {
            Some(live) => live.target().dispatch(event),
            None => self.pre.dispatch(event),
        }
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatGateway for MemoryGateway {
    fn pre_connection(&self) -> Arc<dyn ListenerTarget> {
        self.pre.clone()
    }

    async fn connect(&self) -> GatewayResult<Arc<dyn LiveConnection>> {
        if let Some(reason) = &self.connect_failure {
            return Err(GatewayError::ConnectFailed {
                reason: reason.clone(),
            });
        }

        let mut live = guard(&self.live);
        if live.is_some() {
            return Err(GatewayError::AlreadyConnected);
        }

        let connection = Arc::new(MemoryConnection {
            session_id: format!("memory-{}", std::process::id()),
            target: MemoryTarget::new(),
        });
        *live = Some(connection.clone());
        log::debug!("MemoryGateway: connected as {}", connection.session_id);
        Ok(connection)
    }

    async fn submit_commands(&self, batch: Vec<CommandDefinition>) -> GatewayResult<()> {
        let mut submitted = guard(&self.submitted);
        if submitted.is_some() {
            return Err(GatewayError::BatchAlreadySubmitted);
        }
        log::debug!("MemoryGateway: received {} command(s)", batch.len());
        *submitted = Some(batch);
        Ok(())
    }
}

/// Registrar that records registrations and releases
#[derive(Default)]
pub struct MemoryDatabase {
    registered: Mutex<HashMap<String, DatabaseDescriptor>>,
    history: Mutex<Vec<String>>,
    unloaded: Mutex<Vec<String>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn descriptor(&self, plugin: &str) -> Option<DatabaseDescriptor> {
        guard(&self.registered).get(plugin).cloned()
    }

    /// Every successful registration, kept after release
    pub fn registrations(&self) -> Vec<String> {
        guard(&self.history).clone()
    }

    /// Plugins released so far, in release order
    pub fn unloaded(&self) -> Vec<String> {
        guard(&self.unloaded).clone()
    }
}

#[async_trait]
impl DatabaseRegistrar for MemoryDatabase {
    async fn register(&self, plugin: &str, descriptor: DatabaseDescriptor) -> DatabaseResult<()> {
        let mut registered = guard(&self.registered);
        if registered.contains_key(plugin) {
            return Err(DatabaseError::AlreadyRegistered {
                plugin: plugin.to_string(),
            });
        }
        registered.insert(plugin.to_string(), descriptor);
        guard(&self.history).push(plugin.to_string());
        Ok(())
    }

    async fn unload(&self, plugin: &str) -> DatabaseResult<()> {
        guard(&self.unloaded).push(plugin.to_string());
        match guard(&self.registered).remove(plugin) {
            Some(_) => Ok(()),
            None => Err(DatabaseError::NotRegistered {
                plugin: plugin.to_string(),
            }),
        }
    }
}
