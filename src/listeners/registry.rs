//! Per-plugin listener sets mirrored onto the gateway
//!
//! Lock order is always: live-connection slot, then the entry map (held only long
//! enough to clone an entry handle), then the plugin's own set. `set_connection`
//! holds the slot for writing while it retro-attaches every set, so an `add_listeners`
//! either completes before it (and is retro-attached) or observes the connection
//! (and attaches directly). No listener is attached to the live connection twice.
//!
//! A listener may be owned by several plugins. The gateway targets are shared, so it
//! stays attached until its last owner removes it. Owner counts sit behind their own
//! mutex, taken after the plugin's set and held across the target calls so an attach
//! and a detach of the same listener cannot interleave.

use crate::core::sync::{lock_mutex, read_rwlock, write_rwlock};
use crate::gateway::api::{same_listener, EventListener, ListenerTarget, LiveConnection};
use crate::listeners::error::{ListenerError, ListenerResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

#[derive(Default)]
struct ListenerSet {
    listeners: Vec<Arc<dyn EventListener>>,
    // Set once the entry is unregistered; late writers holding the handle must fail
    retired: bool,
}

type Entry = Arc<Mutex<ListenerSet>>;

fn listener_key(listener: &Arc<dyn EventListener>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

fn poisoned(message: String) -> ListenerError {
    ListenerError::Poisoned { message }
}

fn not_registered(plugin: &str) -> ListenerError {
    ListenerError::NotRegistered {
        plugin_name: plugin.to_string(),
    }
}

/// Registry of listeners per plugin
pub struct ListenerRegistry {
    pre_connection: Arc<dyn ListenerTarget>,
    live: RwLock<Option<Arc<dyn LiveConnection>>>,
    entries: RwLock<HashMap<String, Entry>>,
    owners: Mutex<HashMap<usize, usize>>,
}

impl ListenerRegistry {
    /// Create a registry forwarding to the gateway's pre-connection surface
    pub fn new(pre_connection: Arc<dyn ListenerTarget>) -> Self {
        Self {
            pre_connection,
            live: RwLock::new(None),
            entries: RwLock::new(HashMap::new()),
            owners: Mutex::new(HashMap::new()),
        }
    }

    /// Create an empty listener set for `plugin`. Returns false if one already existed.
    pub fn register(&self, plugin: &str) -> ListenerResult<bool> {
        let mut entries = write_rwlock(self.entries.write(), poisoned)?;
        if entries.contains_key(plugin) {
            return Ok(false);
        }
        entries.insert(plugin.to_string(), Entry::default());
        log::trace!("ListenerRegistry: registered '{}'", plugin);
        Ok(true)
    }

    pub fn is_registered(&self, plugin: &str) -> bool {
        read_rwlock(self.entries.read(), poisoned)
            .map(|entries| entries.contains_key(plugin))
            .unwrap_or(false)
    }

    /// Add listeners to `plugin`'s set and attach them to every live target.
    /// Listeners already in the set are ignored. Returns how many were added.
    pub fn add_listeners<I>(&self, plugin: &str, listeners: I) -> ListenerResult<usize>
    where
        I: IntoIterator<Item = Arc<dyn EventListener>>,
    {
        let live = read_rwlock(self.live.read(), poisoned)?;
        let entry = self.entry(plugin)?;
        let mut set = lock_mutex(entry.lock(), poisoned)?;
        if set.retired {
            return Err(not_registered(plugin));
        }

        let mut added = 0;
        for listener in listeners {
            if set.listeners.iter().any(|l| same_listener(l, &listener)) {
                continue;
            }
            if self.acquire(live.as_ref(), &listener)? {
                log::trace!(
                    "ListenerRegistry: '{}' attached listener '{}'",
                    plugin,
                    listener.name()
                );
            } else {
                log::debug!(
                    "ListenerRegistry: '{}' shares listener '{}', already attached",
                    plugin,
                    listener.name()
                );
            }
            set.listeners.push(listener);
            added += 1;
        }
        Ok(added)
    }

    /// Remove listeners from `plugin`'s set and detach them from every live target.
    /// Returns how many were removed.
    pub fn remove_listeners<'a, I>(&self, plugin: &str, listeners: I) -> ListenerResult<usize>
    where
        I: IntoIterator<Item = &'a Arc<dyn EventListener>>,
    {
        let live = read_rwlock(self.live.read(), poisoned)?;
        let entry = self.entry(plugin)?;
        let mut set = lock_mutex(entry.lock(), poisoned)?;
        if set.retired {
            return Err(not_registered(plugin));
        }

        let mut removed = 0;
        for listener in listeners {
            let before = set.listeners.len();
            set.listeners.retain(|l| !same_listener(l, listener));
            if set.listeners.len() == before {
                continue;
            }
            self.release(live.as_ref(), plugin, listener)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Forget every listener of `plugin` and drop its entry. Listeners no other plugin
    /// owns are detached from every target. Unregistering an unknown plugin is a
    /// no-op. Returns how many were detached.
    pub fn unregister(&self, plugin: &str) -> ListenerResult<usize> {
        let live = read_rwlock(self.live.read(), poisoned)?;
        let entry = {
            let mut entries = write_rwlock(self.entries.write(), poisoned)?;
            entries.remove(plugin)
        };
        let Some(entry) = entry else {
            return Ok(0);
        };

        let mut set = lock_mutex(entry.lock(), poisoned)?;
        set.retired = true;
        let mut detached = 0;
        for listener in std::mem::take(&mut set.listeners) {
            if self.release(live.as_ref(), plugin, &listener)? {
                detached += 1;
            }
        }
        log::debug!(
            "ListenerRegistry: unregistered '{}' ({} listener(s) detached)",
            plugin,
            detached
        );
        Ok(detached)
    }

    /// Make the live connection available. Every listener already registered is
    /// attached to it before this returns; later additions attach directly.
    pub fn set_connection(&self, connection: Arc<dyn LiveConnection>) -> ListenerResult<()> {
        let mut live = write_rwlock(self.live.write(), poisoned)?;
        if live.is_some() {
            return Err(ListenerError::ConnectionAlreadySet);
        }

        let entries: Vec<(String, Entry)> = read_rwlock(self.entries.read(), poisoned)?
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect();

        let mut seen = HashSet::new();
        let mut attached = 0;
        for (name, entry) in entries {
            let set = lock_mutex(entry.lock(), poisoned)?;
            if set.retired {
                continue;
            }
            for listener in &set.listeners {
                if seen.insert(listener_key(listener)) {
                    connection.attach(listener.clone());
                    attached += 1;
                }
            }
            log::trace!(
                "ListenerRegistry: retro-attached {} listener(s) of '{}'",
                set.listeners.len(),
                name
            );
        }

        log::debug!(
            "ListenerRegistry: live connection {} set, {} listener(s) attached",
            connection.session_id(),
            attached
        );
        *live = Some(connection);
        Ok(())
    }

    /// The live connection, once set
    pub fn connection(&self) -> Option<Arc<dyn LiveConnection>> {
        read_rwlock(self.live.read(), poisoned)
            .ok()
            .and_then(|live| live.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    /// Number of listeners in `plugin`'s set, `None` if not registered
    pub fn listener_count(&self, plugin: &str) -> Option<usize> {
        let entry = self.entry(plugin).ok()?;
        let set = lock_mutex(entry.lock(), poisoned).ok()?;
        Some(set.listeners.len())
    }

    /// Registered plugin names, sorted
    pub fn registered_plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = read_rwlock(self.entries.read(), poisoned)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Unregister every plugin. Returns the total number of listeners detached.
    pub fn clear(&self) -> ListenerResult<usize> {
        let mut total = 0;
        for plugin in self.registered_plugins() {
            total += self.unregister(&plugin)?;
        }
        Ok(total)
    }

    fn entry(&self, plugin: &str) -> ListenerResult<Entry> {
        read_rwlock(self.entries.read(), poisoned)?
            .get(plugin)
            .cloned()
            .ok_or_else(|| not_registered(plugin))
    }

    /// Count one more owner, attaching to every target for the first.
    /// Returns whether the listener was attached.
    fn acquire(
        &self,
        live: Option<&Arc<dyn LiveConnection>>,
        listener: &Arc<dyn EventListener>,
    ) -> ListenerResult<bool> {
        let mut owners = lock_mutex(self.owners.lock(), poisoned)?;
        let count = owners.entry(listener_key(listener)).or_insert(0);
        *count += 1;
        if *count > 1 {
            return Ok(false);
        }
        self.pre_connection.attach(listener.clone());
        if let Some(connection) = live {
            connection.attach(listener.clone());
        }
        Ok(true)
    }

    /// Drop `plugin`'s ownership, detaching from every target when it was the last.
    /// Returns whether the listener was detached.
    fn release(
        &self,
        live: Option<&Arc<dyn LiveConnection>>,
        plugin: &str,
        listener: &Arc<dyn EventListener>,
    ) -> ListenerResult<bool> {
        let mut owners = lock_mutex(self.owners.lock(), poisoned)?;
        let key = listener_key(listener);
        if let Some(count) = owners.get_mut(&key).filter(|count| **count > 1) {
            *count -= 1;
            log::debug!(
                "ListenerRegistry: '{}' released listener '{}', still owned elsewhere",
                plugin,
                listener.name()
            );
            return Ok(false);
        }
        owners.remove(&key);
        self.pre_connection.detach(listener);
        if let Some(connection) = live {
            connection.detach(listener);
        }
        Ok(true)
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("plugins", &self.registered_plugins())
            .field("connected", &self.is_connected())
            .finish()
    }
}
