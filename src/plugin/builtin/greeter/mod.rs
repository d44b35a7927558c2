//! Greeter Plugin
//!
//! Listener-only plugin that welcomes members on `member_join`. The greeting can be
//! overridden in the plugin's own properties file:
//!
//! ```toml
//! greeting = "Hello {name}, read the rules first."
//! ```

use crate::gateway::api::{EventListener, GatewayEvent};
use crate::host::api::HostHandle;
use crate::listeners::api::PluginListeners;
use crate::plugin::api::{BoxError, Fault, FaultExt, FaultResult, Plugin};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

crate::plugin_provider!(include_str!("plugin.toml"), construct);

fn construct() -> Result<Arc<dyn Plugin>, BoxError> {
    let plugin: Arc<dyn Plugin> = Arc::new(Greeter::new());
    Ok(plugin)
}

const DEFAULT_GREETING: &str = "Welcome, {name}!";

#[derive(Debug, Default, Deserialize)]
struct GreeterSettings {
    greeting: Option<String>,
}

pub struct Greeter {
    welcomer: Arc<Welcomer>,
}

struct Welcomer {
    template: RwLock<String>,
    sent: Mutex<Vec<String>>,
}

impl Greeter {
    pub fn new() -> Self {
        Self {
            welcomer: Arc::new(Welcomer {
                template: RwLock::new(DEFAULT_GREETING.to_string()),
                sent: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Greetings produced so far
    pub fn sent(&self) -> Vec<String> {
        self.welcomer
            .sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn set_template(&self, template: String) {
        *self
            .welcomer
            .template
            .write()
            .unwrap_or_else(|p| p.into_inner()) = template;
    }
}

impl Default for Greeter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventListener for Welcomer {
    fn name(&self) -> &str {
        "greeter-welcome"
    }

    fn on_event(&self, event: &GatewayEvent) {
        if event.kind != "member_join" {
            return;
        }
        let member = event
            .payload
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or("stranger");
        let greeting = self
            .template
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .replace("{name}", member);
        log::info!("{}", greeting);
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(greeting);
    }
}

/// Read the greeting override, if the properties file exists
async fn load_greeting(path: &Path) -> FaultResult<Option<String>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("greeter: no settings at {}, using default", path.display());
            return Ok(None);
        }
        Err(e) => return Err(Fault::severe(e)),
    };
    let settings: GreeterSettings = toml::from_str(&text).severe()?;
    Ok(settings.greeting)
}

#[async_trait::async_trait]
impl Plugin for Greeter {
    async fn init(&self, listeners: &PluginListeners) -> FaultResult {
        listeners.add(self.welcomer.clone()).fatal()?;
        Ok(())
    }

    async fn post_init(&self, host: &HostHandle) -> FaultResult {
        if let Some(greeting) = load_greeting(&host.info().configuration_path).await? {
            self.set_template(greeting);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::api::MemoryTarget;
    use crate::listeners::api::ListenerRegistry;
    use std::io::Write;

    #[tokio::test]
    async fn test_greets_joining_members() {
        let pre = Arc::new(MemoryTarget::new());
        let registry = Arc::new(ListenerRegistry::new(pre.clone()));
        registry.register("greeter").unwrap();
        let plugin = Greeter::new();
        plugin
            .init(&PluginListeners::new("greeter", registry))
            .await
            .unwrap();

        pre.dispatch(&GatewayEvent::new(
            "member_join",
            serde_json::json!({"name": "ada"}),
        ));
        pre.dispatch(&GatewayEvent::new("message", serde_json::json!({})));

        assert_eq!(plugin.sent(), vec!["Welcome, ada!"]);
    }

    #[tokio::test]
    async fn test_load_greeting_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let greeting = load_greeting(&dir.path().join("greeter.toml"))
            .await
            .unwrap();
        assert!(greeting.is_none());
    }

    #[tokio::test]
    async fn test_load_greeting_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "greeting = \"Hi {{name}}\"").unwrap();

        let greeting = load_greeting(file.path()).await.unwrap();
        assert_eq!(greeting.as_deref(), Some("Hi {name}"));
    }

    #[tokio::test]
    async fn test_load_greeting_malformed_is_severe() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "greeting = ").unwrap();

        let fault = load_greeting(file.path()).await.unwrap_err();
        assert!(!fault.is_fatal());
    }
}
