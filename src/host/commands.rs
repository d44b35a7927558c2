//! Command aggregation
//!
//! Collects command definitions from every loaded plugin that provides them, in
//! plugin order, into the single batch submitted to the gateway.

use crate::gateway::api::CommandDefinition;
use crate::core::error_handling::panic_message;
use crate::plugin::api::LoadedPlugin;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;

/// What to do when two plugins contribute a command with the same name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandConflict {
    /// Keep the first definition, drop later ones with a warning
    #[default]
    FirstWins,
    /// Rename later definitions to `<plugin>-<command>`
    Namespace,
}

impl FromStr for CommandConflict {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first-wins" | "first_wins" => Ok(CommandConflict::FirstWins),
            "namespace" => Ok(CommandConflict::Namespace),
            other => Err(format!(
                "unknown command conflict policy '{}' (expected 'first-wins' or 'namespace')",
                other
            )),
        }
    }
}

impl fmt::Display for CommandConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandConflict::FirstWins => write!(f, "first-wins"),
            CommandConflict::Namespace => write!(f, "namespace"),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Aggregation {
    pub batch: Vec<CommandDefinition>,
    /// Plugins whose `get_commands` panicked, with the panic message
    pub panicked: Vec<(String, String)>,
}

pub(crate) fn aggregate_commands(
    plugins: &[LoadedPlugin],
    policy: CommandConflict,
) -> Aggregation {
    let mut aggregation = Aggregation::default();
    let mut owners: HashMap<String, String> = HashMap::new();

    for plugin in plugins.iter().filter(|p| p.info.provides_commands) {
        let Some(provider) = plugin.instance.as_command_provider() else {
            log::warn!(
                "Plugin '{}' no longer exposes its commands, skipping",
                plugin.name()
            );
            continue;
        };

        let commands =
            match std::panic::catch_unwind(AssertUnwindSafe(|| provider.get_commands())) {
                Ok(commands) => commands,
                Err(payload) => {
                    aggregation
                        .panicked
                        .push((plugin.name().to_string(), panic_message(payload)));
                    continue;
                }
            };

        for command in commands {
            match owners.get(&command.name) {
                None => {
                    owners.insert(command.name.clone(), plugin.name().to_string());
                    aggregation.batch.push(command);
                }
                Some(owner) => match policy {
                    CommandConflict::FirstWins => {
                        log::warn!(
                            "Command '{}' from '{}' dropped: already provided by '{}'",
                            command.name,
                            plugin.name(),
                            owner
                        );
                    }
                    CommandConflict::Namespace => {
                        let renamed = format!("{}-{}", plugin.name(), command.name);
                        if owners.contains_key(&renamed) {
                            log::warn!(
                                "Command '{}' from '{}' dropped: '{}' is also taken",
                                command.name,
                                plugin.name(),
                                renamed
                            );
                            continue;
                        }
                        log::info!(
                            "Command '{}' from '{}' renamed to '{}'",
                            command.name,
                            plugin.name(),
                            renamed
                        );
                        owners.insert(renamed.clone(), plugin.name().to_string());
                        aggregation.batch.push(CommandDefinition {
                            name: renamed,
                            ..command
                        });
                    }
                },
            }
        }
    }

    aggregation
}
