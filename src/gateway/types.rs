//! Data exchanged with the chat gateway and the database registrar

use serde::{Deserialize, Serialize};

/// A slash-command definition submitted to the chat platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandOption>,
}

/// A single argument of a command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl CommandDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
        }
    }

    pub fn with_option(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.options.push(CommandOption {
            name: name.into(),
            description: description.into(),
            required,
        });
        self
    }
}

/// An opaque gateway event delivered to listeners. The host never inspects it.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    pub kind: String,
    pub payload: serde_json::Value,
}

impl GatewayEvent {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}

/// Database resources a plugin asks the registrar to provision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDescriptor {
    pub schema: String,
    pub tables: Vec<String>,
}

impl DatabaseDescriptor {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.tables.push(table.into());
        self
    }
}
