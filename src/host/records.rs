//! Fault records kept by the host for inspection after startup

use crate::host::state::Stage;
use chrono::{DateTime, Utc};
use std::fmt;

/// How a recorded fault was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultClass {
    /// The plugin never made it into the table
    Construction,
    Severe,
    Fatal,
    /// Not attributable to a plugin; startup was aborted
    Infrastructure,
}

impl fmt::Display for FaultClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultClass::Construction => "construction",
            FaultClass::Severe => "severe",
            FaultClass::Fatal => "fatal",
            FaultClass::Infrastructure => "infrastructure",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaultRecord {
    pub class: FaultClass,
    /// Owning plugin, if the fault is attributable to one
    pub plugin: Option<String>,
    pub stage: Stage,
    pub cause: String,
    pub at: DateTime<Utc>,
}

impl FaultRecord {
    pub fn new(
        class: FaultClass,
        plugin: Option<&str>,
        stage: Stage,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            class,
            plugin: plugin.map(str::to_string),
            stage,
            cause: cause.into(),
            at: Utc::now(),
        }
    }

    pub fn is_for(&self, plugin: &str) -> bool {
        self.plugin.as_deref() == Some(plugin)
    }
}

impl fmt::Display for FaultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} fault",
            self.at.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.class
        )?;
        if let Some(plugin) = &self.plugin {
            write!(f, " [{}]", plugin)?;
        }
        write!(f, " {}: {}", self.stage, self.cause)
    }
}
