//! Lifecycle stages and the host's coarse state

use crate::host::error::{HostError, HostResult};
use strum_macros::{Display, EnumIter};

/// Per-plugin lifecycle stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    /// Catalog construction; faults here keep the plugin out of the table
    Construct,
    PreInit,
    Init,
    PostInit,
    Ready,
}

/// Coarse host state. Transitions are strictly forward; `Shutdown` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum HostState {
    Constructing,
    PreInit,
    Init,
    PostInit,
    Ready,
    Shutdown,
}

impl HostState {
    /// Move forward to `next`, refusing to re-enter or go back
    pub(crate) fn advance(&mut self, next: HostState, operation: &'static str) -> HostResult<()> {
        if next <= *self {
            return Err(HostError::InvalidTransition {
                from: *self,
                to: next,
                operation,
            });
        }
        log::debug!("Host: {} -> {}", self, next);
        *self = next;
        Ok(())
    }
}

impl From<Stage> for HostState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Construct => HostState::Constructing,
            Stage::PreInit => HostState::PreInit,
            Stage::Init => HostState::Init,
            Stage::PostInit => HostState::PostInit,
            Stage::Ready => HostState::Ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_stage_order_and_names() {
        let stages: Vec<String> = Stage::iter().map(|s| s.to_string()).collect();
        assert_eq!(
            stages,
            vec!["construct", "pre-init", "init", "post-init", "ready"]
        );
        assert!(Stage::PreInit < Stage::Init);
    }

    #[test]
    fn test_advance_is_strictly_forward() {
        let mut state = HostState::Constructing;
        state.advance(HostState::PreInit, "start").unwrap();
        state.advance(HostState::Init, "start").unwrap();

        let error = state.advance(HostState::PreInit, "start").unwrap_err();
        assert!(matches!(
            error,
            HostError::InvalidTransition {
                from: HostState::Init,
                to: HostState::PreInit,
                ..
            }
        ));
        assert!(state.advance(HostState::Init, "start").is_err());

        state.advance(HostState::Shutdown, "stop").unwrap();
        assert_eq!(state, HostState::Shutdown);
    }

    #[test]
    fn test_shutdown_reachable_from_any_state() {
        for from in HostState::iter().filter(|s| *s != HostState::Shutdown) {
            let mut state = from;
            assert!(state.advance(HostState::Shutdown, "stop").is_ok());
        }
    }
}
