//! Stage runner
//!
//! Fans one task per plugin out onto the worker pool and joins them all. A plugin's
//! fault, panic or abort is turned into a [`TaskOutcome`] and never fails the
//! barrier; only the pool refusing to schedule is returned as an error, after the
//! tasks that were already scheduled have been joined.

use crate::core::error_handling::panic_message;
use crate::host::error::HostResult;
use crate::host::pool::WorkerPool;
use crate::host::state::Stage;
use crate::plugin::api::{Fault, FaultResult, LoadedPlugin};
use futures::future::join_all;
use std::future::Future;
use tokio::task::JoinError;

#[derive(Debug)]
pub(crate) enum TaskOutcome {
    Completed,
    Faulted(Fault),
    /// The hook panicked or its task was aborted
    Unclassified(String),
}

#[derive(Debug)]
pub(crate) struct StageResult {
    pub plugin: LoadedPlugin,
    pub outcome: TaskOutcome,
}

pub(crate) async fn run_stage<F, Fut>(
    pool: &WorkerPool,
    stage: Stage,
    plugins: Vec<LoadedPlugin>,
    task: F,
) -> HostResult<Vec<StageResult>>
where
    F: Fn(LoadedPlugin) -> Fut,
    Fut: Future<Output = FaultResult> + Send + 'static,
{
    log::debug!("Stage {}: scheduling {} task(s)", stage, plugins.len());

    let mut scheduled = Vec::with_capacity(plugins.len());
    let mut refused = None;
    for plugin in plugins {
        match pool.spawn(task(plugin.clone())) {
            Ok(handle) => scheduled.push((plugin, handle)),
            Err(error) => {
                refused = Some(error);
                break;
            }
        }
    }

    let (plugins, handles): (Vec<_>, Vec<_>) = scheduled.into_iter().unzip();
    let joined = join_all(handles).await;

    if let Some(error) = refused {
        log::error!("Stage {}: worker pool refused a task: {}", stage, error);
        return Err(error);
    }

    Ok(plugins
        .into_iter()
        .zip(joined)
        .map(|(plugin, joined)| {
            let outcome = match joined {
                Ok(Ok(())) => TaskOutcome::Completed,
                Ok(Err(fault)) => TaskOutcome::Faulted(fault),
                Err(error) => TaskOutcome::Unclassified(describe_join_error(error)),
            };
            StageResult { plugin, outcome }
        })
        .collect())
}

pub(crate) fn describe_join_error(error: JoinError) -> String {
    if error.is_cancelled() {
        return "task was aborted".to_string();
    }
    match error.try_into_panic() {
        Ok(payload) => format!("panicked: {}", panic_message(payload)),
        Err(error) => error.to_string(),
    }
}
