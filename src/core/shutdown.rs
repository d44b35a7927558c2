//! Process-level shutdown signalling
//!
//! The binary parks on [`ShutdownCoordinator::wait`] after the host reaches Ready and
//! calls `Host::stop()` once a termination signal (or a programmatic trigger) arrives.
//! A second signal while the host is already stopping exits immediately. SIGHUP
//! does not stop the process; it is broadcast to reload subscribers instead.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Exit status used when a second signal forces the process down
pub const FORCED_EXIT_CODE: i32 = 130;

/// Coordinates a single shutdown request across tasks
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    reload_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(8);
        let (reload_tx, _) = broadcast::channel(8);
        Self {
            shutdown_tx,
            reload_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to shutdown notifications
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Request shutdown. Idempotent.
    pub fn trigger_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    /// Subscribe to reload requests (SIGHUP)
    pub fn subscribe_reload(&self) -> broadcast::Receiver<()> {
        self.reload_tx.subscribe()
    }

    pub fn trigger_reload(&self) {
        let _ = self.reload_tx.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Resolve once shutdown has been requested.
    ///
    /// Subscribes before checking the flag so a trigger racing with this call is
    /// never missed.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_shutdown_requested() {
            return;
        }
        // Lagged or closed both mean a shutdown was sent
        let _ = rx.recv().await;
    }

    /// Install SIGINT/SIGTERM/SIGQUIT handlers that trigger shutdown, and a SIGHUP
    /// handler that triggers a reload. Must be called from within a tokio runtime.
    pub fn install_signal_handlers(&self) {
        let signal_count = Arc::new(AtomicUsize::new(0));

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            unsafe {
                libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            }

            let kinds = [
                SignalKind::interrupt(),
                SignalKind::terminate(),
                SignalKind::quit(),
            ];

            for kind in kinds {
                let coordinator = self.clone();
                let counter = signal_count.clone();
                tokio::spawn(async move {
                    let Ok(mut sig) = signal(kind) else {
                        log::warn!("Unable to install handler for signal {:?}", kind);
                        return;
                    };
                    while sig.recv().await.is_some() {
                        coordinator.on_signal(&counter);
                    }
                });
            }

            let coordinator = self.clone();
            tokio::spawn(async move {
                let Ok(mut sig) = signal(SignalKind::hangup()) else {
                    log::warn!("Unable to install handler for SIGHUP");
                    return;
                };
                while sig.recv().await.is_some() {
                    log::info!("Hangup received; reloading configuration");
                    coordinator.trigger_reload();
                }
            });
        }

        #[cfg(not(unix))]
        {
            let coordinator = self.clone();
            tokio::spawn(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    coordinator.on_signal(&signal_count);
                }
            });
        }
    }

    fn on_signal(&self, counter: &AtomicUsize) {
        let previous = counter.fetch_add(1, Ordering::AcqRel);
        if previous >= 1 {
            log::warn!("Second termination signal received; exiting");
            std::process::exit(FORCED_EXIT_CODE);
        }
        log::info!("Termination signal received; shutting down");
        self.trigger_shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
