//! Plugin Fault Model
//!
//! Lifecycle hooks return a [`Fault`] as an ordinary value. Its [`FaultKind`] decides
//! what the host does with it: a Severe fault is logged and the plugin carries on, a
//! Fatal fault unloads the plugin. Faults that are not attributable to a plugin
//! (infrastructure) are `HostError`s and never pass through here.

use std::fmt;

/// Boxed error used as the cause of a fault
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type of every lifecycle hook
pub type FaultResult<T = ()> = Result<T, Fault>;

/// Classification a plugin attaches to its own failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Logged; the plugin stays loaded and proceeds to later stages
    Severe,
    /// Logged; the plugin is unloaded immediately
    Fatal,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Severe => write!(f, "severe"),
            FaultKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// A classified failure raised by a plugin lifecycle hook
#[derive(Debug, thiserror::Error)]
#[error("{kind} fault: {cause}")]
pub struct Fault {
    kind: FaultKind,
    #[source]
    cause: BoxError,
}

impl Fault {
    pub fn new(kind: FaultKind, cause: impl Into<BoxError>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }

    pub fn severe(cause: impl Into<BoxError>) -> Self {
        Self::new(FaultKind::Severe, cause)
    }

    pub fn fatal(cause: impl Into<BoxError>) -> Self {
        Self::new(FaultKind::Fatal, cause)
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == FaultKind::Fatal
    }

    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}

/// Classify any error result at the point of `?`
///
/// ```ignore
/// let text = std::fs::read_to_string(path).severe()?;
/// registrar.register(name, descriptor).await.fatal()?;
/// ```
pub trait FaultExt<T> {
    fn severe(self) -> FaultResult<T>;

    fn fatal(self) -> FaultResult<T>;
}

impl<T, E> FaultExt<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn severe(self) -> FaultResult<T> {
        self.map_err(Fault::severe)
    }

    fn fatal(self) -> FaultResult<T> {
        self.map_err(Fault::fatal)
    }
}
