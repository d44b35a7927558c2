//! Top-level error reporting
//!
//! Errors that end the process (bad configuration, an aborted startup) are reported
//! through [`log_error_with_context`], which prefers a short user-facing message and
//! keeps the full error chain at debug level.

/// Errors that know whether their message is meaningful to an operator
pub trait ContextualError: std::error::Error {
    /// True when the error carries a specific message the operator can act on
    /// (a malformed config value), false for internal failures (a pool that could not
    /// schedule work).
    fn is_user_actionable(&self) -> bool;

    /// The operator-facing message. `Some` exactly when `is_user_actionable()` is true.
    fn user_message(&self) -> Option<String>;
}

/// Log an error at error level with the `FATAL` marker, then its detail and source
/// chain at debug level.
pub fn log_error_with_context<E: ContextualError>(error: &E, operation_context: &str) {
    match error.user_message().filter(|_| error.is_user_actionable()) {
        Some(message) => log::error!("FATAL {}: {}", operation_context, message),
        None => log::error!("FATAL {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);

    let mut source = error.source();
    while let Some(cause) = source {
        log::debug!("CAUSED BY: {}", cause);
        source = cause.source();
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct OperatorError(String);

    impl fmt::Display for OperatorError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for OperatorError {}

    impl ContextualError for OperatorError {
        fn is_user_actionable(&self) -> bool {
            true
        }

        fn user_message(&self) -> Option<String> {
            Some(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct InternalError;

    impl fmt::Display for InternalError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "worker pool unavailable")
        }
    }

    impl std::error::Error for InternalError {}

    impl ContextualError for InternalError {
        fn is_user_actionable(&self) -> bool {
            false
        }

        fn user_message(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_operator_error_exposes_message() {
        let error = OperatorError("max_parallelism must be greater than 0".to_string());
        assert!(error.is_user_actionable());
        assert_eq!(
            error.user_message().as_deref(),
            Some("max_parallelism must be greater than 0")
        );
        log_error_with_context(&error, "Loading configuration");
    }

    #[test]
    fn test_internal_error_hides_message() {
        let error = InternalError;
        assert!(!error.is_user_actionable());
        assert!(error.user_message().is_none());
        log_error_with_context(&error, "Starting host");
    }
}
