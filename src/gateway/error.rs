//! Gateway and database collaborator errors

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway connection failed: {reason}")]
    ConnectFailed { reason: String },

    #[error("Gateway is already connected")]
    AlreadyConnected,

    #[error("Command batch has already been submitted")]
    BatchAlreadySubmitted,

    #[error("Command submission rejected: {reason}")]
    SubmissionRejected { reason: String },
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database resources for plugin '{plugin}' are already registered")]
    AlreadyRegistered { plugin: String },

    #[error("No database resources registered for plugin '{plugin}'")]
    NotRegistered { plugin: String },

    #[error("Database operation failed: {message}")]
    OperationFailed { message: String },
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;
