use thiserror::Error;
use uuid::Uuid;

use crate::channel::AcquisitionError;
use crate::model::ModelError;

pub type Result<T> = std::result::Result<T, BriefError>;

#[derive(Debug, Error)]
pub enum BriefError {
    #[error("Storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Storage operation error: {0}")]
    StorageOperation(#[from] redb::StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("Acquisition failed: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Failed to persist briefing for project {project}: {reason}")]
    Persistence { project: Uuid, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

impl BriefError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BriefError::ProjectNotFound(_) | BriefError::Validation(_) | BriefError::Acquisition(_)
        )
    }
}
