use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::modules::storage::{AssetKind, StoredObject};

/// Reference from a record to exactly one object in the blob store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssetRef {
    /// Id of the object in the blob store, `<folder>/<uuid>.<ext>`
    pub storage_id: String,
    /// Public URL of the object
    pub url: String,
    pub kind: AssetKind,
}

impl From<StoredObject> for AssetRef {
    fn from(stored: StoredObject) -> Self {
        Self {
            storage_id: stored.storage_id,
            url: stored.url,
            kind: stored.kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
    AppendElement,
    RemoveElement,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::AppendElement => "append-element",
            Operation::RemoveElement => "remove-element",
        })
    }
}

/// Identifies the operation in every error message and orphan log line
#[derive(Debug, Clone, Copy)]
pub struct OpContext {
    pub entity: &'static str,
    pub operation: Operation,
    pub record_id: Option<Uuid>,
}

impl OpContext {
    pub fn new(entity: &'static str, operation: Operation) -> Self {
        Self {
            entity,
            operation,
            record_id: None,
        }
    }

    pub fn with_record(mut self, id: Uuid) -> Self {
        self.record_id = Some(id);
        self
    }

    /// Prefix the message of `err` with this context
    pub fn wrap(&self, err: AppError) -> AppError {
        match err {
            AppError::Validation(msg) => AppError::Validation(format!("{}: {}", self, msg)),
            AppError::NotFound(msg) => AppError::NotFound(format!("{}: {}", self, msg)),
            AppError::Storage(msg) => AppError::Storage(format!("{}: {}", self, msg)),
            AppError::Persistence(msg) => AppError::Persistence(format!("{}: {}", self, msg)),
            other => other,
        }
    }

    pub fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{}: record does not exist", self))
    }

    pub fn persistence(&self, cause: impl std::fmt::Display) -> AppError {
        AppError::Persistence(format!("{}: {}", self, cause))
    }

    pub fn storage(&self, cause: impl std::fmt::Display) -> AppError {
        AppError::Storage(format!("{}: {}", self, cause))
    }
}

impl std::fmt::Display for OpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.entity, self.operation)?;
        if let Some(id) = self.record_id {
            write!(f, " [id={}]", id)?;
        }
        Ok(())
    }
}
