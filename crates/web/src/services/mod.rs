//! Business logic services.

pub mod auth;
pub mod issues;
pub mod storage;

pub use auth::{AuthError, AuthService, AuthSession, SessionState};
pub use issues::{IssueError, IssueService};
pub use storage::{LocalObjectStorage, MemoryObjectStorage, ObjectStorage, StorageError};
