pub mod query;
pub mod user;

pub use user::SeaOrmUserRepository;

use std::future::Future;

use async_trait::async_trait;
use sea_orm::DbErr;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{NewUser, PageSpec, SortSpec, User, UserChanges, UserFilter, UserPage};

/// Failures of the user data-access layer.
///
/// Store failures keep the driver error as their source so callers can log
/// it without exposing it to clients.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("user not found")]
    NotFound,

    #[error("email already exists")]
    Conflict(#[source] DbErr),

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error("no row returned")]
    NoRowReturned,

    #[error("failed to insert user")]
    Insert(#[source] DbErr),

    #[error("failed to update user")]
    Update(#[source] DbErr),

    #[error("failed to delete user")]
    Delete(#[source] DbErr),

    #[error("failed to count users")]
    Count(#[source] DbErr),

    #[error("failed to fetch users")]
    Fetch(#[source] DbErr),

    #[error("operation cancelled")]
    Cancelled,
}

pub type RepoResult<T> = Result<T, RepoError>;

/// User persistence operations.
///
/// Every call takes a cancellation token; cancelling it aborts the in-flight
/// store round-trip and the call returns [`RepoError::Cancelled`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. Id, timestamps and `is_active = true` are assigned here.
    async fn create(&self, cancel: &CancellationToken, input: NewUser) -> RepoResult<User>;

    /// Find user by ID
    async fn get_by_id(&self, cancel: &CancellationToken, id: Uuid) -> RepoResult<User>;

    /// Apply a partial update and return the stored row
    async fn update(
        &self,
        cancel: &CancellationToken,
        id: Uuid,
        changes: UserChanges,
    ) -> RepoResult<User>;

    /// Delete a user, returning the row as it was before deletion
    async fn delete(&self, cancel: &CancellationToken, id: Uuid) -> RepoResult<User>;

    /// List users with optional filtering, ordering and paging
    async fn list(
        &self,
        cancel: &CancellationToken,
        filter: Option<UserFilter>,
        sort: Option<SortSpec>,
        page: Option<PageSpec>,
    ) -> RepoResult<UserPage>;
}

/// Run `op` unless `cancel` fires first.
pub(crate) async fn cancellable<T, F>(cancel: &CancellationToken, op: F) -> RepoResult<T>
where
    F: Future<Output = RepoResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RepoError::Cancelled),
        result = op => result,
    }
}

/// Unique-constraint violations, recognised from the driver's SQLSTATE or message
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    if let Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return true;
    }

    let message = err.to_string();
    message.contains("duplicate key") || message.contains("unique constraint")
}
