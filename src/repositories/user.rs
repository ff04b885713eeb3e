use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::entity::user::{self, ActiveModel, Entity as UserEntity};
use crate::models::{
    NewUser, PageSpec, PaginationMeta, SortSpec, User, UserChanges, UserFilter, UserPage,
};
use crate::repositories::query::{
    build_count_statement, build_exists_statement, build_filter_expression,
    build_list_statement, build_order_expression, build_update_statement,
};
use crate::repositories::{cancellable, is_unique_violation, RepoError, RepoResult, UserRepository};

/// User repository backed by a SeaORM connection pool
pub struct SeaOrmUserRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmUserRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Fetch one row by primary key.
    ///
    /// A row that cannot be decoded is reported as `NotFound`, same as a
    /// missing one; the decode error is logged.
    async fn find(&self, id: Uuid) -> RepoResult<User> {
        let model = UserEntity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| not_found_if_undecodable(id, e))?
            .ok_or(RepoError::NotFound)?;

        to_user(model).map_err(|e| not_found_if_undecodable(id, e))
    }
}

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create(&self, cancel: &CancellationToken, input: NewUser) -> RepoResult<User> {
        cancellable(cancel, async {
            let now = OffsetDateTime::now_utc();
            let model = ActiveModel {
                id: Set(Uuid::new_v4()),
                email: Set(input.email),
                full_name: Set(input.full_name),
                phone: Set(input.phone),
                role: Set(input.role.as_str().to_string()),
                is_active: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
            };

            let created = model.insert(self.db.as_ref()).await.map_err(|e| match e {
                DbErr::RecordNotInserted | DbErr::RecordNotFound(_) => RepoError::NoRowReturned,
                e if is_unique_violation(&e) => RepoError::Conflict(e),
                e => RepoError::Insert(e),
            })?;

            tracing::debug!(user_id = %created.id, "user created");
            to_user(created).map_err(RepoError::Insert)
        })
        .await
    }

    async fn get_by_id(&self, cancel: &CancellationToken, id: Uuid) -> RepoResult<User> {
        cancellable(cancel, self.find(id)).await
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        id: Uuid,
        changes: UserChanges,
    ) -> RepoResult<User> {
        cancellable(cancel, async {
            // Existence is checked before emptiness so a missing id wins over a no-op update
            let existing = self
                .db
                .query_one(build_exists_statement(id))
                .await
                .map_err(RepoError::Fetch)?;
            if existing.is_none() {
                return Err(RepoError::NotFound);
            }

            let statement = build_update_statement(id, &changes, OffsetDateTime::now_utc())
                .ok_or(RepoError::NoFieldsToUpdate)?;

            let model = UserEntity::find()
                .from_raw_sql(statement)
                .one(self.db.as_ref())
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        RepoError::Conflict(e)
                    } else {
                        RepoError::Update(e)
                    }
                })?
                .ok_or(RepoError::NoRowReturned)?;

            tracing::debug!(user_id = %id, "user updated");
            to_user(model).map_err(RepoError::Update)
        })
        .await
    }

    async fn delete(&self, cancel: &CancellationToken, id: Uuid) -> RepoResult<User> {
        cancellable(cancel, async {
            let existing = self.find(id).await?;

            let result = UserEntity::delete_by_id(id)
                .exec(self.db.as_ref())
                .await
                .map_err(RepoError::Delete)?;

            // Deleted by someone else between the fetch and the delete
            if result.rows_affected == 0 {
                return Err(RepoError::NotFound);
            }

            tracing::debug!(user_id = %id, "user deleted");
            Ok(existing)
        })
        .await
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        filter: Option<UserFilter>,
        sort: Option<SortSpec>,
        page: Option<PageSpec>,
    ) -> RepoResult<UserPage> {
        cancellable(cancel, async {
            let filter = build_filter_expression(filter.as_ref());
            let order = build_order_expression(sort.as_ref());
            let page = page.unwrap_or_default();

            let total: i64 = self
                .db
                .query_one(build_count_statement(&filter))
                .await
                .map_err(RepoError::Count)?
                .map(|row| row.try_get::<i64>("", "count"))
                .transpose()
                .map_err(RepoError::Count)?
                .unwrap_or(0);

            let models = UserEntity::find()
                .from_raw_sql(build_list_statement(&filter, &order, &page))
                .all(self.db.as_ref())
                .await
                .map_err(RepoError::Fetch)?;

            let data = models
                .into_iter()
                .map(to_user)
                .collect::<Result<Vec<_>, _>>()
                .map_err(RepoError::Fetch)?;

            let total = u64::try_from(total).unwrap_or(0);
            Ok(UserPage {
                data,
                pagination: PaginationMeta::new(&page, total),
            })
        })
        .await
    }
}

fn to_user(m: user::Model) -> Result<User, DbErr> {
    let role = m.role.parse().map_err(|e| DbErr::Type(format!("{e}")))?;

    Ok(User {
        id: m.id,
        email: m.email,
        full_name: m.full_name,
        phone: m.phone,
        role,
        is_active: m.is_active,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn not_found_if_undecodable(id: Uuid, err: DbErr) -> RepoError {
    match err {
        DbErr::Type(_) | DbErr::TryIntoErr { .. } => {
            tracing::warn!(user_id = %id, error = %err, "stored user row could not be decoded");
            RepoError::NotFound
        }
        err => RepoError::Fetch(err),
    }
}
