use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::handlers::common::{parse_date_param, AppJson, AppPath, AppQuery, DayBound};
use crate::models::{
    NewUser, PageSpec, PaginationMeta, SortOrder, SortSpec, User, UserChanges, UserFilter,
    UserPage, UserRole, DEFAULT_PAGE_SIZE, MAX_PAGE,
};
use crate::repositories::query::is_sortable;
use crate::state::AppState;

// ============ Request/Response DTOs ============

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "full_name is required"))]
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.full_name.is_none()
            && self.phone.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    /// Case-insensitive match on full name or email
    pub search: Option<String>,
    pub email_domain: Option<String>,
    /// YYYY-MM-DD
    pub created_from: Option<String>,
    /// YYYY-MM-DD, inclusive to the end of the day
    pub created_to: Option<String>,
    /// YYYY-MM-DD
    pub updated_from: Option<String>,
    /// YYYY-MM-DD, inclusive to the end of the day
    pub updated_to: Option<String>,
    /// One of id, email, full_name, role, is_active, created_at, updated_at
    pub sort_by: Option<String>,
    /// asc or desc
    pub sort_order: Option<String>,
    #[param(default = 1, minimum = 1)]
    #[validate(range(min = 1, max = MAX_PAGE, message = "page is out of range"))]
    pub page: Option<u64>,
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[validate(range(min = 1, max = 100, message = "page_size must be between 1 and 100"))]
    pub page_size: Option<u64>,
}

impl ListUsersQuery {
    /// Convert raw query parameters into typed listing criteria
    pub fn into_criteria(self) -> AppResult<(UserFilter, SortSpec, PageSpec)> {
        let filter = UserFilter {
            role: self.role,
            is_active: self.is_active,
            created_from: parse_date_param(
                "created_from",
                self.created_from.as_deref(),
                DayBound::Start,
            )?,
            created_to: parse_date_param("created_to", self.created_to.as_deref(), DayBound::End)?,
            updated_from: parse_date_param(
                "updated_from",
                self.updated_from.as_deref(),
                DayBound::Start,
            )?,
            updated_to: parse_date_param("updated_to", self.updated_to.as_deref(), DayBound::End)?,
            search: self.search,
            email_domain: self.email_domain,
        };

        let field = self.sort_by.unwrap_or_else(|| "created_at".to_string());
        if !is_sortable(&field) {
            return Err(AppError::Validation(format!("cannot sort by {field}")));
        }

        let order = match self.sort_order.as_deref() {
            None | Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "sort_order must be asc or desc, got {other}"
                )))
            }
        };

        let page = PageSpec::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        );

        Ok((filter, SortSpec::new(field, order), page))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub created_at: time::OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String)]
    pub updated_at: time::OffsetDateTime,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            phone: u.phone,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationResponse {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl From<PaginationMeta> for PaginationResponse {
    fn from(m: PaginationMeta) -> Self {
        Self {
            page: m.page,
            page_size: m.page_size,
            total: m.total,
            total_pages: m.total_pages,
            has_next: m.has_next,
            has_prev: m.has_prev,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub pagination: PaginationResponse,
}

impl From<UserPage> for UserListResponse {
    fn from(page: UserPage) -> Self {
        Self {
            data: page.data.into_iter().map(|u| u.into()).collect(),
            pagination: page.pagination.into(),
        }
    }
}

// ============ Handlers ============

/// Create a new user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created successfully", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already exists")
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    payload.validate()?;

    let new_user = NewUser {
        email: payload.email,
        full_name: payload.full_name,
        phone: payload.phone,
        role: payload.role,
    };

    let user = state.users.create(&state.request_token(), new_user).await?;
    tracing::info!(user_id = %user.id, "created user");

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// List users with filtering, sorting and pagination
#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users", body = UserListResponse),
        (status = 400, description = "Invalid filter, sort or pagination parameters")
    ),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListUsersQuery>,
) -> AppResult<Json<UserListResponse>> {
    params.validate()?;
    let (filter, sort, page) = params.into_criteria()?;

    let users = state
        .users
        .list(&state.request_token(), Some(filter), Some(sort), Some(page))
        .await?;

    Ok(Json(users.into()))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 400, description = "Malformed user ID"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state.users.get_by_id(&state.request_token(), id).await?;
    Ok(Json(user.into()))
}

/// Partially update a user
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated successfully", body = UserResponse),
        (status = 400, description = "Validation error or no fields supplied"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already exists")
    ),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    if payload.is_empty() {
        return Err(AppError::Validation(
            "at least one field must be provided for update".to_string(),
        ));
    }
    payload.validate()?;

    let changes = UserChanges {
        email: payload.email,
        full_name: payload.full_name,
        phone: payload.phone,
        role: payload.role,
        is_active: payload.is_active,
    };

    let user = state
        .users
        .update(&state.request_token(), id, changes)
        .await?;
    tracing::info!(user_id = %user.id, "updated user");

    Ok(Json(user.into()))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Deleted user", body = UserResponse),
        (status = 400, description = "Malformed user ID"),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<UserResponse>> {
    let user = state.users.delete(&state.request_token(), id).await?;
    tracing::info!(user_id = %user.id, "deleted user");

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> ListUsersQuery {
        ListUsersQuery {
            role: None,
            is_active: None,
            search: None,
            email_domain: None,
            created_from: None,
            created_to: None,
            updated_from: None,
            updated_to: None,
            sort_by: None,
            sort_order: None,
            page: None,
            page_size: None,
        }
    }

    #[test]
    fn test_defaults() {
        let (filter, sort, page) = query().into_criteria().unwrap();

        assert!(filter.role.is_none());
        assert_eq!(sort, SortSpec::new("created_at", SortOrder::Asc));
        assert_eq!(page, PageSpec::new(1, 10));
    }

    #[test]
    fn test_unknown_sort_field_is_rejected() {
        let params = ListUsersQuery {
            sort_by: Some("password".to_string()),
            ..query()
        };
        assert!(matches!(
            params.into_criteria(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_sort_order_must_be_lowercase() {
        let params = ListUsersQuery {
            sort_order: Some("DESC".to_string()),
            ..query()
        };
        assert!(params.into_criteria().is_err());
    }

    #[test]
    fn test_page_size_range_is_validated() {
        let params = ListUsersQuery {
            page_size: Some(101),
            ..query()
        };
        assert!(params.validate().is_err());

        let params = ListUsersQuery {
            page: Some(0),
            ..query()
        };
        assert!(params.validate().is_err());

        let params = ListUsersQuery {
            page: Some(MAX_PAGE + 1),
            ..query()
        };
        assert!(params.validate().is_err());

        let params = ListUsersQuery {
            page: Some(MAX_PAGE),
            page_size: Some(100),
            ..query()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_update_request_emptiness() {
        assert!(UpdateUserRequest::default().is_empty());

        let request = UpdateUserRequest {
            is_active: Some(true),
            ..Default::default()
        };
        assert!(!request.is_empty());
    }

    #[test]
    fn test_update_request_validation() {
        let request = UpdateUserRequest {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let request = UpdateUserRequest {
            full_name: Some(String::new()),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let request = UpdateUserRequest {
            phone: Some("555-0100".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }
}
