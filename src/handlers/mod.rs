pub mod common;
pub mod user;

pub use common::{parse_date_param, AppJson, AppPath, AppQuery, DayBound};
pub use user::{
    create_user, delete_user, get_user, list_users, update_user, CreateUserRequest,
    ListUsersQuery, PaginationResponse, UpdateUserRequest, UserListResponse, UserResponse,
};
