pub mod listing;
pub mod user;

pub use listing::*;
pub use user::*;
