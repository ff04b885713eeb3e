pub mod app;
pub mod factory;

pub use app::*;
pub use factory::*;
