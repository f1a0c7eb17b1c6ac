pub mod api;
pub mod cuisines;

pub use api::{ApiError, ChefApi};
