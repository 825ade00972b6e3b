pub mod catalog;
pub mod health;
pub mod recommendations;

pub use catalog::{list_books, recommend_from_catalog};
pub use health::health_check;
pub use recommendations::recommendations_config;
