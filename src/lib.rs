pub mod access;
pub mod aggregation;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod identity;
pub mod insights;
pub mod model;
pub mod reviews;
pub mod seed;
pub mod store;
pub mod telemetry;

pub mod util {
    pub mod db;
    pub mod env;
}

pub use error::{AppError, AppResult};
