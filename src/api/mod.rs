// HTTP surface for FeedbackVault: routing, auth extractors, DTOs and the server runner

pub mod auth;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState};
