pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod notifications;
pub mod services;
pub mod state;
pub mod validation;

pub use app::build_router;
pub use state::AppState;
