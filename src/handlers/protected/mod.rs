// Protected handlers: `jwt_auth_middleware` has attached an `AuthUser`.
pub mod auth;
pub mod challenges;
pub mod events;
pub mod grant_applications;
pub mod progress_logs;
pub mod projects;
pub mod uploads;
