// Elevated handlers: administrators only (`admin_auth_middleware`).
pub mod announcements;
pub mod challenges;
pub mod events;
pub mod grant_applications;
pub mod grant_programs;
pub mod grants;
pub mod projects;
