// Public handlers: no token required. The public router runs the optional
// auth layer, so owners and administrators still see their private records.
pub mod announcements;
pub mod auth;
pub mod challenges;
pub mod events;
pub mod grant_programs;
pub mod grants;
pub mod progress_logs;
pub mod projects;
pub mod users;
