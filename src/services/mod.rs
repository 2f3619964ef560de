//! Domain operations over the pool. Handlers own authorization; services own SQL.

pub mod announcement_service;
pub mod challenge_service;
pub mod event_service;
pub mod grant_application_service;
pub mod grant_program_service;
pub mod grant_service;
pub mod progress_log_service;
pub mod project_service;
pub mod registration;
pub mod user_service;

pub use announcement_service::AnnouncementService;
pub use challenge_service::ChallengeService;
pub use event_service::EventService;
pub use grant_application_service::{GrantApplicationError, GrantApplicationService, Review};
pub use grant_program_service::GrantProgramService;
pub use grant_service::GrantService;
pub use progress_log_service::ProgressLogService;
pub use project_service::ProjectService;
pub use registration::RegistrationError;
pub use user_service::{normalize_email, UserService};
