pub mod announcement;
pub mod challenge;
pub mod event;
pub mod grant;
pub mod grant_application;
pub mod grant_program;
pub mod progress_log;
pub mod project;
pub mod user;

pub use announcement::{Announcement, AnnouncementPriority};
pub use challenge::{Challenge, ChallengeDifficulty, ChallengeStatus, ChallengeSummary, Winner};
pub use event::{Event, EventSummary, EventType};
pub use grant::Grant;
pub use grant_application::{ApplicationStatus, GrantApplication, GrantApplicationDetail};
pub use grant_program::{ApplicationRequirements, EligibilityCriteria, GrantProgram, ImportantDates, ProgramStatus};
pub use progress_log::ProgressLog;
pub use project::{Project, ProjectStatus};
pub use user::User;

/// Splits `?tags=a,b` into trimmed, non-empty entries.
pub fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_splitting() {
        assert_eq!(split_csv(Some(" rust, ,web3 ")), vec!["rust", "web3"]);
        assert!(split_csv(None).is_empty());
    }
}
