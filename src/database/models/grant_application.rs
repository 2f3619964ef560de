use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    InReview,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Statuses that hold the (program, project) slot.
    pub const LIVE: [ApplicationStatus; 3] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Submitted,
        ApplicationStatus::InReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Draft => "draft",
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::InReview => "in-review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn is_live(&self) -> bool {
        Self::LIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Approved | ApplicationStatus::Rejected)
    }

    /// Review moves forward only; nothing leaves approved or rejected.
    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Draft, Submitted)
                | (Submitted, InReview)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (InReview, Approved)
                | (InReview, Rejected)
        )
    }

    pub fn live_values() -> Vec<&'static str> {
        Self::LIVE.iter().map(|s| s.as_str()).collect()
    }
}

/// A row from the `grant_applications` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GrantApplication {
    pub id: Uuid,
    pub program_id: Uuid,
    pub project_id: Uuid,
    pub applicant_id: Uuid,
    pub status: ApplicationStatus,
    pub proposal: String,
    pub budget_breakdown: String,
    pub timeline: String,
    pub expected_impact: Option<String>,
    pub team_details: Option<String>,
    pub project_overview: Option<String>,
    pub roadmap: Option<String>,
    pub vision_impact: Option<String>,
    pub why_grant: Option<String>,
    pub pitch_video_url: String,
    pub presentation_url: String,
    pub demo_video_url: Option<String>,
    pub additional_materials: Vec<String>,
    pub women_leadership_percentage: f64,
    pub working_prototype: bool,
    pub progress_duration_months: f64,
    pub review_notes: Option<String>,
    pub reviewer_id: Option<Uuid>,
    pub reviewed_date: Option<DateTime<Utc>>,
    pub submitted_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `grant_application_details` view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GrantApplicationDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub application: GrantApplication,
    pub program_title: String,
    pub project_title: String,
    pub applicant_name: String,
}

#[derive(Debug, Deserialize, validator::Validate)]
pub struct UpdateApplicationStatus {
    pub status: ApplicationStatus,
    #[validate(length(max = 5000, message = "Review notes cannot exceed 5000 characters"))]
    pub review_notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationListParams {
    pub program_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub status: Option<ApplicationStatus>,
}

#[cfg(test)]
mod tests {
    use super::ApplicationStatus::*;
    use super::*;

    #[test]
    fn allowed_transitions() {
        assert!(Draft.can_transition_to(Submitted));
        assert!(Submitted.can_transition_to(InReview));
        assert!(Submitted.can_transition_to(Approved));
        assert!(Submitted.can_transition_to(Rejected));
        assert!(InReview.can_transition_to(Approved));
        assert!(InReview.can_transition_to(Rejected));
    }

    #[test]
    fn terminal_statuses_are_final() {
        for next in [Draft, Submitted, InReview, Approved, Rejected] {
            assert!(!Approved.can_transition_to(next));
            assert!(!Rejected.can_transition_to(next));
        }
        assert!(!InReview.can_transition_to(Submitted));
        assert!(!Submitted.can_transition_to(Draft));
    }

    #[test]
    fn live_statuses() {
        assert!(Draft.is_live() && Submitted.is_live() && InReview.is_live());
        assert!(!Approved.is_live() && !Rejected.is_live());
        assert_eq!(ApplicationStatus::live_values(), vec!["draft", "submitted", "in-review"]);
        assert_eq!(serde_json::to_value(InReview).unwrap(), "in-review");
    }
}
