use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::grant_application::ApplicationListParams;
use crate::database::models::{
    ApplicationStatus, GrantApplication, GrantApplicationDetail, GrantProgram, ProgramStatus, Project,
};
use crate::database::{DatabaseError, Pagination, Repository};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::validation::Submission;

const LIVE_CONSTRAINT: &str = "uq_grant_applications_live";

#[derive(Debug, thiserror::Error)]
pub enum GrantApplicationError {
    #[error("Validation failed")]
    Invalid(Vec<String>),
    #[error("Grant program not found")]
    ProgramNotFound,
    #[error("This grant program is not accepting applications")]
    NotAccepting,
    #[error("The application deadline for this grant program has passed")]
    DeadlinePassed,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("You can only apply with your own projects")]
    NotProjectOwner,
    #[error("You already have an active application for this grant program")]
    ApplicantAlreadyApplied,
    #[error("An active application for this project already exists in this program")]
    ProjectAlreadyApplied,
    #[error("This program requires at least {0}% women in leadership positions")]
    WomenLeadershipTooLow(f64),
    #[error("This program requires at least {0} months of progress on the project")]
    ProgressTooShort(f64),
    #[error("This program requires a working prototype")]
    PrototypeRequired,
    #[error("Application not found")]
    NotFound,
    #[error("Cannot change application status from {} to {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("Only submitted applications can be withdrawn")]
    NotWithdrawable,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for GrantApplicationError {
    fn from(err: sqlx::Error) -> Self {
        GrantApplicationError::Database(err.into())
    }
}

impl From<GrantApplicationError> for ApiError {
    fn from(err: GrantApplicationError) -> Self {
        use GrantApplicationError::*;
        match err {
            Invalid(errors) => ApiError::validation_error(errors),
            ProgramNotFound | ProjectNotFound | NotFound => ApiError::not_found(err.to_string()),
            NotProjectOwner => ApiError::forbidden(err.to_string()),
            Database(db) => db.into(),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

/// Result of a status change.
#[derive(Debug)]
pub struct Review {
    pub application: GrantApplication,
    /// False when the application already had the requested status.
    pub changed: bool,
}

pub struct GrantApplicationService {
    pool: PgPool,
}

impl GrantApplicationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn details(&self) -> Repository<GrantApplicationDetail> {
        Repository::new("grant_application_details", self.pool.clone())
    }

    fn applications(&self) -> Repository<GrantApplication> {
        Repository::new("grant_applications", self.pool.clone())
    }

    async fn program(&self, id: Uuid) -> Result<Option<GrantProgram>, DatabaseError> {
        Repository::<GrantProgram>::new("grant_programs", self.pool.clone())
            .select_id(id)
            .await
    }

    async fn project(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        Repository::<Project>::new("projects", self.pool.clone()).select_id(id).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<GrantApplicationDetail>, DatabaseError> {
        self.details().select_id(id).await
    }

    /// Runs the submission checks in order and stops at the first failure.
    /// Returns the created application with the program it was filed under.
    pub async fn submit(
        &self,
        applicant_id: Uuid,
        payload: &Value,
        now: DateTime<Utc>,
    ) -> Result<(GrantApplication, GrantProgram, Project), GrantApplicationError> {
        let submission = Submission::parse(payload).map_err(GrantApplicationError::Invalid)?;

        let program = self
            .program(submission.program_id)
            .await?
            .ok_or(GrantApplicationError::ProgramNotFound)?;
        check_accepting(&program, now)?;
        submission
            .check_requirements(&program.application_requirements.0)
            .map_err(GrantApplicationError::Invalid)?;

        let project = self
            .project(submission.project_id)
            .await?
            .ok_or(GrantApplicationError::ProjectNotFound)?;
        if project.builder_id != applicant_id {
            return Err(GrantApplicationError::NotProjectOwner);
        }

        let live = ApplicationStatus::live_values();
        let by_applicant = self
            .applications()
            .count(FilterData::new(json!({
                "program_id": program.id,
                "applicant_id": applicant_id,
                "status": { "$in": live },
            })))
            .await?;
        if by_applicant > 0 {
            return Err(GrantApplicationError::ApplicantAlreadyApplied);
        }

        let for_project = self
            .applications()
            .count(FilterData::new(json!({
                "program_id": program.id,
                "project_id": project.id,
                "status": { "$in": live },
            })))
            .await?;
        if for_project > 0 {
            return Err(GrantApplicationError::ProjectAlreadyApplied);
        }

        check_eligibility(&submission, &program)?;

        let application = match self.insert(applicant_id, &submission).await {
            Ok(application) => application,
            Err(err) if err.unique_violation() == Some(LIVE_CONSTRAINT) => {
                tracing::info!(program_id = %program.id, project_id = %project.id, "Lost race on live application index");
                return Err(GrantApplicationError::ProjectAlreadyApplied);
            }
            Err(err) => return Err(err.into()),
        };

        // Separate write; a failure here leaves the counter stale, not the application missing.
        if let Err(e) = sqlx::query(
            "UPDATE grant_programs SET applications_count = applications_count + 1 WHERE id = $1",
        )
        .bind(program.id)
        .execute(&self.pool)
        .await
        {
            tracing::error!(program_id = %program.id, error = %e, "Failed to increment applications_count");
        }

        tracing::info!(
            application_id = %application.id,
            program_id = %program.id,
            project_id = %project.id,
            %applicant_id,
            "Grant application submitted"
        );
        Ok((application, program, project))
    }

    async fn insert(&self, applicant_id: Uuid, s: &Submission) -> Result<GrantApplication, DatabaseError> {
        let application = sqlx::query_as::<_, GrantApplication>(
            "INSERT INTO grant_applications
                (id, program_id, project_id, applicant_id, status, proposal, budget_breakdown, timeline,
                 expected_impact, team_details, project_overview, roadmap, vision_impact, why_grant,
                 pitch_video_url, presentation_url, demo_video_url, additional_materials,
                 women_leadership_percentage, working_prototype, progress_duration_months)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                     $15, $16, $17, $18, $19, $20, $21)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(s.program_id)
        .bind(s.project_id)
        .bind(applicant_id)
        .bind(ApplicationStatus::Submitted.as_str())
        .bind(&s.proposal)
        .bind(&s.budget_breakdown)
        .bind(&s.timeline)
        .bind(s.expected_impact.as_deref())
        .bind(s.team_details.as_deref())
        .bind(s.project_overview.as_deref())
        .bind(s.roadmap.as_deref())
        .bind(s.vision_impact.as_deref())
        .bind(s.why_grant.as_deref())
        .bind(&s.pitch_video_url)
        .bind(&s.presentation_url)
        .bind(s.demo_video_url.as_deref())
        .bind(&s.additional_materials)
        .bind(s.women_leadership_percentage)
        .bind(s.working_prototype)
        .bind(s.progress_duration_months)
        .fetch_one(&self.pool)
        .await?;
        Ok(application)
    }

    /// Moves an application along the review path. Approval bumps the
    /// program's approved counter in the same transaction.
    pub async fn update_status(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
        next: ApplicationStatus,
        review_notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Review, GrantApplicationError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, GrantApplication>(
            "SELECT * FROM grant_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GrantApplicationError::NotFound)?;

        if current.status == next {
            return Ok(Review {
                application: current,
                changed: false,
            });
        }
        if !current.status.can_transition_to(next) {
            return Err(GrantApplicationError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let application = if next.is_terminal() {
            sqlx::query_as::<_, GrantApplication>(
                "UPDATE grant_applications
                 SET status = $2, reviewer_id = $3, reviewed_date = $4, review_notes = $5, updated_at = NOW()
                 WHERE id = $1
                 RETURNING *",
            )
            .bind(id)
            .bind(next.as_str())
            .bind(reviewer_id)
            .bind(now)
            .bind(review_notes.unwrap_or_default())
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_as::<_, GrantApplication>(
                "UPDATE grant_applications SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
            )
            .bind(id)
            .bind(next.as_str())
            .fetch_one(&mut *tx)
            .await?
        };

        if next == ApplicationStatus::Approved {
            sqlx::query(
                "UPDATE grant_programs
                 SET approved_applications_count = approved_applications_count + 1
                 WHERE id = $1",
            )
            .bind(application.program_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            application_id = %id,
            %reviewer_id,
            from = current.status.as_str(),
            to = next.as_str(),
            "Grant application status changed"
        );
        Ok(Review {
            application,
            changed: true,
        })
    }

    /// Deletes a still-submitted application and gives back its program slot.
    pub async fn withdraw(&self, id: Uuid, applicant_id: Uuid, is_admin: bool) -> Result<(), GrantApplicationError> {
        let mut tx = self.pool.begin().await?;

        let application = sqlx::query_as::<_, GrantApplication>(
            "SELECT * FROM grant_applications WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GrantApplicationError::NotFound)?;

        if application.applicant_id != applicant_id && !is_admin {
            // Other people's applications are not acknowledged.
            return Err(GrantApplicationError::NotFound);
        }
        if application.status != ApplicationStatus::Submitted {
            return Err(GrantApplicationError::NotWithdrawable);
        }

        sqlx::query("DELETE FROM grant_applications WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE grant_programs
             SET applications_count = GREATEST(applications_count - 1, 0)
             WHERE id = $1",
        )
        .bind(application.program_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(application_id = %id, program_id = %application.program_id, "Grant application withdrawn");
        Ok(())
    }

    pub async fn list_for_applicant(
        &self,
        applicant_id: Uuid,
        status: Option<ApplicationStatus>,
        page: &Pagination,
    ) -> Result<(Vec<GrantApplicationDetail>, i64), DatabaseError> {
        let mut conditions = json!({ "applicant_id": applicant_id });
        if let Some(status) = status {
            conditions["status"] = json!(status.as_str());
        }
        let filter = FilterData::new(conditions).order("submitted_date desc");
        self.details().select_page(filter, page.limit, page.offset()).await
    }

    pub async fn list(
        &self,
        params: &ApplicationListParams,
        page: &Pagination,
    ) -> Result<(Vec<GrantApplicationDetail>, i64), DatabaseError> {
        let filter = FilterData::new(admin_where(params)).order("submitted_date desc");
        self.details().select_page(filter, page.limit, page.offset()).await
    }
}

fn check_accepting(program: &GrantProgram, now: DateTime<Utc>) -> Result<(), GrantApplicationError> {
    if program.is_accepting_at(now) {
        return Ok(());
    }
    if program.status == ProgramStatus::Active {
        Err(GrantApplicationError::DeadlinePassed)
    } else {
        Err(GrantApplicationError::NotAccepting)
    }
}

fn check_eligibility(submission: &Submission, program: &GrantProgram) -> Result<(), GrantApplicationError> {
    let criteria = &program.eligibility_criteria.0;
    if submission.women_leadership_percentage < criteria.women_leadership_percentage {
        return Err(GrantApplicationError::WomenLeadershipTooLow(criteria.women_leadership_percentage));
    }
    if submission.progress_duration_months < criteria.progress_duration_months {
        return Err(GrantApplicationError::ProgressTooShort(criteria.progress_duration_months));
    }
    if criteria.working_prototype && !submission.working_prototype {
        return Err(GrantApplicationError::PrototypeRequired);
    }
    Ok(())
}

fn admin_where(params: &ApplicationListParams) -> Value {
    let mut conditions = serde_json::Map::new();
    if let Some(program_id) = params.program_id {
        conditions.insert("program_id".into(), json!(program_id));
    }
    if let Some(project_id) = params.project_id {
        conditions.insert("project_id".into(), json!(project_id));
    }
    if let Some(status) = params.status {
        conditions.insert("status".into(), json!(status.as_str()));
    }
    Value::Object(conditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::unique_violation_message;
    use crate::database::models::{ApplicationRequirements, EligibilityCriteria, ImportantDates};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use sqlx::types::Json;

    fn program(status: ProgramStatus, deadline: DateTime<Utc>, criteria: EligibilityCriteria) -> GrantProgram {
        GrantProgram {
            id: Uuid::new_v4(),
            title: "Builders Fund".into(),
            subtitle: None,
            description: "Funding".into(),
            grant_amount: Decimal::new(1000, 0),
            currency: "USD".into(),
            funded_projects_count: 1,
            disbursement_phases: 1,
            perks: vec![],
            eligibility_criteria: Json(criteria),
            application_requirements: Json(ApplicationRequirements::default()),
            important_dates: Json(ImportantDates {
                applications_open: None,
                deadline,
                winners_announced: None,
            }),
            status,
            featured: false,
            applications_count: 0,
            approved_applications_count: 0,
            created_by: Uuid::new_v4(),
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn submission(pct: f64, months: f64, prototype: bool) -> Submission {
        Submission {
            program_id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            proposal: "p".repeat(100),
            budget_breakdown: "b".repeat(50),
            timeline: "t".repeat(20),
            expected_impact: None,
            team_details: None,
            project_overview: None,
            roadmap: None,
            vision_impact: None,
            why_grant: None,
            pitch_video_url: "https://example.com/v".into(),
            presentation_url: "https://example.com/p".into(),
            demo_video_url: None,
            additional_materials: vec![],
            women_leadership_percentage: pct,
            working_prototype: prototype,
            progress_duration_months: months,
        }
    }

    #[test]
    fn closed_and_expired_programs_have_distinct_errors() {
        let now = Utc::now();
        let expired = program(ProgramStatus::Active, now - Duration::hours(1), EligibilityCriteria::default());
        assert!(matches!(check_accepting(&expired, now), Err(GrantApplicationError::DeadlinePassed)));

        let closed = program(ProgramStatus::Closed, now + Duration::days(3), EligibilityCriteria::default());
        assert!(matches!(check_accepting(&closed, now), Err(GrantApplicationError::NotAccepting)));

        let open = program(ProgramStatus::Active, now + Duration::days(3), EligibilityCriteria::default());
        assert!(check_accepting(&open, now).is_ok());
    }

    #[test]
    fn eligibility_cites_the_program_minimum() {
        let criteria = EligibilityCriteria {
            women_leadership_percentage: 60.0,
            progress_duration_months: 3.0,
            working_prototype: true,
            ..Default::default()
        };
        let p = program(ProgramStatus::Active, Utc::now(), criteria);

        let err = check_eligibility(&submission(50.0, 6.0, true), &p).unwrap_err();
        assert!(err.to_string().contains("at least 60%"), "{}", err);

        let err = check_eligibility(&submission(60.0, 2.5, true), &p).unwrap_err();
        assert!(err.to_string().contains("at least 3 months"), "{}", err);

        let err = check_eligibility(&submission(60.0, 3.0, false), &p).unwrap_err();
        assert!(matches!(err, GrantApplicationError::PrototypeRequired));

        assert!(check_eligibility(&submission(60.0, 3.0, true), &p).is_ok());
    }

    #[test]
    fn error_statuses() {
        let to_status = |e: GrantApplicationError| ApiError::from(e).status_code();
        assert_eq!(to_status(GrantApplicationError::ProgramNotFound), 404);
        assert_eq!(to_status(GrantApplicationError::NotProjectOwner), 403);
        assert_eq!(to_status(GrantApplicationError::ProjectAlreadyApplied), 400);
        assert_eq!(to_status(GrantApplicationError::Invalid(vec!["x".into()])), 400);
        assert_eq!(
            to_status(GrantApplicationError::InvalidTransition {
                from: ApplicationStatus::Approved,
                to: ApplicationStatus::Rejected,
            }),
            400
        );
    }

    #[test]
    fn duplicate_message_matches_constraint_message() {
        assert_eq!(
            unique_violation_message(LIVE_CONSTRAINT),
            Some(GrantApplicationError::ProjectAlreadyApplied.to_string().as_str())
        );
    }

    #[test]
    fn transition_message_uses_wire_names() {
        let err = GrantApplicationError::InvalidTransition {
            from: ApplicationStatus::InReview,
            to: ApplicationStatus::Submitted,
        };
        assert_eq!(err.to_string(), "Cannot change application status from in-review to submitted");
    }
}
