use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProgramStatus {
    Draft,
    Active,
    Closed,
    Completed,
}

impl ProgramStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramStatus::Draft => "draft",
            ProgramStatus::Active => "active",
            ProgramStatus::Closed => "closed",
            ProgramStatus::Completed => "completed",
        }
    }
}

/// Minimums an application must meet to be accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EligibilityCriteria {
    #[validate(range(min = 0.0, max = 100.0, message = "Women leadership percentage must be between 0 and 100"))]
    pub women_leadership_percentage: f64,
    #[validate(range(min = 0.0, message = "Progress duration cannot be negative"))]
    pub progress_duration_months: f64,
    pub working_prototype: bool,
    pub target_region: Option<String>,
    pub values: Vec<String>,
}

/// Which optional narrative sections a program makes mandatory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationRequirements {
    pub expected_impact: bool,
    pub team_details: bool,
    pub project_overview: bool,
    pub roadmap: bool,
    pub vision_impact: bool,
    pub why_grant: bool,
    pub demo_video: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportantDates {
    pub applications_open: Option<DateTime<Utc>>,
    pub deadline: DateTime<Utc>,
    pub winners_announced: Option<DateTime<Utc>>,
}

/// A row from the `grant_programs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GrantProgram {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub grant_amount: Decimal,
    pub currency: String,
    pub funded_projects_count: i32,
    pub disbursement_phases: i32,
    pub perks: Vec<String>,
    pub eligibility_criteria: Json<EligibilityCriteria>,
    pub application_requirements: Json<ApplicationRequirements>,
    pub important_dates: Json<ImportantDates>,
    pub status: ProgramStatus,
    pub featured: bool,
    pub applications_count: i32,
    pub approved_applications_count: i32,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GrantProgram {
    pub fn deadline(&self) -> DateTime<Utc> {
        self.important_dates.0.deadline
    }

    pub fn is_accepting_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ProgramStatus::Active && now <= self.deadline()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGrantProgram {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(max = 300, message = "Subtitle cannot exceed 300 characters"))]
    pub subtitle: Option<String>,
    #[validate(length(min = 1, max = 10000, message = "Description is required"))]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub grant_amount: Decimal,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    #[validate(range(min = 1, message = "At least one project must be funded"))]
    pub funded_projects_count: Option<i32>,
    #[validate(range(min = 1, message = "At least one disbursement phase is required"))]
    pub disbursement_phases: Option<i32>,
    #[serde(default)]
    pub perks: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub eligibility_criteria: EligibilityCriteria,
    #[serde(default)]
    pub application_requirements: ApplicationRequirements,
    pub important_dates: ImportantDates,
    pub status: Option<ProgramStatus>,
    pub featured: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGrantProgram {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 300, message = "Subtitle cannot exceed 300 characters"))]
    pub subtitle: Option<String>,
    #[validate(length(min = 1, max = 10000, message = "Description must not be empty"))]
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub grant_amount: Option<Decimal>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    #[validate(range(min = 1, message = "At least one project must be funded"))]
    pub funded_projects_count: Option<i32>,
    #[validate(range(min = 1, message = "At least one disbursement phase is required"))]
    pub disbursement_phases: Option<i32>,
    pub perks: Option<Vec<String>>,
    #[validate(nested)]
    pub eligibility_criteria: Option<EligibilityCriteria>,
    pub application_requirements: Option<ApplicationRequirements>,
    pub important_dates: Option<ImportantDates>,
    pub status: Option<ProgramStatus>,
    pub featured: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GrantProgramListParams {
    pub status: Option<ProgramStatus>,
    pub featured: Option<bool>,
    pub search: Option<String>,
}
