use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A row from the `progress_logs` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProgressLog {
    pub id: Uuid,
    pub project_id: Uuid,
    pub builder_id: Uuid,
    pub title: String,
    pub content: String,
    pub hours_spent: f64,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProgressLog {
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Content is required (max 5000 characters)"))]
    pub content: String,
    #[validate(range(min = 0.0, message = "Hours spent cannot be negative"))]
    pub hours_spent: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProgressLog {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: Option<String>,
    #[validate(range(min = 0.0, message = "Hours spent cannot be negative"))]
    pub hours_spent: Option<f64>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgressLogListParams {
    pub project_id: Option<Uuid>,
    pub search: Option<String>,
    pub tags: Option<String>,
}
