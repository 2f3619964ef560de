use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Idea,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Idea => "idea",
            ProjectStatus::InProgress => "in-progress",
            ProjectStatus::Completed => "completed",
        }
    }
}

/// A row from the `projects` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub builder_id: Uuid,
    pub title: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub tags: Vec<String>,
    pub status: ProjectStatus,
    pub github_url: Option<String>,
    pub demo_url: Option<String>,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub is_public: bool,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn visible_to(&self, user_id: Option<Uuid>, is_admin: bool) -> bool {
        self.is_public || is_admin || user_id == Some(self.builder_id)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProject {
    #[validate(length(min = 1, max = 100, message = "Title is required (max 100 characters)"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "Description is required (max 2000 characters)"))]
    pub description: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: Option<ProjectStatus>,
    #[validate(url(message = "GitHub URL must be a valid URL"))]
    pub github_url: Option<String>,
    #[validate(url(message = "Demo URL must be a valid URL"))]
    pub demo_url: Option<String>,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProject {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ProjectStatus>,
    #[validate(url(message = "GitHub URL must be a valid URL"))]
    pub github_url: Option<String>,
    #[validate(url(message = "Demo URL must be a valid URL"))]
    pub demo_url: Option<String>,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListParams {
    pub search: Option<String>,
    pub tags: Option<String>,
    pub status: Option<ProjectStatus>,
    pub builder_id: Option<Uuid>,
    pub featured: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_format() {
        assert_eq!(serde_json::to_value(ProjectStatus::InProgress).unwrap(), "in-progress");
        let parsed: ProjectStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed.as_str(), "completed");
    }
}
