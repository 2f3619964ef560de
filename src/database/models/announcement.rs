use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AnnouncementPriority {
    Low,
    Normal,
    High,
}

impl AnnouncementPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnouncementPriority::Low => "low",
            AnnouncementPriority::Normal => "normal",
            AnnouncementPriority::High => "high",
        }
    }
}

/// A row from the `announcements` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub priority: AnnouncementPriority,
    pub is_pinned: bool,
    pub is_published: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Announcement {
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_published && self.expires_at.map_or(true, |expires| expires > now)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAnnouncement {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Content is required (max 5000 characters)"))]
    pub content: String,
    pub priority: Option<AnnouncementPriority>,
    pub is_pinned: Option<bool>,
    pub is_published: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAnnouncement {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: Option<String>,
    pub priority: Option<AnnouncementPriority>,
    pub is_pinned: Option<bool>,
    pub is_published: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnnouncementListParams {
    pub priority: Option<AnnouncementPriority>,
}
