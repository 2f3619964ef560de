use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    Workshop,
    Meetup,
    Hackathon,
    Webinar,
    Conference,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Workshop => "workshop",
            EventType::Meetup => "meetup",
            EventType::Hackathon => "hackathon",
            EventType::Webinar => "webinar",
            EventType::Conference => "conference",
        }
    }
}

/// A row from the `events` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub location: Option<String>,
    pub is_virtual: bool,
    pub meeting_url: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: Option<i32>,
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `event_summaries` view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub event: Event,
    pub registration_count: i64,
}

impl EventSummary {
    pub fn is_full(&self) -> bool {
        matches!(self.event.capacity, Some(cap) if self.registration_count >= i64::from(cap))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEvent {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Description is required (max 5000 characters)"))]
    pub description: String,
    pub event_type: EventType,
    pub location: Option<String>,
    #[serde(default)]
    pub is_virtual: bool,
    #[validate(url(message = "Meeting URL must be a valid URL"))]
    pub meeting_url: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateEvent {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: Option<String>,
    pub event_type: Option<EventType>,
    pub location: Option<String>,
    pub is_virtual: Option<bool>,
    #[validate(url(message = "Meeting URL must be a valid URL"))]
    pub meeting_url: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
    #[validate(url(message = "Image URL must be a valid URL"))]
    pub image_url: Option<String>,
    pub image_public_id: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTimeframe {
    Upcoming,
    Past,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventListParams {
    pub when: Option<EventTimeframe>,
    pub event_type: Option<EventType>,
    pub search: Option<String>,
    pub tags: Option<String>,
}
