use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A row from the `grants` table: an externally run funding opportunity.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Grant {
    pub id: Uuid,
    pub title: String,
    pub organization: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    pub currency: String,
    pub deadline: Option<DateTime<Utc>>,
    pub application_url: String,
    pub eligibility: Option<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGrant {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(min = 1, max = 200, message = "Organization is required"))]
    pub organization: String,
    #[validate(length(min = 1, max = 5000, message = "Description is required (max 5000 characters)"))]
    pub description: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[validate(url(message = "Application URL must be a valid URL"))]
    pub application_url: String,
    pub eligibility: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGrant {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Organization must be 1-200 characters"))]
    pub organization: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[validate(url(message = "Application URL must be a valid URL"))]
    pub application_url: Option<String>,
    pub eligibility: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GrantListParams {
    pub search: Option<String>,
    pub tags: Option<String>,
    /// Only grants whose deadline is still ahead.
    pub upcoming: Option<bool>,
    pub include_inactive: Option<bool>,
}
