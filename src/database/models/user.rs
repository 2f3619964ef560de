use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A row from the `users` table. Credentials never leave the server.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
    pub avatar_public_id: Option<String>,
    pub skills: Vec<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub website_url: Option<String>,
    pub is_admin: bool,
    #[serde(skip)]
    pub reset_token_hash: Option<String>,
    #[serde(skip)]
    pub reset_token_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required (max 100 characters)"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Bio cannot exceed 500 characters"))]
    pub bio: Option<String>,
    #[validate(length(max = 100, message = "Location cannot exceed 100 characters"))]
    pub location: Option<String>,
    #[validate(length(max = 30, message = "At most 30 skills"))]
    pub skills: Option<Vec<String>>,
    #[validate(url(message = "GitHub URL must be a valid URL"))]
    pub github_url: Option<String>,
    #[validate(url(message = "LinkedIn URL must be a valid URL"))]
    pub linkedin_url: Option<String>,
    #[validate(url(message = "Website URL must be a valid URL"))]
    pub website_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub search: Option<String>,
    pub skills: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            bio: None,
            location: None,
            avatar_url: None,
            avatar_public_id: None,
            skills: vec!["rust".into()],
            github_url: None,
            linkedin_url: None,
            website_url: None,
            is_admin: false,
            reset_token_hash: Some("abc".into()),
            reset_token_expires: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn credentials_are_never_serialized() {
        let value = serde_json::to_value(user()).unwrap();
        assert!(value.get("password_hash").is_none());
        assert!(value.get("reset_token_hash").is_none());
        assert!(value.get("reset_token_expires").is_none());
        assert_eq!(value["email"], "ada@example.com");
    }

    #[test]
    fn profile_urls_are_checked() {
        let update = UpdateProfile {
            name: None,
            bio: None,
            location: None,
            skills: None,
            github_url: Some("not a url".into()),
            linkedin_url: None,
            website_url: Some("https://ada.dev".into()),
        };
        let errors = update.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("github_url"));
        assert!(!errors.field_errors().contains_key("website_url"));
    }
}
