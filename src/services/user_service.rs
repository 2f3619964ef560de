use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::user::{UpdateProfile, UserListParams};
use crate::database::models::{split_csv, User};
use crate::database::{DatabaseError, Pagination, Repository};
use crate::filter::{like_pattern, FilterData};

pub struct UserService {
    pool: PgPool,
}

/// Emails are compared and stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> Repository<User> {
        Repository::new("users", self.pool.clone())
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        self.repo().select_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        self.repo()
            .select_one(FilterData::new(json!({ "email": normalize_email(email) })))
            .await
    }

    pub async fn create(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, password_hash, is_admin)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(name.trim())
        .bind(normalize_email(email))
        .bind(password_hash)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, is_admin, "Created user");
        Ok(user)
    }

    /// Absent fields keep their current value.
    pub async fn update_profile(&self, id: Uuid, update: &UpdateProfile) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET
                name = COALESCE($2, name),
                bio = COALESCE($3, bio),
                location = COALESCE($4, location),
                skills = COALESCE($5, skills),
                github_url = COALESCE($6, github_url),
                linkedin_url = COALESCE($7, linkedin_url),
                website_url = COALESCE($8, website_url),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.bio.as_deref())
        .bind(update.location.as_deref())
        .bind(update.skills.as_ref())
        .bind(update.github_url.as_deref())
        .bind(update.linkedin_url.as_deref())
        .bind(update.website_url.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// Also clears any outstanding reset token.
    pub async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE users
             SET password_hash = $2, reset_token_hash = NULL, reset_token_expires = NULL, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_admin(&self, id: Uuid, is_admin: bool) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_admin = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn store_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE users SET reset_token_hash = $2, reset_token_expires = $3 WHERE id = $1")
            .bind(id)
            .bind(token_hash)
            .bind(expires)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The user holding this unexpired reset token, if any.
    pub async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, DatabaseError> {
        self.repo()
            .select_one(FilterData::new(json!({
                "reset_token_hash": token_hash,
                "reset_token_expires": { "$gt": now.to_rfc3339() },
            })))
            .await
    }

    pub async fn set_avatar(&self, id: Uuid, url: &str, public_id: &str) -> Result<User, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET avatar_url = $2, avatar_public_id = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(url)
        .bind(public_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list(&self, params: &UserListParams, page: &Pagination) -> Result<(Vec<User>, i64), DatabaseError> {
        let filter = FilterData::new(list_where(params)).order("created_at desc");
        self.repo().select_page(filter, page.limit, page.offset()).await
    }
}

fn list_where(params: &UserListParams) -> Value {
    let mut conditions = Vec::new();
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        conditions.push(json!({ "$or": [
            { "name": { "$ilike": pattern } },
            { "bio": { "$ilike": pattern } },
        ]}));
    }
    let skills = split_csv(params.skills.as_deref());
    if !skills.is_empty() {
        conditions.push(json!({ "skills": { "$any": skills } }));
    }
    json!({ "$and": conditions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_where::FilterWhere;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn search_and_skills_filter() {
        let params = UserListParams {
            search: Some("ada".into()),
            skills: Some("rust,go".into()),
        };
        let (sql, values) = FilterWhere::generate(&list_where(&params), 1).unwrap();
        assert_eq!(
            sql,
            "((((\"name\" ILIKE $1) OR (\"bio\" ILIKE $2))) AND (\"skills\" && $3::text[]))"
        );
        assert_eq!(values.len(), 3);
        assert_eq!(values[2], json!(["rust", "go"]));
        assert_eq!(values[0], json!("%ada%"));
    }
}
