use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::announcement::{AnnouncementListParams, CreateAnnouncement, UpdateAnnouncement};
use crate::database::models::{Announcement, AnnouncementPriority};
use crate::database::{DatabaseError, Pagination, Repository};
use crate::filter::FilterData;

pub struct AnnouncementService {
    pool: PgPool,
}

impl AnnouncementService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> Repository<Announcement> {
        Repository::new("announcements", self.pool.clone())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Announcement>, DatabaseError> {
        self.repo().select_id(id).await
    }

    /// Published and unexpired, pinned first.
    pub async fn list_visible(
        &self,
        params: &AnnouncementListParams,
        now: DateTime<Utc>,
        page: &Pagination,
    ) -> Result<(Vec<Announcement>, i64), DatabaseError> {
        let filter = FilterData::new(visible_where(params, now)).order("is_pinned desc, created_at desc");
        self.repo().select_page(filter, page.limit, page.offset()).await
    }

    pub async fn create(&self, created_by: Uuid, input: &CreateAnnouncement) -> Result<Announcement, DatabaseError> {
        let announcement = sqlx::query_as::<_, Announcement>(
            "INSERT INTO announcements (id, title, content, priority, is_pinned, is_published, expires_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(input.title.trim())
        .bind(input.content.trim())
        .bind(input.priority.unwrap_or(AnnouncementPriority::Normal).as_str())
        .bind(input.is_pinned.unwrap_or(false))
        .bind(input.is_published.unwrap_or(true))
        .bind(input.expires_at)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(announcement_id = %announcement.id, "Created announcement");
        Ok(announcement)
    }

    pub async fn update(&self, id: Uuid, input: &UpdateAnnouncement) -> Result<Announcement, DatabaseError> {
        let announcement = sqlx::query_as::<_, Announcement>(
            "UPDATE announcements SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                priority = COALESCE($4, priority),
                is_pinned = COALESCE($5, is_pinned),
                is_published = COALESCE($6, is_published),
                expires_at = COALESCE($7, expires_at),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.content.as_deref().map(str::trim))
        .bind(input.priority.map(|p| p.as_str()))
        .bind(input.is_pinned)
        .bind(input.is_published)
        .bind(input.expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(announcement)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn visible_where(params: &AnnouncementListParams, now: DateTime<Utc>) -> Value {
    let mut conditions = vec![
        json!({ "is_published": true }),
        json!({ "$or": [
            { "expires_at": null },
            { "expires_at": { "$gt": now.to_rfc3339() } },
        ]}),
    ];
    if let Some(priority) = params.priority {
        conditions.push(json!({ "priority": priority.as_str() }));
    }
    json!({ "$and": conditions })
}
