use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use super::registration::RegistrationError;
use crate::database::models::event::{CreateEvent, EventListParams, EventTimeframe, UpdateEvent};
use crate::database::models::{split_csv, Event, EventSummary};
use crate::database::{DatabaseError, Pagination, Repository};
use crate::filter::{like_pattern, FilterData};

const NOUN: &str = "event";

pub struct EventService {
    pool: PgPool,
}

impl EventService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn summaries(&self) -> Repository<EventSummary> {
        Repository::new("event_summaries", self.pool.clone())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<EventSummary>, DatabaseError> {
        self.summaries().select_id(id).await
    }

    /// Public events. Upcoming lists soonest first, everything else latest first.
    pub async fn list(
        &self,
        params: &EventListParams,
        now: DateTime<Utc>,
        page: &Pagination,
    ) -> Result<(Vec<EventSummary>, i64), DatabaseError> {
        let order = match params.when {
            Some(EventTimeframe::Upcoming) => "start_time asc",
            _ => "start_time desc",
        };
        let filter = FilterData::new(public_where(params, now)).order(order);
        self.summaries().select_page(filter, page.limit, page.offset()).await
    }

    pub async fn create(&self, created_by: Uuid, input: &CreateEvent) -> Result<Event, DatabaseError> {
        let event = sqlx::query_as::<_, Event>(
            "INSERT INTO events
                (id, title, description, event_type, location, is_virtual, meeting_url,
                 start_time, end_time, capacity, image_url, image_public_id, tags, is_public, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(input.event_type.as_str())
        .bind(input.location.as_deref())
        .bind(input.is_virtual)
        .bind(input.meeting_url.as_deref())
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.capacity)
        .bind(input.image_url.as_deref())
        .bind(input.image_public_id.as_deref())
        .bind(&input.tags)
        .bind(input.is_public.unwrap_or(true))
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(event_id = %event.id, "Created event");
        Ok(event)
    }

    pub async fn update(&self, id: Uuid, input: &UpdateEvent) -> Result<Event, DatabaseError> {
        let event = sqlx::query_as::<_, Event>(
            "UPDATE events SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                event_type = COALESCE($4, event_type),
                location = COALESCE($5, location),
                is_virtual = COALESCE($6, is_virtual),
                meeting_url = COALESCE($7, meeting_url),
                start_time = COALESCE($8, start_time),
                end_time = COALESCE($9, end_time),
                capacity = COALESCE($10, capacity),
                image_url = COALESCE($11, image_url),
                image_public_id = COALESCE($12, image_public_id),
                tags = COALESCE($13, tags),
                is_public = COALESCE($14, is_public),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.description.as_deref().map(str::trim))
        .bind(input.event_type.map(|t| t.as_str()))
        .bind(input.location.as_deref())
        .bind(input.is_virtual)
        .bind(input.meeting_url.as_deref())
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(input.capacity)
        .bind(input.image_url.as_deref())
        .bind(input.image_public_id.as_deref())
        .bind(input.tags.as_ref())
        .bind(input.is_public)
        .fetch_one(&self.pool)
        .await?;
        Ok(event)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Registration closes once the event starts.
    pub async fn register(&self, event_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Result<Event, RegistrationError> {
        let mut tx = self.pool.begin().await?;

        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RegistrationError::NotFound("Event not found"))?;

        if now >= event.start_time {
            return Err(RegistrationError::Closed(NOUN));
        }

        let (already, registered): (bool, i64) = sqlx::query_as(
            "SELECT COALESCE(BOOL_OR(user_id = $2), FALSE), COUNT(*)
             FROM event_registrations WHERE event_id = $1",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already {
            return Err(RegistrationError::AlreadyRegistered(NOUN));
        }
        if matches!(event.capacity, Some(cap) if registered >= i64::from(cap)) {
            return Err(RegistrationError::Full(NOUN));
        }

        sqlx::query("INSERT INTO event_registrations (event_id, user_id) VALUES ($1, $2)")
            .bind(event_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(%event_id, %user_id, "Registered for event");
        Ok(event)
    }

    pub async fn unregister(&self, event_id: Uuid, user_id: Uuid) -> Result<(), RegistrationError> {
        let result = sqlx::query("DELETE FROM event_registrations WHERE event_id = $1 AND user_id = $2")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RegistrationError::NotRegistered(NOUN));
        }
        Ok(())
    }
}

fn public_where(params: &EventListParams, now: DateTime<Utc>) -> Value {
    let mut conditions = vec![json!({ "is_public": true })];
    match params.when {
        Some(EventTimeframe::Upcoming) => conditions.push(json!({ "start_time": { "$gte": now.to_rfc3339() } })),
        Some(EventTimeframe::Past) => conditions.push(json!({ "start_time": { "$lt": now.to_rfc3339() } })),
        None => {}
    }
    if let Some(event_type) = params.event_type {
        conditions.push(json!({ "event_type": event_type.as_str() }));
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        conditions.push(json!({ "$or": [
            { "title": { "$ilike": pattern } },
            { "description": { "$ilike": pattern } },
            { "location": { "$ilike": pattern } },
        ]}));
    }
    let tags = split_csv(params.tags.as_deref());
    if !tags.is_empty() {
        conditions.push(json!({ "tags": { "$any": tags } }));
    }
    json!({ "$and": conditions })
}
