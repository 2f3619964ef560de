use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::progress_log::{CreateProgressLog, ProgressLogListParams, UpdateProgressLog};
use crate::database::models::{split_csv, ProgressLog};
use crate::database::{DatabaseError, Pagination, Repository};
use crate::filter::{like_pattern, FilterData};

pub struct ProgressLogService {
    pool: PgPool,
}

impl ProgressLogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> Repository<ProgressLog> {
        Repository::new("progress_logs", self.pool.clone())
    }

    /// Logs joined with their project's visibility.
    fn public_repo(&self) -> Repository<ProgressLog> {
        Repository::new("progress_log_summaries", self.pool.clone())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<ProgressLog>, DatabaseError> {
        self.repo().select_id(id).await
    }

    /// The log when both it and its project are public.
    pub async fn find_public(&self, id: Uuid) -> Result<Option<ProgressLog>, DatabaseError> {
        self.public_repo()
            .select_one(FilterData::new(json!({
                "id": id,
                "is_public": true,
                "project_is_public": true,
            })))
            .await
    }

    /// Public logs of public projects.
    pub async fn list(
        &self,
        params: &ProgressLogListParams,
        page: &Pagination,
    ) -> Result<(Vec<ProgressLog>, i64), DatabaseError> {
        let filter = FilterData::new(public_where(params)).order("created_at desc");
        self.public_repo().select_page(filter, page.limit, page.offset()).await
    }

    pub async fn list_for_project(
        &self,
        project_id: Uuid,
        include_private: bool,
        page: &Pagination,
    ) -> Result<(Vec<ProgressLog>, i64), DatabaseError> {
        let conditions = if include_private {
            json!({ "project_id": project_id })
        } else {
            json!({ "project_id": project_id, "is_public": true })
        };
        let filter = FilterData::new(conditions).order("created_at desc");
        self.repo().select_page(filter, page.limit, page.offset()).await
    }

    pub async fn create(&self, builder_id: Uuid, input: &CreateProgressLog) -> Result<ProgressLog, DatabaseError> {
        let log = sqlx::query_as::<_, ProgressLog>(
            "INSERT INTO progress_logs (id, project_id, builder_id, title, content, hours_spent, tags, is_public)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(input.project_id)
        .bind(builder_id)
        .bind(input.title.trim())
        .bind(input.content.trim())
        .bind(input.hours_spent.unwrap_or(0.0))
        .bind(&input.tags)
        .bind(input.is_public.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(log_id = %log.id, project_id = %log.project_id, "Created progress log");
        Ok(log)
    }

    pub async fn update(&self, id: Uuid, input: &UpdateProgressLog) -> Result<ProgressLog, DatabaseError> {
        let log = sqlx::query_as::<_, ProgressLog>(
            "UPDATE progress_logs SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                hours_spent = COALESCE($4, hours_spent),
                tags = COALESCE($5, tags),
                is_public = COALESCE($6, is_public),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.content.as_deref().map(str::trim))
        .bind(input.hours_spent)
        .bind(input.tags.as_ref())
        .bind(input.is_public)
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM progress_logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn public_where(params: &ProgressLogListParams) -> Value {
    let mut conditions = vec![json!({ "is_public": true, "project_is_public": true })];
    if let Some(project_id) = params.project_id {
        conditions.push(json!({ "project_id": project_id }));
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        conditions.push(json!({ "$or": [
            { "title": { "$ilike": pattern } },
            { "content": { "$ilike": pattern } },
        ]}));
    }
    let tags = split_csv(params.tags.as_deref());
    if !tags.is_empty() {
        conditions.push(json!({ "tags": { "$any": tags } }));
    }
    json!({ "$and": conditions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_where::FilterWhere;

    #[test]
    fn private_projects_hide_their_logs() {
        let (sql, values) = FilterWhere::generate(&public_where(&ProgressLogListParams::default()), 0).unwrap();
        assert_eq!(sql, "((\"is_public\" = $1 AND \"project_is_public\" = $2))");
        assert_eq!(values, vec![json!(true), json!(true)]);
    }
}
