use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::project::{CreateProject, ProjectListParams, UpdateProject};
use crate::database::models::{split_csv, Project, ProjectStatus};
use crate::database::{DatabaseError, Pagination, Repository};
use crate::filter::{like_pattern, FilterData};

pub struct ProjectService {
    pool: PgPool,
}

impl ProjectService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> Repository<Project> {
        Repository::new("projects", self.pool.clone())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        self.repo().select_id(id).await
    }

    /// Public projects only.
    pub async fn list(
        &self,
        params: &ProjectListParams,
        page: &Pagination,
    ) -> Result<(Vec<Project>, i64), DatabaseError> {
        let filter = FilterData::new(public_where(params)).order("created_at desc");
        self.repo().select_page(filter, page.limit, page.offset()).await
    }

    /// Everything the builder owns, private projects included.
    pub async fn list_by_builder(&self, builder_id: Uuid, page: &Pagination) -> Result<(Vec<Project>, i64), DatabaseError> {
        let filter = FilterData::new(json!({ "builder_id": builder_id })).order("created_at desc");
        self.repo().select_page(filter, page.limit, page.offset()).await
    }

    pub async fn public_by_builder(&self, builder_id: Uuid) -> Result<Vec<Project>, DatabaseError> {
        self.repo()
            .select_any(
                FilterData::new(json!({ "builder_id": builder_id, "is_public": true })).order("created_at desc"),
            )
            .await
    }

    pub async fn create(&self, builder_id: Uuid, input: &CreateProject) -> Result<Project, DatabaseError> {
        let project = sqlx::query_as::<_, Project>(
            "INSERT INTO projects
                (id, builder_id, title, description, tech_stack, tags, status,
                 github_url, demo_url, image_url, image_public_id, is_public)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(builder_id)
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(&input.tech_stack)
        .bind(&input.tags)
        .bind(input.status.unwrap_or(ProjectStatus::Idea).as_str())
        .bind(input.github_url.as_deref())
        .bind(input.demo_url.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.image_public_id.as_deref())
        .bind(input.is_public.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(project_id = %project.id, %builder_id, "Created project");
        Ok(project)
    }

    pub async fn update(&self, id: Uuid, input: &UpdateProject) -> Result<Project, DatabaseError> {
        let project = sqlx::query_as::<_, Project>(
            "UPDATE projects SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                tech_stack = COALESCE($4, tech_stack),
                tags = COALESCE($5, tags),
                status = COALESCE($6, status),
                github_url = COALESCE($7, github_url),
                demo_url = COALESCE($8, demo_url),
                image_url = COALESCE($9, image_url),
                image_public_id = COALESCE($10, image_public_id),
                is_public = COALESCE($11, is_public),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.description.as_deref().map(str::trim))
        .bind(input.tech_stack.as_ref())
        .bind(input.tags.as_ref())
        .bind(input.status.map(|s| s.as_str()))
        .bind(input.github_url.as_deref())
        .bind(input.demo_url.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.image_public_id.as_deref())
        .bind(input.is_public)
        .fetch_one(&self.pool)
        .await?;
        Ok(project)
    }

    /// Removes the project and its progress logs together.
    pub async fn delete(&self, id: Uuid) -> Result<u64, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let logs = sqlx::query("DELETE FROM progress_logs WHERE project_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(project_id = %id, logs, "Deleted project");
        Ok(logs)
    }

    pub async fn toggle_featured(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let project = sqlx::query_as::<_, Project>(
            "UPDATE projects SET featured = NOT featured, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(project)
    }
}

fn public_where(params: &ProjectListParams) -> Value {
    let mut conditions = vec![json!({ "is_public": true })];
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        conditions.push(json!({ "$or": [
            { "title": { "$ilike": pattern } },
            { "description": { "$ilike": pattern } },
        ]}));
    }
    let tags = split_csv(params.tags.as_deref());
    if !tags.is_empty() {
        conditions.push(json!({ "tags": { "$any": tags } }));
    }
    if let Some(status) = params.status {
        conditions.push(json!({ "status": status.as_str() }));
    }
    if let Some(builder_id) = params.builder_id {
        conditions.push(json!({ "builder_id": builder_id }));
    }
    if let Some(featured) = params.featured {
        conditions.push(json!({ "featured": featured }));
    }
    json!({ "$and": conditions })
}
