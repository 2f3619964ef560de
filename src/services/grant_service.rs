use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::grant::{CreateGrant, GrantListParams, UpdateGrant};
use crate::database::models::{split_csv, Grant};
use crate::database::{DatabaseError, Pagination, Repository};
use crate::filter::{like_pattern, FilterData};

pub struct GrantService {
    pool: PgPool,
}

impl GrantService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> Repository<Grant> {
        Repository::new("grants", self.pool.clone())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<Grant>, DatabaseError> {
        self.repo().select_id(id).await
    }

    pub async fn list(
        &self,
        params: &GrantListParams,
        now: DateTime<Utc>,
        page: &Pagination,
    ) -> Result<(Vec<Grant>, i64), DatabaseError> {
        let filter = FilterData::new(list_where(params, now)).order("deadline asc, created_at desc");
        self.repo().select_page(filter, page.limit, page.offset()).await
    }

    pub async fn create(&self, created_by: Uuid, input: &CreateGrant) -> Result<Grant, DatabaseError> {
        let grant = sqlx::query_as::<_, Grant>(
            "INSERT INTO grants
                (id, title, organization, description, amount, currency, deadline,
                 application_url, eligibility, tags, is_active, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(input.title.trim())
        .bind(input.organization.trim())
        .bind(input.description.trim())
        .bind(input.amount)
        .bind(input.currency.as_deref().unwrap_or("USD"))
        .bind(input.deadline)
        .bind(input.application_url.trim())
        .bind(input.eligibility.as_deref())
        .bind(&input.tags)
        .bind(input.is_active.unwrap_or(true))
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(grant_id = %grant.id, "Created grant");
        Ok(grant)
    }

    pub async fn update(&self, id: Uuid, input: &UpdateGrant) -> Result<Grant, DatabaseError> {
        let grant = sqlx::query_as::<_, Grant>(
            "UPDATE grants SET
                title = COALESCE($2, title),
                organization = COALESCE($3, organization),
                description = COALESCE($4, description),
                amount = COALESCE($5, amount),
                currency = COALESCE($6, currency),
                deadline = COALESCE($7, deadline),
                application_url = COALESCE($8, application_url),
                eligibility = COALESCE($9, eligibility),
                tags = COALESCE($10, tags),
                is_active = COALESCE($11, is_active),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.organization.as_deref().map(str::trim))
        .bind(input.description.as_deref().map(str::trim))
        .bind(input.amount)
        .bind(input.currency.as_deref())
        .bind(input.deadline)
        .bind(input.application_url.as_deref().map(str::trim))
        .bind(input.eligibility.as_deref())
        .bind(input.tags.as_ref())
        .bind(input.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(grant)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM grants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn list_where(params: &GrantListParams, now: DateTime<Utc>) -> Value {
    let mut conditions = Vec::new();
    if !params.include_inactive.unwrap_or(false) {
        conditions.push(json!({ "is_active": true }));
    }
    if params.upcoming.unwrap_or(false) {
        conditions.push(json!({ "deadline": { "$gte": now.to_rfc3339() } }));
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        conditions.push(json!({ "$or": [
            { "title": { "$ilike": pattern } },
            { "organization": { "$ilike": pattern } },
            { "description": { "$ilike": pattern } },
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
    fn inactive_grants_hidden_by_default() {
        let (sql, _) = FilterWhere::generate(&list_where(&GrantListParams::default(), Utc::now()), 0).unwrap();
        assert_eq!(sql, "((\"is_active\" = $1))");

        let params = GrantListParams {
            include_inactive: Some(true),
            ..Default::default()
        };
        let (sql, values) = FilterWhere::generate(&list_where(&params, Utc::now()), 0).unwrap();
        assert_eq!(sql, "TRUE");
        assert!(values.is_empty());
    }
}
