use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::grant_program::{CreateGrantProgram, GrantProgramListParams, UpdateGrantProgram};
use crate::database::models::{GrantProgram, ProgramStatus};
use crate::database::{DatabaseError, Pagination, Repository};
use crate::filter::{like_pattern, FilterData};

pub struct GrantProgramService {
    pool: PgPool,
}

impl GrantProgramService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn repo(&self) -> Repository<GrantProgram> {
        Repository::new("grant_programs", self.pool.clone())
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<GrantProgram>, DatabaseError> {
        self.repo().select_id(id).await
    }

    /// Featured first. Drafts are only listed when `include_drafts` is set.
    pub async fn list(
        &self,
        params: &GrantProgramListParams,
        include_drafts: bool,
        page: &Pagination,
    ) -> Result<(Vec<GrantProgram>, i64), DatabaseError> {
        let filter = FilterData::new(list_where(params, include_drafts)).order("featured desc, created_at desc");
        self.repo().select_page(filter, page.limit, page.offset()).await
    }

    pub async fn create(&self, created_by: Uuid, input: &CreateGrantProgram) -> Result<GrantProgram, DatabaseError> {
        let program = sqlx::query_as::<_, GrantProgram>(
            "INSERT INTO grant_programs
                (id, title, subtitle, description, grant_amount, currency, funded_projects_count,
                 disbursement_phases, perks, eligibility_criteria, application_requirements,
                 important_dates, status, featured, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(input.title.trim())
        .bind(input.subtitle.as_deref())
        .bind(input.description.trim())
        .bind(input.grant_amount)
        .bind(input.currency.as_deref().unwrap_or("USD"))
        .bind(input.funded_projects_count.unwrap_or(1))
        .bind(input.disbursement_phases.unwrap_or(1))
        .bind(&input.perks)
        .bind(Json(&input.eligibility_criteria))
        .bind(Json(&input.application_requirements))
        .bind(Json(&input.important_dates))
        .bind(input.status.unwrap_or(ProgramStatus::Draft).as_str())
        .bind(input.featured.unwrap_or(false))
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(program_id = %program.id, status = program.status.as_str(), "Created grant program");
        Ok(program)
    }

    pub async fn update(
        &self,
        id: Uuid,
        updated_by: Uuid,
        input: &UpdateGrantProgram,
    ) -> Result<GrantProgram, DatabaseError> {
        let program = sqlx::query_as::<_, GrantProgram>(
            "UPDATE grant_programs SET
                title = COALESCE($3, title),
                subtitle = COALESCE($4, subtitle),
                description = COALESCE($5, description),
                grant_amount = COALESCE($6, grant_amount),
                currency = COALESCE($7, currency),
                funded_projects_count = COALESCE($8, funded_projects_count),
                disbursement_phases = COALESCE($9, disbursement_phases),
                perks = COALESCE($10, perks),
                eligibility_criteria = COALESCE($11, eligibility_criteria),
                application_requirements = COALESCE($12, application_requirements),
                important_dates = COALESCE($13, important_dates),
                status = COALESCE($14, status),
                featured = COALESCE($15, featured),
                updated_by = $2,
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(updated_by)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.subtitle.as_deref())
        .bind(input.description.as_deref().map(str::trim))
        .bind(input.grant_amount)
        .bind(input.currency.as_deref())
        .bind(input.funded_projects_count)
        .bind(input.disbursement_phases)
        .bind(input.perks.as_ref())
        .bind(input.eligibility_criteria.as_ref().map(Json))
        .bind(input.application_requirements.as_ref().map(Json))
        .bind(input.important_dates.as_ref().map(Json))
        .bind(input.status.map(|s| s.as_str()))
        .bind(input.featured)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(program_id = %id, %updated_by, "Updated grant program");
        Ok(program)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM grant_programs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn toggle_featured(&self, id: Uuid, updated_by: Uuid) -> Result<Option<GrantProgram>, DatabaseError> {
        let program = sqlx::query_as::<_, GrantProgram>(
            "UPDATE grant_programs SET featured = NOT featured, updated_by = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(updated_by)
        .fetch_optional(&self.pool)
        .await?;
        Ok(program)
    }
}

fn list_where(params: &GrantProgramListParams, include_drafts: bool) -> Value {
    let mut conditions = Vec::new();
    match params.status {
        Some(ProgramStatus::Draft) if !include_drafts => return json!({ "$or": [] }),
        Some(status) => conditions.push(json!({ "status": status.as_str() })),
        None if !include_drafts => conditions.push(json!({ "status": { "$ne": ProgramStatus::Draft.as_str() } })),
        None => {}
    }
    if let Some(featured) = params.featured {
        conditions.push(json!({ "featured": featured }));
    }
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        conditions.push(json!({ "$or": [
            { "title": { "$ilike": pattern } },
            { "subtitle": { "$ilike": pattern } },
            { "description": { "$ilike": pattern } },
        ]}));
    }
    json!({ "$and": conditions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_where::FilterWhere;

    #[test]
    fn public_listing_hides_drafts() {
        let (sql, values) =
            FilterWhere::generate(&list_where(&GrantProgramListParams::default(), false), 0).unwrap();
        assert_eq!(sql, "((\"status\" <> $1))");
        assert_eq!(values, vec![json!("draft")]);

        let asks_for_drafts = GrantProgramListParams {
            status: Some(ProgramStatus::Draft),
            ..Default::default()
        };
        let (sql, _) = FilterWhere::generate(&list_where(&asks_for_drafts, false), 0).unwrap();
        assert_eq!(sql, "FALSE");

        let (sql, _) = FilterWhere::generate(&list_where(&asks_for_drafts, true), 0).unwrap();
        assert_eq!(sql, "((\"status\" = $1))");
    }
}
