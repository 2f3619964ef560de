use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::registration::RegistrationError;
use crate::database::models::challenge::{
    ChallengeListParams, CreateChallenge, Participant, UpdateChallenge,
};
use crate::database::models::{
    split_csv, Challenge, ChallengeDifficulty, ChallengeStatus, ChallengeSummary, Winner,
};
use crate::database::{DatabaseError, Pagination, Repository};
use crate::filter::{escape_like, like_pattern, FilterData};

const NOUN: &str = "challenge";

pub struct ChallengeService {
    pool: PgPool,
}

impl ChallengeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn summaries(&self) -> Repository<ChallengeSummary> {
        Repository::new("challenge_summaries", self.pool.clone())
    }

    pub async fn find(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<ChallengeSummary>, DatabaseError> {
        Ok(self.summaries().select_id(id).await?.map(|c| c.with_status(now)))
    }

    /// Public challenges, newest start first.
    pub async fn list(
        &self,
        params: &ChallengeListParams,
        now: DateTime<Utc>,
        page: &Pagination,
    ) -> Result<(Vec<ChallengeSummary>, i64), DatabaseError> {
        let filter = FilterData::new(public_where(params, now)).order("start_date desc");
        let (rows, total) = self.summaries().select_page(filter, page.limit, page.offset()).await?;
        Ok((rows.into_iter().map(|c| c.with_status(now)).collect(), total))
    }

    pub async fn create(&self, created_by: Uuid, input: &CreateChallenge) -> Result<Challenge, DatabaseError> {
        let challenge = sqlx::query_as::<_, Challenge>(
            "INSERT INTO challenges
                (id, title, description, category, difficulty, start_date, end_date,
                 prizes, requirements, tags, max_participants, is_public, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(input.title.trim())
        .bind(input.description.trim())
        .bind(input.category.trim())
        .bind(input.difficulty.unwrap_or(ChallengeDifficulty::Beginner).as_str())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.prizes)
        .bind(&input.requirements)
        .bind(&input.tags)
        .bind(input.max_participants)
        .bind(input.is_public.unwrap_or(true))
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(challenge_id = %challenge.id, "Created challenge");
        Ok(challenge)
    }

    pub async fn update(&self, id: Uuid, input: &UpdateChallenge) -> Result<Challenge, DatabaseError> {
        let challenge = sqlx::query_as::<_, Challenge>(
            "UPDATE challenges SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                difficulty = COALESCE($5, difficulty),
                start_date = COALESCE($6, start_date),
                end_date = COALESCE($7, end_date),
                prizes = COALESCE($8, prizes),
                requirements = COALESCE($9, requirements),
                tags = COALESCE($10, tags),
                max_participants = COALESCE($11, max_participants),
                is_public = COALESCE($12, is_public),
                updated_at = NOW()
             WHERE id = $1
             RETURNING *",
        )
        .bind(id)
        .bind(input.title.as_deref().map(str::trim))
        .bind(input.description.as_deref().map(str::trim))
        .bind(input.category.as_deref().map(str::trim))
        .bind(input.difficulty.map(|d| d.as_str()))
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.prizes.as_ref())
        .bind(input.requirements.as_ref())
        .bind(input.tags.as_ref())
        .bind(input.max_participants)
        .bind(input.is_public)
        .fetch_one(&self.pool)
        .await?;
        Ok(challenge)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM challenges WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Registers the user unless the challenge has ended or is full. The
    /// challenge row is locked so concurrent registrations respect capacity.
    pub async fn register(
        &self,
        challenge_id: Uuid,
        user_id: Uuid,
        project_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Challenge, RegistrationError> {
        let mut tx = self.pool.begin().await?;

        let challenge = sqlx::query_as::<_, Challenge>("SELECT * FROM challenges WHERE id = $1 FOR UPDATE")
            .bind(challenge_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RegistrationError::NotFound("Challenge not found"))?;

        if ChallengeStatus::at(challenge.start_date, challenge.end_date, now) == ChallengeStatus::Completed {
            return Err(RegistrationError::Closed(NOUN));
        }

        let (already, participants): (bool, i64) = sqlx::query_as(
            "SELECT COALESCE(BOOL_OR(user_id = $2), FALSE), COUNT(*)
             FROM challenge_registrations WHERE challenge_id = $1",
        )
        .bind(challenge_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if already {
            return Err(RegistrationError::AlreadyRegistered(NOUN));
        }
        if matches!(challenge.max_participants, Some(max) if participants >= i64::from(max)) {
            return Err(RegistrationError::Full(NOUN));
        }

        sqlx::query("INSERT INTO challenge_registrations (challenge_id, user_id, project_id) VALUES ($1, $2, $3)")
            .bind(challenge_id)
            .bind(user_id)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(%challenge_id, %user_id, "Registered for challenge");
        Ok(challenge)
    }

    pub async fn unregister(&self, challenge_id: Uuid, user_id: Uuid) -> Result<(), RegistrationError> {
        let result = sqlx::query("DELETE FROM challenge_registrations WHERE challenge_id = $1 AND user_id = $2")
            .bind(challenge_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RegistrationError::NotRegistered(NOUN));
        }
        Ok(())
    }

    pub async fn participants(&self, challenge_id: Uuid) -> Result<Vec<Participant>, DatabaseError> {
        let rows = sqlx::query_as::<_, Participant>(
            "SELECT r.user_id, u.name, u.avatar_url, r.project_id, r.registered_at
             FROM challenge_registrations r
             JOIN users u ON u.id = r.user_id
             WHERE r.challenge_id = $1
             ORDER BY r.registered_at",
        )
        .bind(challenge_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Winners that are not registered participants.
    pub async fn unregistered_winners(&self, challenge_id: Uuid, winners: &[Winner]) -> Result<Vec<Uuid>, DatabaseError> {
        let ids: Vec<Uuid> = winners.iter().map(|w| w.user_id).collect();
        let registered: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM challenge_registrations WHERE challenge_id = $1 AND user_id = ANY($2)",
        )
        .bind(challenge_id)
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().filter(|id| !registered.contains(id)).collect())
    }

    pub async fn set_winners(&self, challenge_id: Uuid, winners: &[Winner]) -> Result<Challenge, DatabaseError> {
        let mut ordered = winners.to_vec();
        ordered.sort_by_key(|w| w.position);

        let challenge = sqlx::query_as::<_, Challenge>(
            "UPDATE challenges SET winners = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(challenge_id)
        .bind(Json(ordered))
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(%challenge_id, winners = challenge.winners.0.len(), "Set challenge winners");
        Ok(challenge)
    }
}

fn public_where(params: &ChallengeListParams, now: DateTime<Utc>) -> Value {
    let now = now.to_rfc3339();
    let mut conditions = vec![json!({ "is_public": true })];
    match params.status {
        Some(ChallengeStatus::Upcoming) => conditions.push(json!({ "start_date": { "$gt": now } })),
        Some(ChallengeStatus::Running) => conditions.push(json!({
            "start_date": { "$lte": now },
            "end_date": { "$gte": now },
        })),
        Some(ChallengeStatus::Completed) => conditions.push(json!({ "end_date": { "$lt": now } })),
        None => {}
    }
    if let Some(category) = params.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        // case-insensitive exact match
        conditions.push(json!({ "category": { "$ilike": escape_like(category) } }));
    }
    if let Some(difficulty) = params.difficulty {
        conditions.push(json!({ "difficulty": difficulty.as_str() }));
    }
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
    json!({ "$and": conditions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_where::FilterWhere;
    use crate::filter::SqlParam;

    #[test]
    fn running_means_started_and_not_ended() {
        let params = ChallengeListParams {
            status: Some(ChallengeStatus::Running),
            ..Default::default()
        };
        let now = Utc::now();
        let (sql, values) = FilterWhere::generate(&public_where(&params, now), 0).unwrap();
        assert_eq!(
            sql,
            "((\"is_public\" = $1) AND (\"end_date\" >= $2 AND \"start_date\" <= $3))"
        );
        assert_eq!(values[1], json!(now.to_rfc3339()));
    }

    #[test]
    fn upcoming_and_completed_bounds() {
        let now = Utc::now();
        let upcoming = ChallengeListParams {
            status: Some(ChallengeStatus::Upcoming),
            ..Default::default()
        };
        let (sql, _) = FilterWhere::generate(&public_where(&upcoming, now), 0).unwrap();
        assert!(sql.ends_with("(\"start_date\" > $2))"));

        let completed = ChallengeListParams {
            status: Some(ChallengeStatus::Completed),
            ..Default::default()
        };
        let (sql, _) = FilterWhere::generate(&public_where(&completed, now), 0).unwrap();
        assert!(sql.ends_with("(\"end_date\" < $2))"));
    }

    #[test]
    fn category_wildcards_match_literally() {
        let params = ChallengeListParams {
            category: Some(" web_% ".into()),
            ..Default::default()
        };
        let (sql, values) = FilterWhere::generate(&public_where(&params, Utc::now()), 0).unwrap();
        assert_eq!(sql, "((\"is_public\" = $1) AND (\"category\" ILIKE $2))");
        assert_eq!(values[1], SqlParam::Text("web\\_\\%".into()));
    }
}
