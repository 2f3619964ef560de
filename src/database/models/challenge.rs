use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "TEXT", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeDifficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl ChallengeDifficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeDifficulty::Beginner => "beginner",
            ChallengeDifficulty::Intermediate => "intermediate",
            ChallengeDifficulty::Advanced => "advanced",
        }
    }
}

/// Derived from the current time and the challenge window; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeStatus {
    Upcoming,
    Running,
    Completed,
}

impl ChallengeStatus {
    pub fn at(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if now < start {
            ChallengeStatus::Upcoming
        } else if now <= end {
            ChallengeStatus::Running
        } else {
            ChallengeStatus::Completed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub user_id: Uuid,
    pub position: i32,
    pub project_id: Option<Uuid>,
}

/// A row from the `challenges` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Challenge {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub difficulty: ChallengeDifficulty,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub prizes: Vec<String>,
    pub requirements: Vec<String>,
    pub tags: Vec<String>,
    pub max_participants: Option<i32>,
    pub winners: Json<Vec<Winner>>,
    pub is_public: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `challenge_summaries` view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChallengeSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub challenge: Challenge,
    pub participant_count: i64,
    #[sqlx(skip)]
    pub status: Option<ChallengeStatus>,
}

impl ChallengeSummary {
    pub fn with_status(mut self, now: DateTime<Utc>) -> Self {
        self.status = Some(ChallengeStatus::at(self.challenge.start_date, self.challenge.end_date, now));
        self
    }

    pub fn is_full(&self) -> bool {
        matches!(self.challenge.max_participants, Some(max) if self.participant_count >= i64::from(max))
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Participant {
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub project_id: Option<Uuid>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChallenge {
    #[validate(length(min = 1, max = 200, message = "Title is required (max 200 characters)"))]
    pub title: String,
    #[validate(length(min = 1, max = 5000, message = "Description is required (max 5000 characters)"))]
    pub description: String,
    #[validate(length(min = 1, max = 50, message = "Category is required"))]
    pub category: String,
    pub difficulty: Option<ChallengeDifficulty>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub prizes: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(range(min = 1, message = "Max participants must be at least 1"))]
    pub max_participants: Option<i32>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateChallenge {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: Option<String>,
    pub difficulty: Option<ChallengeDifficulty>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub prizes: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    #[validate(range(min = 1, message = "Max participants must be at least 1"))]
    pub max_participants: Option<i32>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RegisterForChallenge {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetWinners {
    #[validate(length(min = 1, message = "At least one winner is required"))]
    pub winners: Vec<Winner>,
}

impl SetWinners {
    /// Positions must start at 1 and not repeat; users may only place once.
    pub fn check_positions(&self) -> Result<(), String> {
        let mut positions = std::collections::HashSet::new();
        let mut users = std::collections::HashSet::new();
        for winner in &self.winners {
            if winner.position < 1 {
                return Err("Winner positions must be 1 or greater".to_string());
            }
            if !positions.insert(winner.position) {
                return Err(format!("Position {} is assigned more than once", winner.position));
            }
            if !users.insert(winner.user_id) {
                return Err("A participant can only hold one position".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ChallengeListParams {
    pub status: Option<ChallengeStatus>,
    pub category: Option<String>,
    pub difficulty: Option<ChallengeDifficulty>,
    pub search: Option<String>,
    pub tags: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_follows_the_window() {
        let now = Utc::now();
        let start = now - Duration::days(1);
        let end = now + Duration::days(1);
        assert_eq!(ChallengeStatus::at(start, end, now), ChallengeStatus::Running);
        assert_eq!(ChallengeStatus::at(start, end, start - Duration::seconds(1)), ChallengeStatus::Upcoming);
        assert_eq!(ChallengeStatus::at(start, end, start), ChallengeStatus::Running);
        assert_eq!(ChallengeStatus::at(start, end, end), ChallengeStatus::Running);
        assert_eq!(ChallengeStatus::at(start, end, end + Duration::seconds(1)), ChallengeStatus::Completed);
    }

    #[test]
    fn winner_positions() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ok = SetWinners {
            winners: vec![
                Winner { user_id: a, position: 1, project_id: None },
                Winner { user_id: b, position: 2, project_id: None },
            ],
        };
        assert!(ok.check_positions().is_ok());

        let repeated = SetWinners {
            winners: vec![
                Winner { user_id: a, position: 1, project_id: None },
                Winner { user_id: b, position: 1, project_id: None },
            ],
        };
        assert!(repeated.check_positions().is_err());

        let zero = SetWinners {
            winners: vec![Winner { user_id: a, position: 0, project_id: None }],
        };
        assert!(zero.check_positions().is_err());
    }
}
