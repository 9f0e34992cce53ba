/// Quiz service: tables, questions and answer submission
use crate::{
    error::{QuizError, QuizResult},
    session::SessionManager,
    store::{AnswerOption, Question, QuizStore, QuizTable, User, UserId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Answer submission request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: Option<i64>,
    pub answer: Option<String>,
    /// Seconds the user spent on the question
    #[serde(default)]
    pub time_spent: u64,
}

/// Acknowledged submission; nothing is recorded against the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub answer: AnswerOption,
    pub is_correct: bool,
    pub time_spent: u64,
    pub submitted_at: DateTime<Utc>,
}

/// Players at or below this rating are left off the leaderboard
const LEADERBOARD_MIN_RATING: i32 = 1000;
const LEADERBOARD_SIZE: usize = 50;

/// Leaderboard ordering window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardPeriod {
    All,
    Week,
    Month,
}

impl LeaderboardPeriod {
    /// Unknown or missing values fall back to `All`
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("week") => Self::Week,
            Some("month") => Self::Month,
            _ => Self::All,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub avatar: String,
    pub rating: i32,
    pub wins: u32,
    pub losses: u32,
    /// Percentage, one decimal place
    pub win_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    pub period: LeaderboardPeriod,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub current_user_rank: Option<usize>,
    pub total_players: usize,
}

fn win_rate(wins: u32, losses: u32) -> f64 {
    let played = (wins + losses).max(1) as f64;
    (wins as f64 / played * 1000.0).round() / 10.0
}

/// Quiz service
pub struct QuizService {
    store: Arc<dyn QuizStore>,
    sessions: Arc<SessionManager>,
}

impl QuizService {
    pub fn new(store: Arc<dyn QuizStore>, sessions: Arc<SessionManager>) -> Self {
        Self { store, sessions }
    }

    pub async fn list_tables(&self) -> QuizResult<Vec<QuizTable>> {
        self.store.list_quiz_tables().await
    }

    /// Questions of an existing table; an unknown table is an error, not an empty list
    pub async fn list_questions(&self, table: &str) -> QuizResult<Vec<Question>> {
        if self.store.get_table_by_name(table).await?.is_none() {
            return Err(QuizError::NotFound("Table not found".to_string()));
        }

        let questions = self.store.list_questions_by_table(table).await?;
        debug!(table, count = questions.len(), "listed questions");
        Ok(questions)
    }

    /// Battle ranking of active players
    ///
    /// `All` orders by rating; `Week` and `Month` order by wins. There is no
    /// per-battle history, so the two windows rank identically.
    pub async fn leaderboard(
        &self,
        user_id: UserId,
        period: LeaderboardPeriod,
    ) -> QuizResult<Leaderboard> {
        let mut players: Vec<User> = self
            .store
            .list_users()
            .await?
            .into_iter()
            .filter(|u| u.is_active && u.battle_stats.rating > LEADERBOARD_MIN_RATING)
            .collect();

        match period {
            LeaderboardPeriod::All => {
                players.sort_by(|a, b| {
                    b.battle_stats
                        .rating
                        .cmp(&a.battle_stats.rating)
                        .then(a.id.cmp(&b.id))
                })
            }
            LeaderboardPeriod::Week | LeaderboardPeriod::Month => {
                players.sort_by(|a, b| {
                    b.battle_stats
                        .wins
                        .cmp(&a.battle_stats.wins)
                        .then(a.id.cmp(&b.id))
                })
            }
        }
        players.truncate(LEADERBOARD_SIZE);

        let current_user_rank = players.iter().position(|u| u.id == user_id).map(|i| i + 1);
        let leaderboard: Vec<LeaderboardEntry> = players
            .iter()
            .enumerate()
            .map(|(i, u)| LeaderboardEntry {
                rank: i + 1,
                username: u.username.clone(),
                avatar: u.avatar.clone(),
                rating: u.battle_stats.rating,
                wins: u.battle_stats.wins,
                losses: u.battle_stats.losses,
                win_rate: win_rate(u.battle_stats.wins, u.battle_stats.losses),
            })
            .collect();

        Ok(Leaderboard {
            period,
            total_players: leaderboard.len(),
            leaderboard,
            current_user_rank,
        })
    }

    /// Grade an answer for an authenticated user
    pub async fn submit_answer(
        &self,
        token: &str,
        request: SubmitAnswerRequest,
    ) -> QuizResult<SubmittedAnswer> {
        let session = self.sessions.validate(token).await?;

        let (question_id, answer) = match (request.question_id, request.answer.as_deref()) {
            (Some(id), Some(answer)) => (id, answer),
            _ => {
                return Err(QuizError::Validation(
                    "question_id and answer are required".to_string(),
                ))
            }
        };
        let answer = AnswerOption::parse(answer)?;

        let question = self
            .store
            .find_question_by_id(question_id)
            .await?
            .ok_or_else(|| QuizError::NotFound("Question not found".to_string()))?;

        let is_correct = question.correct_answer == answer;
        debug!(user_id = session.user_id, question_id, is_correct, "answer submitted");

        Ok(SubmittedAnswer {
            question_id,
            answer,
            is_correct,
            time_spent: request.time_spent,
            submitted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PasswordHasher;
    use crate::store::{memory::MemoryStore, SeedData};
    use chrono::Duration;

    fn service() -> (QuizService, Arc<SessionManager>) {
        let seed = SeedData::new(&PasswordHasher::new("s", 10), "a", "b");
        let store: Arc<dyn QuizStore> = Arc::new(MemoryStore::new(seed, Duration::hours(1)));
        let sessions = Arc::new(SessionManager::new(store.clone()));
        (QuizService::new(store, sessions.clone()), sessions)
    }

    fn submission(question_id: i64, answer: &str) -> SubmitAnswerRequest {
        SubmitAnswerRequest {
            question_id: Some(question_id),
            answer: Some(answer.to_string()),
            time_spent: 12,
        }
    }

    #[tokio::test]
    async fn test_unknown_table_is_not_found() {
        let (quiz, _) = service();
        assert!(matches!(
            quiz.list_questions("does_not_exist").await,
            Err(QuizError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_counts_match_questions() {
        let (quiz, _) = service();
        let tables = quiz.list_tables().await.unwrap();
        assert_eq!(tables.len(), 2);
        for table in tables {
            let questions = quiz.list_questions(&table.name).await.unwrap();
            assert_eq!(questions.len() as u32, table.question_count);
        }
    }

    #[tokio::test]
    async fn test_submit_grades_answer() {
        let (quiz, sessions) = service();
        let session = sessions.create(2).await.unwrap();

        let correct = quiz.submit_answer(&session.token, submission(4, "b")).await.unwrap();
        assert!(correct.is_correct);
        assert_eq!(correct.answer, AnswerOption::B);
        assert_eq!(correct.time_spent, 12);

        let wrong = quiz.submit_answer(&session.token, submission(4, "A")).await.unwrap();
        assert!(!wrong.is_correct);
    }

    #[tokio::test]
    async fn test_submit_requires_session() {
        let (quiz, _) = service();
        assert!(matches!(
            quiz.submit_answer("bogus", submission(1, "A")).await,
            Err(QuizError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_input() {
        let (quiz, sessions) = service();
        let token = sessions.create(2).await.unwrap().token;

        assert!(matches!(
            quiz.submit_answer(&token, submission(1, "D")).await,
            Err(QuizError::Validation(_))
        ));
        assert!(matches!(
            quiz.submit_answer(&token, submission(999, "A")).await,
            Err(QuizError::NotFound(_))
        ));
        let missing = SubmitAnswerRequest {
            question_id: None,
            answer: Some("A".into()),
            time_spent: 0,
        };
        assert!(matches!(
            quiz.submit_answer(&token, missing).await,
            Err(QuizError::Validation(_))
        ));
    }

    #[test]
    fn test_period_parse_and_win_rate() {
        assert_eq!(LeaderboardPeriod::parse(Some("WEEK")), LeaderboardPeriod::Week);
        assert_eq!(LeaderboardPeriod::parse(Some("month")), LeaderboardPeriod::Month);
        assert_eq!(LeaderboardPeriod::parse(Some("decade")), LeaderboardPeriod::All);
        assert_eq!(LeaderboardPeriod::parse(None), LeaderboardPeriod::All);

        assert_eq!(win_rate(0, 0), 0.0);
        assert_eq!(win_rate(2, 1), 66.7);
        assert_eq!(win_rate(3, 0), 100.0);
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_rating() {
        let (quiz, _) = service();

        let board = quiz.leaderboard(2, LeaderboardPeriod::All).await.unwrap();
        let names: Vec<&str> = board.leaderboard.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["admin", "student"]);
        assert_eq!(board.leaderboard[0].rank, 1);
        assert_eq!(board.current_user_rank, Some(2));
        assert_eq!(board.total_players, 2);

        let outsider = quiz.leaderboard(99, LeaderboardPeriod::Week).await.unwrap();
        assert_eq!(outsider.current_user_rank, None);
    }
}
