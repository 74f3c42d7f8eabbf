use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{
    Answer, CreateAnswerRequest, CreateQuestionRequest, Notification, Polarity, Question,
    QuestionResponse, Role, Tag, User, Vote,
};
use crate::vote::{self, VoteAction, VoteOutcome};

/// Repository
///
/// Abstract contract for all persistence operations. Handlers depend on this
/// trait only, so the Postgres implementation can be swapped for a mock in
/// tests. Every method propagates store failures; expected absence is
/// `Ok(None)` or an empty vec, never an error.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity store ---
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, ApiError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError>;
    /// True when the username or the email is already registered. The caller
    /// must not reveal which one collided.
    async fn username_or_email_taken(&self, username: &str, email: &str)
    -> Result<bool, ApiError>;
    async fn get_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, ApiError>;

    // --- Question lifecycle ---
    /// Inserts the question and resolves its tags (get-or-create by unique
    /// name, input order, duplicates collapsed) in a single transaction, then
    /// returns the question with its tag set attached.
    async fn create_question(
        &self,
        req: CreateQuestionRequest,
        owner_id: Uuid,
    ) -> Result<QuestionResponse, ApiError>;
    async fn get_questions(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<QuestionResponse>, ApiError>;
    async fn get_question(&self, id: Uuid) -> Result<Option<QuestionResponse>, ApiError>;
    async fn get_question_owner(&self, id: Uuid) -> Result<Option<Uuid>, ApiError>;

    // --- Answer lifecycle ---
    /// Inserts with `is_accepted = false`. Question existence is delegated to
    /// the foreign key; a violation surfaces as `NotFound`.
    async fn create_answer(
        &self,
        req: CreateAnswerRequest,
        owner_id: Uuid,
    ) -> Result<Answer, ApiError>;
    async fn get_answers_by_question(&self, question_id: Uuid) -> Result<Vec<Answer>, ApiError>;
    async fn get_answer(&self, id: Uuid) -> Result<Option<Answer>, ApiError>;
    /// Sets the accepted flag. Does not touch sibling answers of the same
    /// question; authorization happens in the caller.
    async fn set_answer_accepted(&self, id: Uuid, accepted: bool) -> Result<Answer, ApiError>;

    // --- Vote ledger ---
    /// Runs the toggle/flip state machine atomically for the (user, answer)
    /// pair. Answer existence is delegated to the foreign key.
    async fn cast_vote(
        &self,
        user_id: Uuid,
        answer_id: Uuid,
        polarity: Polarity,
    ) -> Result<VoteOutcome, ApiError>;
    async fn get_vote(&self, user_id: Uuid, answer_id: Uuid) -> Result<Option<Vote>, ApiError>;

    // --- Notification store ---
    /// Creation primitive. No HTTP producer is wired to it in the current
    /// scope; side-effect producers plug in here.
    async fn create_notification(
        &self,
        user_id: Uuid,
        message: &str,
    ) -> Result<Notification, ApiError>;
    async fn get_unread_notifications(&self, user_id: Uuid)
    -> Result<Vec<Notification>, ApiError>;
    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>, ApiError>;
    async fn mark_notification_read(&self, id: Uuid) -> Result<Notification, ApiError>;
}

/// RepositoryState
///
/// The concrete type shared through the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by Postgres via sqlx.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the tag sets for a page of questions with one query and attaches
    /// them in order.
    async fn attach_tags(
        &self,
        questions: Vec<Question>,
    ) -> Result<Vec<QuestionResponse>, ApiError> {
        #[derive(FromRow)]
        struct TaggedRow {
            question_id: Uuid,
            id: Uuid,
            name: String,
        }

        let ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        let rows = sqlx::query_as::<_, TaggedRow>(
            r#"
            SELECT qt.question_id, t.id, t.name
            FROM question_tags qt
            JOIN tags t ON t.id = qt.tag_id
            WHERE qt.question_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in rows {
            by_question.entry(row.question_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
            });
        }

        Ok(questions
            .into_iter()
            .map(|q| {
                let tags = by_question.remove(&q.id).unwrap_or_default();
                QuestionResponse::new(q, tags)
            })
            .collect())
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, created_at, updated_at";
const QUESTION_COLUMNS: &str = "id, title, description, owner_id, created_at, updated_at";
const ANSWER_COLUMNS: &str =
    "id, content, question_id, owner_id, is_accepted, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, message, is_read, created_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password_hash, role, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, TRUE, NOW(), NOW()) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, ApiError> {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 OR email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn get_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, ApiError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create_question(
        &self,
        req: CreateQuestionRequest,
        owner_id: Uuid,
    ) -> Result<QuestionResponse, ApiError> {
        // One transaction for the question plus its tag rows, so a failed tag
        // insert cannot leave an orphan question with a partial tag set.
        let mut tx = self.pool.begin().await?;

        let question = sqlx::query_as::<_, Question>(&format!(
            "INSERT INTO questions (id, title, description, owner_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW()) \
             RETURNING {QUESTION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&req.title)
        .bind(&req.description)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        // Tag names resolve in input order; duplicates collapse to the first
        // occurrence so the join table never sees the same pair twice.
        let mut seen: HashSet<&str> = HashSet::new();
        let mut tags = Vec::new();
        for name in &req.tags {
            if !seen.insert(name.as_str()) {
                continue;
            }

            // The DO UPDATE no-op makes the upsert return the existing row on
            // a name collision, where DO NOTHING would return nothing.
            let tag = sqlx::query_as::<_, Tag>(
                "INSERT INTO tags (id, name) VALUES ($1, $2) \
                 ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name \
                 RETURNING id, name",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO question_tags (question_id, tag_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(question.id)
            .bind(tag.id)
            .execute(&mut *tx)
            .await?;

            tags.push(tag);
        }

        tx.commit().await?;

        Ok(QuestionResponse::new(question, tags))
    }

    async fn get_questions(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<QuestionResponse>, ApiError> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY created_at ASC OFFSET $1 LIMIT $2"
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_tags(questions).await
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<QuestionResponse>, ApiError> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match question {
            Some(q) => Ok(self.attach_tags(vec![q]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn get_question_owner(&self, id: Uuid) -> Result<Option<Uuid>, ApiError> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT owner_id FROM questions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    async fn create_answer(
        &self,
        req: CreateAnswerRequest,
        owner_id: Uuid,
    ) -> Result<Answer, ApiError> {
        let answer = sqlx::query_as::<_, Answer>(&format!(
            "INSERT INTO answers (id, content, question_id, owner_id, is_accepted, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, FALSE, NOW(), NOW()) \
             RETURNING {ANSWER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&req.content)
        .bind(req.question_id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn get_answers_by_question(&self, question_id: Uuid) -> Result<Vec<Answer>, ApiError> {
        let answers = sqlx::query_as::<_, Answer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE question_id = $1 ORDER BY created_at ASC"
        ))
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn get_answer(&self, id: Uuid) -> Result<Option<Answer>, ApiError> {
        let answer = sqlx::query_as::<_, Answer>(&format!(
            "SELECT {ANSWER_COLUMNS} FROM answers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(answer)
    }

    async fn set_answer_accepted(&self, id: Uuid, accepted: bool) -> Result<Answer, ApiError> {
        let answer = sqlx::query_as::<_, Answer>(&format!(
            "UPDATE answers SET is_accepted = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {ANSWER_COLUMNS}"
        ))
        .bind(id)
        .bind(accepted)
        .fetch_optional(&self.pool)
        .await?;

        answer.ok_or_else(|| ApiError::NotFound("answer not found".to_string()))
    }

    async fn cast_vote(
        &self,
        user_id: Uuid,
        answer_id: Uuid,
        polarity: Polarity,
    ) -> Result<VoteOutcome, ApiError> {
        // The read-then-write sequence is the one critical section in the
        // system. The row lock serializes concurrent casts against an
        // existing vote; the conflict-aware upsert closes the remaining race
        // between two first-time casts, which the lock cannot see.
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, i16>(
            "SELECT polarity FROM votes WHERE user_id = $1 AND answer_id = $2 FOR UPDATE",
        )
        .bind(user_id)
        .bind(answer_id)
        .fetch_optional(&mut *tx)
        .await?
        .map(Polarity::try_from)
        .transpose()
        .map_err(|e| ApiError::Internal(e.to_string()))?;

        let action = vote::transition(existing, polarity);
        match action {
            VoteAction::Insert => {
                sqlx::query(
                    "INSERT INTO votes (user_id, answer_id, polarity) VALUES ($1, $2, $3) \
                     ON CONFLICT (user_id, answer_id) DO UPDATE SET polarity = EXCLUDED.polarity",
                )
                .bind(user_id)
                .bind(answer_id)
                .bind(i16::from(polarity))
                .execute(&mut *tx)
                .await?;
            }
            VoteAction::Remove => {
                sqlx::query("DELETE FROM votes WHERE user_id = $1 AND answer_id = $2")
                    .bind(user_id)
                    .bind(answer_id)
                    .execute(&mut *tx)
                    .await?;
            }
            VoteAction::Flip => {
                sqlx::query(
                    "UPDATE votes SET polarity = $3 WHERE user_id = $1 AND answer_id = $2",
                )
                .bind(user_id)
                .bind(answer_id)
                .bind(i16::from(polarity))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        Ok(action.outcome())
    }

    async fn get_vote(&self, user_id: Uuid, answer_id: Uuid) -> Result<Option<Vote>, ApiError> {
        let vote = sqlx::query_as::<_, Vote>(
            "SELECT user_id, answer_id, polarity FROM votes WHERE user_id = $1 AND answer_id = $2",
        )
        .bind(user_id)
        .bind(answer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vote)
    }

    async fn create_notification(
        &self,
        user_id: Uuid,
        message: &str,
    ) -> Result<Notification, ApiError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (id, user_id, message, is_read, created_at) \
             VALUES ($1, $2, $3, FALSE, NOW()) \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await?;
        Ok(notification)
    }

    async fn get_unread_notifications(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Notification>, ApiError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE user_id = $1 AND is_read = FALSE ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn get_notification(&self, id: Uuid) -> Result<Option<Notification>, ApiError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(notification)
    }

    async fn mark_notification_read(&self, id: Uuid) -> Result<Notification, ApiError> {
        let notification = sqlx::query_as::<_, Notification>(&format!(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        notification.ok_or_else(|| ApiError::NotFound("notification not found".to_string()))
    }
}
