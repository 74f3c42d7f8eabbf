use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::vote::VoteOutcome;

// --- Closed column types ---

/// Role
///
/// Role-based access control variants, stored as lowercase text in the
/// `users.role` column. A closed enumeration so that an invalid role is
/// unrepresentable past the store boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Guest,
    #[default]
    User,
    Admin,
}

#[derive(Debug, Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "guest" => Ok(Role::Guest),
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(value)),
        }
    }
}

/// Polarity
///
/// The +1/-1 direction of a vote. On the wire and in the `votes.polarity`
/// column this is the bare integer; anything other than 1 or -1 is rejected
/// at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum Polarity {
    Up,
    Down,
}

#[derive(Debug, Error)]
#[error("invalid vote polarity {0}, expected 1 or -1")]
pub struct InvalidPolarity(pub i16);

impl From<Polarity> for i16 {
    fn from(p: Polarity) -> i16 {
        match p {
            Polarity::Up => 1,
            Polarity::Down => -1,
        }
    }
}

impl TryFrom<i16> for Polarity {
    type Error = InvalidPolarity;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Polarity::Up),
            -1 => Ok(Polarity::Down),
            other => Err(InvalidPolarity(other)),
        }
    }
}

// --- Core application schemas (mapped to database) ---

/// User
///
/// Canonical identity record from the `users` table. Internal only: it
/// carries the password hash and is never serialized; API output goes through
/// `UserResponse`.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Question
///
/// A question row without its tag set. The API shape with tags attached is
/// `QuestionResponse`.
#[derive(Debug, Clone, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Answer
///
/// An answer row. Serialized directly as the API response shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[ts(export)]
pub struct Answer {
    pub id: Uuid,
    pub content: String,
    pub question_id: Uuid,
    pub owner_id: Uuid,
    pub is_accepted: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Tag
///
/// A topic label, unique by name, get-or-created at question creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[ts(export)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// Vote
///
/// A single row of the vote ledger, jointly keyed by (user_id, answer_id).
/// The engine guarantees at most one row per pair.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Vote {
    pub user_id: Uuid,
    pub answer_id: Uuid,
    #[sqlx(try_from = "i16")]
    pub polarity: Polarity,
}

/// Notification
///
/// A per-user message with a read flag. Only the owning user may flip
/// `is_read`; notifications are never deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub is_read: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

// --- Request payloads (input schemas) ---

/// RegisterRequest
///
/// Input for POST /auth/register. Validated structurally before reaching the
/// store; the password is hashed and never persisted or logged in clear.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.trim().is_empty() {
            return Err(ApiError::Validation("username is required".to_string()));
        }
        validate_email(&self.email)?;
        if self.password.len() < 6 {
            return Err(ApiError::Validation(
                "password must be at least 6 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// LoginRequest
///
/// Input for POST /auth/token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ApiError::Validation(
                "username and password are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// CreateQuestionRequest
///
/// Input for POST /questions. Tag names are resolved in input order;
/// duplicates are collapsed to the first occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct CreateQuestionRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateQuestionRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::Validation("title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(ApiError::Validation("description is required".to_string()));
        }
        Ok(())
    }
}

/// CreateAnswerRequest
///
/// Input for POST /answers. The referenced question is not checked for
/// existence here; the store's foreign key is the trust boundary and a
/// violation surfaces as NotFound.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct CreateAnswerRequest {
    pub content: String,
    pub question_id: Uuid,
}

impl CreateAnswerRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.content.trim().is_empty() {
            return Err(ApiError::Validation("content is required".to_string()));
        }
        Ok(())
    }
}

/// CastVoteRequest
///
/// Input for POST /answers/{id}/vote. `value` is 1 or -1; enum membership is
/// enforced by `Polarity`'s deserializer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct CastVoteRequest {
    #[schema(value_type = i16)]
    #[ts(type = "number")]
    pub value: Polarity,
}

/// PageQuery
///
/// Offset/limit pagination parameters shared by the listing endpoints.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// Limit defaults to 100 when absent or zero.
    pub fn limit(&self) -> i64 {
        match self.limit {
            None | Some(0) => 100,
            Some(n) => n.max(0),
        }
    }
}

// --- Response schemas (output) ---

/// UserResponse
///
/// Public projection of a `User`, without the password hash.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

/// TokenResponse
///
/// Output of POST /auth/token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// QuestionResponse
///
/// A question with its tag set eagerly attached.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
    pub tags: Vec<Tag>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl QuestionResponse {
    pub fn new(question: Question, tags: Vec<Tag>) -> Self {
        QuestionResponse {
            id: question.id,
            title: question.title,
            description: question.description,
            owner_id: question.owner_id,
            tags,
            created_at: question.created_at,
            updated_at: question.updated_at,
        }
    }
}

/// VoteReceipt
///
/// Output of POST /answers/{id}/vote: which branch of the vote state machine
/// was taken.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct VoteReceipt {
    pub outcome: VoteOutcome,
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    let invalid = || ApiError::Validation("email is not a valid address".to_string());
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.contains('@') {
        return Err(invalid());
    }
    Ok(())
}
