use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::{self, AuthUser},
    authz::{self, Action},
    error::ApiError,
    models::{
        Answer, CastVoteRequest, CreateAnswerRequest, CreateQuestionRequest, LoginRequest,
        Notification, PageQuery, QuestionResponse, RegisterRequest, Role, TokenResponse,
        UserResponse, VoteReceipt,
    },
};

const ALREADY_REGISTERED: &str = "username or email already registered";
const BAD_CREDENTIALS: &str = "invalid username or password";

// --- Auth handlers ---

/// register
///
/// [Public] Creates a new account with role `user`. A username or email
/// collision yields a single generic Conflict message, without revealing
/// which field collided.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody),
        (status = 409, description = "Already registered", body = crate::error::ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.validate()?;

    if state
        .repo
        .username_or_email_taken(&payload.username, &payload.email)
        .await?
    {
        return Err(ApiError::Conflict(ALREADY_REGISTERED.to_string()));
    }

    let password_hash = auth::hash_password(&payload.password)?;

    let user = state
        .repo
        .create_user(&payload.username, &payload.email, &password_hash, Role::User)
        .await
        .map_err(|e| match e {
            // Unique-index race between the pre-check and the insert.
            ApiError::Conflict(_) => ApiError::Conflict(ALREADY_REGISTERED.to_string()),
            other => other,
        })?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// login
///
/// [Public] Verifies credentials and issues a bearer JWT. Unknown usernames
/// and wrong passwords are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Bad credentials", body = crate::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate()?;

    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    let access_token = auth::issue_token(&user, &state.config)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

// --- Question handlers ---

/// create_question
///
/// [Authenticated] Posts a new question with its tag names. Guests are
/// denied by the authorization engine.
#[utoipa::path(
    post,
    path = "/questions",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Created", body = QuestionResponse),
        (status = 403, description = "Guests cannot post", body = crate::error::ErrorBody)
    )
)]
pub async fn create_question(
    AuthUser { id, role, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    authz::authorize(id, role, Action::PostQuestion)?;
    payload.validate()?;

    let question = state.repo.create_question(payload, id).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

/// get_questions
///
/// [Authenticated] Paginated question listing with tags attached. Limit
/// defaults to 100.
#[utoipa::path(
    get,
    path = "/questions",
    params(PageQuery),
    responses((status = 200, description = "Questions", body = [QuestionResponse]))
)]
pub async fn get_questions(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let questions = state.repo.get_questions(page.offset(), page.limit()).await?;
    Ok(Json(questions))
}

/// get_question
///
/// [Authenticated] Single question with tags.
#[utoipa::path(
    get,
    path = "/questions/{id}",
    params(("id" = Uuid, Path, description = "Question ID")),
    responses(
        (status = 200, description = "Found", body = QuestionResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let question = state
        .repo
        .get_question(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("question not found".to_string()))?;
    Ok(Json(question))
}

// --- Answer handlers ---

/// create_answer
///
/// [Authenticated] Posts an answer on a question. Guests are denied. The
/// question's existence is enforced by the store's foreign key, not checked
/// here.
#[utoipa::path(
    post,
    path = "/answers",
    request_body = CreateAnswerRequest,
    responses(
        (status = 201, description = "Created", body = Answer),
        (status = 403, description = "Guests cannot post", body = crate::error::ErrorBody),
        (status = 404, description = "Question does not exist", body = crate::error::ErrorBody)
    )
)]
pub async fn create_answer(
    AuthUser { id, role, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateAnswerRequest>,
) -> Result<(StatusCode, Json<Answer>), ApiError> {
    authz::authorize(id, role, Action::PostAnswer)?;
    payload.validate()?;

    let answer = state.repo.create_answer(payload, id).await?;
    Ok((StatusCode::CREATED, Json(answer)))
}

/// get_answers_by_question
///
/// [Authenticated] All answers for a question in creation order; an empty
/// list when there are none.
#[utoipa::path(
    get,
    path = "/answers/question/{question_id}",
    params(("question_id" = Uuid, Path, description = "Question ID")),
    responses((status = 200, description = "Answers", body = [Answer]))
)]
pub async fn get_answers_by_question(
    State(state): State<AppState>,
    Path(question_id): Path<Uuid>,
) -> Result<Json<Vec<Answer>>, ApiError> {
    let answers = state.repo.get_answers_by_question(question_id).await?;
    Ok(Json(answers))
}

/// accept_answer
///
/// [Authenticated] Marks an answer as accepted. Only the owner of the parent
/// question may accept; the answer and its question must both exist.
/// Previously accepted sibling answers are left untouched.
#[utoipa::path(
    patch,
    path = "/answers/{id}/accept",
    params(("id" = Uuid, Path, description = "Answer ID")),
    responses(
        (status = 200, description = "Accepted", body = Answer),
        (status = 403, description = "Not the question owner", body = crate::error::ErrorBody),
        (status = 404, description = "Answer or question not found", body = crate::error::ErrorBody)
    )
)]
pub async fn accept_answer(
    AuthUser { id: user_id, role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Answer>, ApiError> {
    let answer = state
        .repo
        .get_answer(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("answer not found".to_string()))?;

    let question_owner_id = state
        .repo
        .get_question_owner(answer.question_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("question not found".to_string()))?;

    authz::authorize(user_id, role, Action::AcceptAnswer { question_owner_id })?;

    let accepted = state.repo.set_answer_accepted(id, true).await?;
    Ok(Json(accepted))
}

/// cast_vote
///
/// [Authenticated] Casts a +1/-1 vote on an answer through the toggle/flip
/// state machine: a repeated identical vote removes the existing one, an
/// opposite vote flips it in place. The answer's existence is enforced by
/// the store's foreign key.
#[utoipa::path(
    post,
    path = "/answers/{id}/vote",
    params(("id" = Uuid, Path, description = "Answer ID")),
    request_body = CastVoteRequest,
    responses(
        (status = 200, description = "Vote processed", body = VoteReceipt),
        (status = 404, description = "Answer does not exist", body = crate::error::ErrorBody)
    )
)]
pub async fn cast_vote(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(answer_id): Path<Uuid>,
    Json(payload): Json<CastVoteRequest>,
) -> Result<Json<VoteReceipt>, ApiError> {
    let outcome = state
        .repo
        .cast_vote(user_id, answer_id, payload.value)
        .await?;
    Ok(Json(VoteReceipt { outcome }))
}

// --- User & notification handlers ---

/// get_me
///
/// [Authenticated] The caller's own account record.
#[utoipa::path(
    get,
    path = "/users/me",
    responses((status = 200, description = "Profile", body = UserResponse))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(user.into()))
}

/// get_user_by_username
///
/// [Authenticated] Public profile lookup by username.
#[utoipa::path(
    get,
    path = "/users/{username}",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Found", body = UserResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .repo
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;
    Ok(Json(user.into()))
}

/// get_my_notifications
///
/// [Authenticated] The caller's unread notifications, newest first.
#[utoipa::path(
    get,
    path = "/users/me/notifications",
    responses((status = 200, description = "Unread notifications", body = [Notification]))
)]
pub async fn get_my_notifications(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let notifications = state.repo.get_unread_notifications(id).await?;
    Ok(Json(notifications))
}

/// mark_notification_read
///
/// [Authenticated] Flips `is_read` on a notification. Denied unless the
/// caller is the notification's recipient.
#[utoipa::path(
    patch,
    path = "/users/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked read", body = Notification),
        (status = 403, description = "Not the recipient", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody)
    )
)]
pub async fn mark_notification_read(
    AuthUser { id: user_id, role, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state
        .repo
        .get_notification(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("notification not found".to_string()))?;

    authz::authorize(
        user_id,
        role,
        Action::MarkNotificationRead {
            recipient_id: notification.user_id,
        },
    )?;

    let updated = state.repo.mark_notification_read(id).await?;
    Ok(Json(updated))
}

/// get_all_users
///
/// [Admin] Paginated listing of every registered user.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(PageQuery),
    responses(
        (status = 200, description = "All users", body = [UserResponse]),
        (status = 403, description = "Admin access required", body = crate::error::ErrorBody)
    )
)]
pub async fn get_all_users(
    AuthUser { id, role, .. }: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    authz::authorize(id, role, Action::ListUsers)?;

    let users = state.repo.get_users(page.offset(), page.limit()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
