use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated router
///
/// Every route here sits behind the `AuthUser` extractor middleware, so
/// handlers always receive a validated identity. Role and ownership checks
/// (guest denial, question-owner acceptance, notification ownership) are
/// made by the authorization engine inside each handler.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Questions ---
        // POST /questions
        // Ask a question with tag names; guests are denied.
        // GET /questions?offset=&limit=
        // Paginated listing with tags attached; limit defaults to 100.
        .route(
            "/questions",
            post(handlers::create_question).get(handlers::get_questions),
        )
        // GET /questions/{id}
        .route("/questions/{id}", get(handlers::get_question))
        // --- Answers & voting ---
        // POST /answers
        // Answer a question; guests are denied. Question existence is the
        // store's foreign key's responsibility.
        .route("/answers", post(handlers::create_answer))
        // GET /answers/question/{question_id}
        .route(
            "/answers/question/{question_id}",
            get(handlers::get_answers_by_question),
        )
        // PATCH /answers/{id}/accept
        // Question-owner-only acceptance.
        .route("/answers/{id}/accept", patch(handlers::accept_answer))
        // POST /answers/{id}/vote
        // The toggle/flip vote state machine.
        .route("/answers/{id}/vote", post(handlers::cast_vote))
        // --- Users & notifications ---
        // GET /users/me
        .route("/users/me", get(handlers::get_me))
        // GET /users/me/notifications
        // The caller's unread notifications.
        .route(
            "/users/me/notifications",
            get(handlers::get_my_notifications),
        )
        // PATCH /users/notifications/{id}/read
        // Recipient-only read receipt.
        .route(
            "/users/notifications/{id}/read",
            patch(handlers::mark_notification_read),
        )
        // GET /users/{username}
        // The literal /users/me segment wins over this path parameter.
        .route("/users/{username}", get(handlers::get_user_by_username))
}
