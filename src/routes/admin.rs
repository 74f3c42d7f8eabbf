use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin router
///
/// Nested under `/admin`. Requests pass the authentication layer first; the
/// `admin` role requirement is enforced by the authorization engine inside
/// each handler.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users?offset=&limit=
        // Paginated listing of every registered account.
        .route("/users", get(handlers::get_all_users))
}
