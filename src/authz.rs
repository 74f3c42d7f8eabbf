use uuid::Uuid;

use crate::error::ApiError;
use crate::models::Role;

/// Action
///
/// A gated operation together with the ownership facts needed to decide it.
/// Callers fetch the facts (parent question owner, notification recipient)
/// and surface `NotFound` for absent entities *before* consulting the engine,
/// so a denial here is always an access-control failure, never an existence
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PostQuestion,
    PostAnswer,
    AcceptAnswer { question_owner_id: Uuid },
    MarkNotificationRead { recipient_id: Uuid },
    ListUsers,
}

/// Decides whether the actor may perform the action. Pure: no I/O, no side
/// effects. Each rule is an independent predicate; any failure denies with
/// `Forbidden`.
pub fn authorize(actor_id: Uuid, actor_role: Role, action: Action) -> Result<(), ApiError> {
    match action {
        Action::PostQuestion => {
            if actor_role == Role::Guest {
                return Err(ApiError::Forbidden(
                    "guest users cannot ask questions".to_string(),
                ));
            }
        }
        Action::PostAnswer => {
            if actor_role == Role::Guest {
                return Err(ApiError::Forbidden(
                    "guest users cannot post answers".to_string(),
                ));
            }
        }
        Action::AcceptAnswer { question_owner_id } => {
            // Ownership only; role is irrelevant here, admins included.
            if actor_id != question_owner_id {
                return Err(ApiError::Forbidden(
                    "only the question owner can accept an answer".to_string(),
                ));
            }
        }
        Action::MarkNotificationRead { recipient_id } => {
            if actor_id != recipient_id {
                return Err(ApiError::Forbidden(
                    "not authorized to mark this notification as read".to_string(),
                ));
            }
        }
        Action::ListUsers => {
            if actor_role != Role::Admin {
                return Err(ApiError::Forbidden("admin access required".to_string()));
            }
        }
    }
    Ok(())
}
