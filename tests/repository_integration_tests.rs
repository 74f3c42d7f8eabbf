//! Postgres-backed repository tests.
//!
//! These run against the database named by `DATABASE_URL` (a `.env` file is
//! honored) and are skipped with a note when it is not set. Rows are created
//! with per-run unique names so repeated runs do not collide.

use askforge::{
    models::{CreateAnswerRequest, CreateQuestionRequest, Polarity, Role, User},
    repository::{PostgresRepository, Repository},
    vote::VoteOutcome,
};
use serial_test::serial;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::test;
use uuid::Uuid;

struct DbTestContext {
    repo: PostgresRepository,
    pool: PgPool,
}

impl DbTestContext {
    /// Connects and migrates, or returns None when no database is configured.
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();
        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("skipping database test: DATABASE_URL is not set");
            return None;
        };

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&db_url)
            .await
            .expect("failed to connect to the test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("failed to run migrations on the test database");

        Some(DbTestContext {
            repo: PostgresRepository::new(pool.clone()),
            pool,
        })
    }

    async fn create_user(&self, prefix: &str) -> User {
        let tag = Uuid::new_v4().simple().to_string();
        self.repo
            .create_user(
                &format!("{prefix}_{tag}"),
                &format!("{prefix}_{tag}@example.com"),
                "$argon2id$fake$hash",
                Role::User,
            )
            .await
            .expect("failed to create test user")
    }

    async fn create_question(&self, owner: &User, tags: Vec<&str>) -> Uuid {
        let req = CreateQuestionRequest {
            title: format!("question by {}", owner.username),
            description: "a test question".to_string(),
            tags: tags.into_iter().map(str::to_string).collect(),
        };
        self.repo
            .create_question(req, owner.id)
            .await
            .expect("failed to create test question")
            .id
    }

    async fn create_answer(&self, owner: &User, question_id: Uuid) -> Uuid {
        let req = CreateAnswerRequest {
            content: format!("answer by {}", owner.username),
            question_id,
        };
        self.repo
            .create_answer(req, owner.id)
            .await
            .expect("failed to create test answer")
            .id
    }

    async fn count_votes(&self, user_id: Uuid, answer_id: Uuid) -> i64 {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM votes WHERE user_id = $1 AND answer_id = $2",
        )
        .bind(user_id)
        .bind(answer_id)
        .fetch_one(&self.pool)
        .await
        .expect("failed to count votes")
    }
}

// --- Identity ---

#[test]
#[serial]
async fn user_creation_and_lookup() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let user = ctx.create_user("lookup").await;

    let by_id = ctx.repo.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, user.username);
    assert_eq!(by_id.role, Role::User);
    assert!(by_id.is_active);

    let by_name = ctx
        .repo
        .get_user_by_username(&user.username)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_name.id, user.id);

    assert!(ctx.repo.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[test]
#[serial]
async fn duplicate_username_or_email_is_a_conflict() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let user = ctx.create_user("dup").await;

    assert!(ctx
        .repo
        .username_or_email_taken(&user.username, "fresh@example.com")
        .await
        .unwrap());
    assert!(ctx
        .repo
        .username_or_email_taken("fresh_username", &user.email)
        .await
        .unwrap());
    assert!(!ctx
        .repo
        .username_or_email_taken("fresh_username", "fresh@example.com")
        .await
        .unwrap());

    // The unique index itself also rejects the insert.
    let result = ctx
        .repo
        .create_user(&user.username, "other@example.com", "hash", Role::User)
        .await;
    assert!(matches!(
        result,
        Err(askforge::error::ApiError::Conflict(_))
    ));
}

// --- Questions & tags ---

#[test]
#[serial]
async fn duplicate_tag_names_collapse_to_one_row() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let owner = ctx.create_user("tags").await;
    let go_tag = format!("go_{}", Uuid::new_v4().simple());
    let rust_tag = format!("rust_{}", Uuid::new_v4().simple());

    let question = ctx
        .repo
        .create_question(
            CreateQuestionRequest {
                title: "tagged".to_string(),
                description: "d".to_string(),
                tags: vec![go_tag.clone(), go_tag.clone(), rust_tag.clone()],
            },
            owner.id,
        )
        .await
        .unwrap();

    // First occurrence wins; input order preserved.
    let names: Vec<&str> = question.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec![go_tag.as_str(), rust_tag.as_str()]);

    let join_rows = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM question_tags WHERE question_id = $1",
    )
    .bind(question.id)
    .fetch_one(&ctx.pool)
    .await
    .unwrap();
    assert_eq!(join_rows, 2);
}

#[test]
#[serial]
async fn tags_are_shared_between_questions() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let owner = ctx.create_user("shared_tags").await;
    let shared = format!("shared_{}", Uuid::new_v4().simple());

    let first = ctx
        .repo
        .create_question(
            CreateQuestionRequest {
                title: "first".to_string(),
                description: "d".to_string(),
                tags: vec![shared.clone()],
            },
            owner.id,
        )
        .await
        .unwrap();
    let second = ctx
        .repo
        .create_question(
            CreateQuestionRequest {
                title: "second".to_string(),
                description: "d".to_string(),
                tags: vec![shared.clone()],
            },
            owner.id,
        )
        .await
        .unwrap();

    assert_eq!(first.tags[0].id, second.tags[0].id);
}

#[test]
#[serial]
async fn question_listing_honors_pagination() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let owner = ctx.create_user("paging").await;
    for _ in 0..3 {
        ctx.create_question(&owner, vec![]).await;
    }

    let page = ctx.repo.get_questions(0, 2).await.unwrap();
    assert_eq!(page.len(), 2);
}

#[test]
#[serial]
async fn question_owner_lookup() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let owner = ctx.create_user("owner").await;
    let question_id = ctx.create_question(&owner, vec![]).await;

    assert_eq!(
        ctx.repo.get_question_owner(question_id).await.unwrap(),
        Some(owner.id)
    );
    assert_eq!(
        ctx.repo.get_question_owner(Uuid::new_v4()).await.unwrap(),
        None
    );
}

// --- Answers ---

#[test]
#[serial]
async fn answer_on_missing_question_is_not_found() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let owner = ctx.create_user("orphan").await;
    let result = ctx
        .repo
        .create_answer(
            CreateAnswerRequest {
                content: "floating".to_string(),
                question_id: Uuid::new_v4(),
            },
            owner.id,
        )
        .await;

    // Foreign-key violation surfaces as NotFound.
    assert!(matches!(
        result,
        Err(askforge::error::ApiError::NotFound(_))
    ));
}

#[test]
#[serial]
async fn accepting_an_answer_persists_and_leaves_siblings() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let asker = ctx.create_user("asker").await;
    let answerer = ctx.create_user("answerer").await;
    let question_id = ctx.create_question(&asker, vec![]).await;
    let first_id = ctx.create_answer(&answerer, question_id).await;
    let second_id = ctx.create_answer(&answerer, question_id).await;

    let first = ctx.repo.set_answer_accepted(first_id, true).await.unwrap();
    assert!(first.is_accepted);

    // Accepting a second answer does not clear the first.
    ctx.repo.set_answer_accepted(second_id, true).await.unwrap();
    let reread = ctx.repo.get_answer(first_id).await.unwrap().unwrap();
    assert!(reread.is_accepted);
}

// --- Vote ledger ---

#[test]
#[serial]
async fn repeated_vote_toggles_off_leaving_no_row() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let asker = ctx.create_user("vote_asker").await;
    let voter = ctx.create_user("voter").await;
    let question_id = ctx.create_question(&asker, vec![]).await;
    let answer_id = ctx.create_answer(&asker, question_id).await;

    let first = ctx
        .repo
        .cast_vote(voter.id, answer_id, Polarity::Up)
        .await
        .unwrap();
    assert_eq!(first, VoteOutcome::Created);
    assert_eq!(ctx.count_votes(voter.id, answer_id).await, 1);

    let second = ctx
        .repo
        .cast_vote(voter.id, answer_id, Polarity::Up)
        .await
        .unwrap();
    assert_eq!(second, VoteOutcome::Removed);
    assert_eq!(ctx.count_votes(voter.id, answer_id).await, 0);
    assert!(ctx.repo.get_vote(voter.id, answer_id).await.unwrap().is_none());
}

#[test]
#[serial]
async fn opposite_vote_flips_in_place() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let asker = ctx.create_user("flip_asker").await;
    let voter = ctx.create_user("flipper").await;
    let question_id = ctx.create_question(&asker, vec![]).await;
    let answer_id = ctx.create_answer(&asker, question_id).await;

    ctx.repo
        .cast_vote(voter.id, answer_id, Polarity::Up)
        .await
        .unwrap();
    let flipped = ctx
        .repo
        .cast_vote(voter.id, answer_id, Polarity::Down)
        .await
        .unwrap();
    assert_eq!(flipped, VoteOutcome::Updated);

    // Exactly one row, now with the opposite polarity.
    assert_eq!(ctx.count_votes(voter.id, answer_id).await, 1);
    let vote = ctx
        .repo
        .get_vote(voter.id, answer_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vote.polarity, Polarity::Down);
}

#[test]
#[serial]
async fn vote_on_missing_answer_is_not_found() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let voter = ctx.create_user("void_voter").await;
    let result = ctx
        .repo
        .cast_vote(voter.id, Uuid::new_v4(), Polarity::Up)
        .await;

    assert!(matches!(
        result,
        Err(askforge::error::ApiError::NotFound(_))
    ));
}

// --- Notifications ---

#[test]
#[serial]
async fn notification_lifecycle() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let user = ctx.create_user("notified").await;
    let notification = ctx
        .repo
        .create_notification(user.id, "your answer was accepted")
        .await
        .unwrap();
    assert!(!notification.is_read);

    let unread = ctx.repo.get_unread_notifications(user.id).await.unwrap();
    assert!(unread.iter().any(|n| n.id == notification.id));

    let updated = ctx
        .repo
        .mark_notification_read(notification.id)
        .await
        .unwrap();
    assert!(updated.is_read);

    let unread_after = ctx.repo.get_unread_notifications(user.id).await.unwrap();
    assert!(unread_after.iter().all(|n| n.id != notification.id));

    // Marking a missing notification is NotFound.
    let missing = ctx.repo.mark_notification_read(Uuid::new_v4()).await;
    assert!(matches!(
        missing,
        Err(askforge::error::ApiError::NotFound(_))
    ));
}
