//! User service: registration, token authentication and profiles.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use crate::services::conflict_as;
use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{entities::user, repositories::UserRepository};
use regex::Regex;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9@.+_-]+$").unwrap_or_else(|_| unreachable!()));

const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(
        length(min = 1, max = 150),
        regex(
            path = *USERNAME_RE,
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    pub username: String,

    #[validate(email, length(max = 254))]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,
}

/// Input for updating the caller's profile. Absent fields are left alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(email, length(max = 254))]
    pub email: Option<String>,

    #[validate(length(max = 150))]
    pub first_name: Option<String>,

    #[validate(length(max = 150))]
    pub last_name: Option<String>,

    #[validate(length(max = 2000))]
    pub bio: Option<String>,

    #[validate(url, length(max = 1024))]
    pub profile_picture: Option<String>,
}

/// A user together with their API token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: user::Model,
    pub token: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user and issue their first token.
    pub async fn register(&self, mut input: RegisterInput) -> AppResult<AuthSession> {
        if input.email.as_deref().is_some_and(|e| e.trim().is_empty()) {
            input.email = None;
        }
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest(USERNAME_TAKEN.to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username_lower: Set(input.username.to_lowercase()),
            username: Set(input.username),
            email: Set(input.email),
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            bio: Set(String::new()),
            profile_picture: Set(None),
            password_hash: Set(password_hash),
            token: Set(Some(token.clone())),
            is_staff: Set(false),
            followers_count: Set(0),
            following_count: Set(0),
            date_joined: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self
            .user_repo
            .create(model)
            .await
            .map_err(conflict_as(USERNAME_TAKEN))?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(AuthSession { user, token })
    }

    /// Check credentials and return the user's token, issuing one if they have none.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthSession> {
        let invalid = || AppError::BadRequest("Invalid credentials".to_string());

        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        let token = match &user.token {
            Some(token) => token.clone(),
            None => {
                let token = self.id_gen.generate_token();
                self.user_repo
                    .set_token(&user.id, Some(token.clone()))
                    .await?;
                token
            }
        };

        Ok(AuthSession { user, token })
    }

    /// Revoke the user's token. The next login issues a fresh one.
    pub async fn logout(&self, user_id: &str) -> AppResult<()> {
        self.user_repo.set_token(user_id, None).await
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Update the caller's profile.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let user = self.user_repo.get_by_id(user_id).await?;
        let mut active: user::ActiveModel = user.into();

        if let Some(email) = input.email {
            active.email = Set(Some(email).filter(|e| !e.is_empty()));
        }
        if let Some(first_name) = input.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = input.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(bio) = input.bio {
            active.bio = Set(bio);
        }
        if let Some(profile_picture) = input.profile_picture {
            active.profile_picture = Set(Some(profile_picture).filter(|p| !p.is_empty()));
        }

        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.user_repo.update(active).await
    }
}

/// Map user IDs to usernames with a single lookup.
pub(crate) async fn usernames<'a, I>(
    user_repo: &UserRepository,
    ids: I,
) -> AppResult<HashMap<String, String>>
where
    I: IntoIterator<Item = &'a String>,
{
    let ids: Vec<String> = ids.into_iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();

    Ok(user_repo
        .find_by_ids(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect())
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_user(id: &str, username: &str, password: &str, token: Option<&str>) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            profile_picture: None,
            password_hash: hash_password(password).unwrap(),
            token: token.map(str::to_string),
            is_staff: false,
            followers_count: 0,
            following_count: 0,
            date_joined: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> UserService {
        UserService::new(UserRepository::new(Arc::new(db.into_connection())))
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_register_input_validation() {
        let bad_chars = RegisterInput {
            username: "has space".to_string(),
            email: None,
            password: "longenough".to_string(),
        };
        assert!(bad_chars.validate().is_err());

        let short_password = RegisterInput {
            username: "alice".to_string(),
            email: None,
            password: "short".to_string(),
        };
        assert!(short_password.validate().is_err());

        let bad_email = RegisterInput {
            username: "alice".to_string(),
            email: Some("not-an-email".to_string()),
            password: "longenough".to_string(),
        };
        assert!(bad_email.validate().is_err());

        for username in ["josé", "用户", "ａｌｉｃｅ"] {
            let non_ascii = RegisterInput {
                username: username.to_string(),
                email: None,
                password: "longenough".to_string(),
            };
            assert!(non_ascii.validate().is_err(), "{username} should be rejected");
        }

        let long_password = RegisterInput {
            username: "alice".to_string(),
            email: None,
            password: "p".repeat(500),
        };
        assert!(long_password.validate().is_ok());

        let ok = RegisterInput {
            username: "alice.b+c@d-e_f".to_string(),
            email: Some("alice@example.com".to_string()),
            password: "longenough".to_string(),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_profile_fields_fit_their_columns() {
        let long_picture = UpdateProfileInput {
            profile_picture: Some(format!("https://example.com/{}", "a".repeat(1024))),
            ..Default::default()
        };
        assert!(long_picture.validate().is_err());

        let long_email = UpdateProfileInput {
            email: Some(format!("{}@{}com", "a".repeat(64), format!("{}.", "b".repeat(63)).repeat(3))),
            ..Default::default()
        };
        assert!(long_email.validate().is_err());

        let ok = UpdateProfileInput {
            email: Some("alice@example.com".to_string()),
            profile_picture: Some("https://example.com/alice.png".to_string()),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[tokio::test]
    async fn test_register_username_taken() {
        let existing = create_test_user("u1", "Alice", "password123", Some("tok"));
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = service
            .register(RegisterInput {
                username: "alice".to_string(),
                email: None,
                password: "password123".to_string(),
            })
            .await;

        match result {
            Err(AppError::BadRequest(msg)) => assert!(msg.contains("already exists")),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_success_issues_token() {
        let created = create_test_user("u1", "alice", "password123", Some("tok"));
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([[created]]),
        );

        let session = service
            .register(RegisterInput {
                username: "alice".to_string(),
                email: Some(String::new()),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.user.username, "alice");
        assert_eq!(session.token.len(), 32);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = create_test_user("u1", "alice", "password123", Some("tok"));
        let service =
            service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        match service.login("alice", "nope-nope").await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Invalid credentials"),
            other => panic!("Expected BadRequest, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        assert!(matches!(
            service.login("ghost", "password123").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_login_reuses_existing_token() {
        let user = create_test_user("u1", "alice", "password123", Some("existing"));
        let service =
            service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let session = service.login("alice", "password123").await.unwrap();
        assert_eq!(session.token, "existing");
    }

    #[tokio::test]
    async fn test_login_after_logout_issues_new_token() {
        let user = create_test_user("u1", "alice", "password123", None);
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }]),
        );

        let session = service.login("alice", "password123").await.unwrap();
        assert_eq!(session.token.len(), 32);
    }

    #[tokio::test]
    async fn test_authenticate_by_token_unknown() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        assert!(matches!(
            service.authenticate_by_token("bogus").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_rejects_bad_url() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service
            .update_profile(
                "u1",
                UpdateProfileInput {
                    profile_picture: Some("not a url".to_string()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
