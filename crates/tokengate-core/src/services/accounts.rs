//! User accounts
//!
//! Registration creates the user and its free-tier entitlement together,
//! so every account has a quota record from its first request.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, JwtAuthResolver, TOKEN_EXPIRY_DAYS};
use crate::error::{Error, Result};
use crate::models::{LoginRequest, NewUser, RegisterRequest, TokenResponse, User, UserResponse};
use crate::services::entitlement::PlanConfig;

/// User repository - abstracts account storage for testability
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn username_exists(&self, username: &str) -> Result<bool>;

    async fn email_exists(&self, email: &str) -> Result<bool>;

    /// Insert the user together with a default entitlement on `plan`
    async fn create_user(&self, user: NewUser, plan: &PlanConfig, today: NaiveDate) -> Result<User>;
}

/// SQLite implementation of UserRepository
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn username_exists(&self, username: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    async fn create_user(&self, user: NewUser, plan: &PlanConfig, today: NaiveDate) -> Result<User> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, name, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO entitlements
            (user_id, plan, status, daily_limit, used_today, total_used, last_reset_date,
             subscription_start_date, subscription_end_date, updated_at)
            VALUES (?, ?, 'active', ?, 0, 0, ?, ?, NULL, ?)
            "#,
        )
        .bind(&user.id)
        .bind(plan.plan_id.as_str())
        .bind(i64::from(plan.daily_token_allowance))
        .bind(today)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let created: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(&user.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        log::info!("[accounts] Registered user {} ({})", created.username, created.id);
        Ok(created)
    }
}

/// Register a user on the free plan
pub async fn register_user<R: UserRepository + ?Sized>(
    repo: &R,
    request: RegisterRequest,
    free_plan: &PlanConfig,
    today: NaiveDate,
) -> Result<UserResponse> {
    let username = request.username.trim().to_string();
    if username.is_empty() {
        return Err(Error::validation("Username is required"));
    }
    if request.password.is_empty() {
        return Err(Error::validation("Password is required"));
    }

    if repo.username_exists(&username).await? {
        return Err(Error::validation("Username already exists"));
    }

    let email = request
        .email
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| format!("{}@local", username));

    if repo.email_exists(&email).await? {
        return Err(Error::validation("Email already registered"));
    }

    let password_hash = hash_password(&request.password)?;

    let new_user = NewUser {
        id: Uuid::new_v4().to_string(),
        name: if request.name.trim().is_empty() {
            username.clone()
        } else {
            request.name
        },
        username,
        email,
        password_hash,
    };

    let user = repo.create_user(new_user, free_plan, today).await?;
    Ok(UserResponse::from(user))
}

/// Check credentials and issue an access token
pub async fn login<R: UserRepository + ?Sized>(
    repo: &R,
    resolver: &JwtAuthResolver,
    request: LoginRequest,
) -> Result<TokenResponse> {
    let user = repo
        .find_by_username(&request.username)
        .await?
        .ok_or_else(|| Error::auth("Invalid credentials"))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(Error::auth("Invalid credentials"));
    }

    if !user.is_active {
        return Err(Error::auth("Account is disabled"));
    }

    let token = resolver.create_token(&user)?;
    Ok(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        expires_in: TOKEN_EXPIRY_DAYS * 24 * 60 * 60,
    })
}

/// Look a user up by id, falling back to username
pub async fn find_user<R: UserRepository + ?Sized>(repo: &R, id_or_username: &str) -> Result<User> {
    if let Some(user) = repo.find_by_id(id_or_username).await? {
        return Ok(user);
    }
    repo.find_by_username(id_or_username)
        .await?
        .ok_or_else(|| Error::not_found(format!("User {} not found", id_or_username)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthResolver, Credentials};
    use crate::services::entitlement::PlanCatalog;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // ============================================================================
    // Mock Repository
    // ============================================================================

    struct MockUserRepository {
        users: Mutex<HashMap<String, User>>,
        entitlements: Mutex<Vec<(String, String)>>,
    }

    impl MockUserRepository {
        fn new() -> Self {
            Self {
                users: Mutex::new(HashMap::new()),
                entitlements: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.values().find(|u| u.username == username).cloned())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
            Ok(self.users.lock().unwrap().get(id).cloned())
        }

        async fn username_exists(&self, username: &str) -> Result<bool> {
            Ok(self.find_by_username(username).await?.is_some())
        }

        async fn email_exists(&self, email: &str) -> Result<bool> {
            let users = self.users.lock().unwrap();
            Ok(users.values().any(|u| u.email == email))
        }

        async fn create_user(&self, user: NewUser, plan: &PlanConfig, _today: NaiveDate) -> Result<User> {
            let created = User {
                id: user.id.clone(),
                username: user.username,
                email: user.email,
                password_hash: user.password_hash,
                name: user.name,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.users.lock().unwrap().insert(user.id.clone(), created.clone());
            self.entitlements
                .lock()
                .unwrap()
                .push((user.id, plan.plan_id.to_string()));
            Ok(created)
        }
    }

    fn register_request(username: &str, email: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: "hunter22".to_string(),
            name: "Test User".to_string(),
            email: email.map(str::to_string),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn test_register_creates_basic_entitlement() {
        let repo = MockUserRepository::new();
        let catalog = PlanCatalog::built_in();

        let user = register_user(&repo, register_request("alice", None), catalog.free_plan(), today())
            .await
            .unwrap();

        assert_eq!(user.email, "alice@local");
        let ents = repo.entitlements.lock().unwrap();
        assert_eq!(ents.as_slice(), &[(user.id.clone(), "basic".to_string())]);
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let repo = MockUserRepository::new();
        let catalog = PlanCatalog::built_in();
        register_user(&repo, register_request("alice", Some("a@x.io")), catalog.free_plan(), today())
            .await
            .unwrap();

        let dup_name = register_user(&repo, register_request("alice", None), catalog.free_plan(), today()).await;
        assert!(matches!(dup_name, Err(Error::Validation(_))));

        let dup_email =
            register_user(&repo, register_request("bob", Some("a@x.io")), catalog.free_plan(), today()).await;
        assert!(matches!(dup_email, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_login_issues_resolvable_token() {
        let repo = MockUserRepository::new();
        let catalog = PlanCatalog::built_in();
        let resolver = JwtAuthResolver::new(b"test-secret-test-secret-test-secret".to_vec());
        let user = register_user(&repo, register_request("alice", None), catalog.free_plan(), today())
            .await
            .unwrap();

        let token = login(
            &repo,
            &resolver,
            LoginRequest {
                username: "alice".to_string(),
                password: "hunter22".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 7 * 24 * 60 * 60);
        let resolved = resolver.resolve(&Credentials::Bearer(token.access_token)).unwrap();
        assert_eq!(resolved, user.id);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let repo = MockUserRepository::new();
        let catalog = PlanCatalog::built_in();
        let resolver = JwtAuthResolver::new(b"secret".to_vec());
        register_user(&repo, register_request("alice", None), catalog.free_plan(), today())
            .await
            .unwrap();

        let result = login(
            &repo,
            &resolver,
            LoginRequest {
                username: "alice".to_string(),
                password: "wrong".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Authentication(_))));
    }

    #[tokio::test]
    async fn test_find_user_by_id_or_username() {
        let repo = MockUserRepository::new();
        let catalog = PlanCatalog::built_in();
        let user = register_user(&repo, register_request("alice", None), catalog.free_plan(), today())
            .await
            .unwrap();

        assert_eq!(find_user(&repo, &user.id).await.unwrap().username, "alice");
        assert_eq!(find_user(&repo, "alice").await.unwrap().id, user.id);
        assert!(matches!(find_user(&repo, "nobody").await, Err(Error::NotFound(_))));
    }
}
