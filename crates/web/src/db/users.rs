//! `PostgreSQL` user store.
//!
//! Enum columns are read as text and parsed with the core `FromStr`
//! implementations, and written with an explicit cast.

use async_trait::async_trait;
use sqlx::PgPool;

use civic_pulse_core::{Email, Profile, User, UserId, UserRole};

use super::{Credentials, RepositoryError, UserStore, map_unique_violation};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: Option<String>,
    role: Option<String>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let email = parse_email(&self.email)?;
        let profile = match (self.name, self.role) {
            (Some(name), Some(role)) => Profile {
                name,
                role: parse_role(&role)?,
            },
            _ => Profile::fallback_for(&email),
        };
        Ok(User {
            id: UserId::new(self.id),
            name: profile.name,
            email,
            role: profile.role,
        })
    }
}

fn parse_email(raw: &str) -> Result<Email, RepositoryError> {
    Email::parse(raw)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email in database: {e}")))
}

fn parse_role(raw: &str) -> Result<UserRole, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid role in database: {e}")))
}

const SELECT_USER: &str = r"
    SELECT u.id, u.email, p.name, p.role::text AS role
    FROM civic.user u
    LEFT JOIN civic.profile p ON p.user_id = u.id
";

/// User store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (id,): (i32,) = sqlx::query_as(
            r"
            INSERT INTO civic.user (email, password_hash)
            VALUES ($1, $2)
            RETURNING id
            ",
        )
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "email"))?;

        sqlx::query(
            r"
            INSERT INTO civic.profile (user_id, name, role)
            VALUES ($1, $2, 'citizen')
            ",
        )
        .bind(id)
        .bind(name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(User {
            id: UserId::new(id),
            name: name.to_owned(),
            email: email.clone(),
            role: UserRole::Citizen,
        })
    }

    async fn find_credentials(&self, email: &Email) -> Result<Option<Credentials>, RepositoryError> {
        let row: Option<(i32, String, String)> = sqlx::query_as(
            r"
            SELECT id, email, password_hash
            FROM civic.user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, email, password_hash)| {
            Ok(Credentials {
                user_id: UserId::new(id),
                email: parse_email(&email)?,
                password_hash,
            })
        })
        .transpose()
    }

    async fn get_profile(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        let row: Option<(String, String)> = sqlx::query_as(
            r"
            SELECT name, role::text
            FROM civic.profile
            WHERE user_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(name, role)| {
            Ok(Profile {
                name,
                role: parse_role(&role)?,
            })
        })
        .transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE u.email = $1"))
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.map(UserRow::into_user).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("{SELECT_USER} ORDER BY p.name NULLS LAST, u.id"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "{SELECT_USER} WHERE p.role = $1::civic.user_role ORDER BY p.name, u.id"
        ))
        .bind(role.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UserRow::into_user).collect()
    }

    async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError> {
        let updated = sqlx::query(
            r"
            INSERT INTO civic.profile (user_id, name, role)
            SELECT u.id, split_part(u.email, '@', 1), $2::civic.user_role
            FROM civic.user u
            WHERE u.email = $1
            ON CONFLICT (user_id)
            DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
            ",
        )
        .bind(email.as_str())
        .bind(role.to_string())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get_user_by_email(email)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
