//! Postgres-backed profile store.

use async_trait::async_trait;
use sqlx::PgPool;

use tutorhub_core::{Profile, Role, UserId};

use super::RepositoryError;
use crate::ports::ProfileStore;

/// Row shape of the `profiles` table.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: UserId,
    email: String,
    full_name: String,
    role: Role,
    phone: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            role: row.role,
            phone: row.phone,
        }
    }
}

/// Profile store over the `profiles` table.
#[derive(Debug, Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    /// Create a new store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT id, email, full_name, role, phone
            FROM profiles
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    async fn insert(&self, profile: &Profile) -> Result<Profile, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            INSERT INTO profiles (id, email, full_name, role, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, full_name, role, phone
            ",
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(profile.role)
        .bind(profile.phone.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!("profile {} already exists", profile.id));
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }
}
