use async_trait::async_trait;
use portkey_core::{Link, LinkRepository, Result, StorageError, StoreStats};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

/// Postgres implementation of the repository contract.
///
/// Deduplication rides on the unique indexes: a violation on `original`
/// becomes [`StorageError::Conflict`], a violation on `short` becomes
/// [`StorageError::IdCollision`]. Batch insert and delete-marking run in
/// transactions; reads are non-transactional. Concurrency is delegated to
/// the connection pool.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a new pool for `dsn` and ensures the schema exists.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(dsn)
            .await
            .map_err(map_sqlx_error)?;
        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `links` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(include_str!("../ddl/postgres/links.sql"))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    StorageError::Io(err.to_string())
}

/// Which unique constraint a violation hit, if any.
fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    let db = err.as_database_error()?;
    if !db.is_unique_violation() {
        return None;
    }
    db.constraint()
}

fn map_insert_error(err: sqlx::Error, link: &Link) -> StorageError {
    match unique_violation(&err) {
        Some("links_original_key") => StorageError::Conflict(link.original.clone()),
        Some("links_short_key") => StorageError::IdCollision(link.short.clone()),
        // A violation without a recognizable constraint is still a dedup
        // failure; attribute it to the original.
        Some(_) => StorageError::Conflict(link.original.clone()),
        None => map_sqlx_error(err),
    }
}

fn row_to_link(row: &PgRow) -> Result<Link> {
    Ok(Link {
        short: row.try_get("short").map_err(map_sqlx_error)?,
        original: row.try_get("original").map_err(map_sqlx_error)?,
        user_id: row.try_get("user_id").map_err(map_sqlx_error)?,
        deleted: row.try_get("is_deleted").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl LinkRepository for PostgresRepository {
    async fn insert(&self, link: &Link) -> Result<()> {
        sqlx::query("INSERT INTO links (short, original, user_id) VALUES ($1, $2, $3)")
            .bind(&link.short)
            .bind(&link.original)
            .bind(&link.user_id)
            .execute(&self.pool)
            .await
            .map_err(|err| map_insert_error(err, link))?;
        Ok(())
    }

    async fn insert_batch(&self, links: &[Link]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        for link in links {
            sqlx::query("INSERT INTO links (short, original, user_id) VALUES ($1, $2, $3)")
                .bind(&link.short)
                .bind(&link.original)
                .bind(&link.user_id)
                .execute(&mut *tx)
                .await
                .map_err(|err| map_insert_error(err, link))?;
        }
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn get_by_short(&self, short: &str) -> Result<Link> {
        let row = sqlx::query(
            "SELECT short, original, user_id, is_deleted FROM links WHERE short = $1",
        )
        .bind(short)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| StorageError::NotFound(short.to_string()))?;

        row_to_link(&row)
    }

    async fn get_by_original(&self, original: &str) -> Result<Link> {
        let row = sqlx::query(
            "SELECT short, original, user_id, is_deleted FROM links WHERE original = $1",
        )
        .bind(original)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| StorageError::NotFound(original.to_string()))?;

        row_to_link(&row)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Link>> {
        let rows = sqlx::query(
            "SELECT short, original, user_id, is_deleted FROM links WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_link).collect()
    }

    async fn mark_deleted(&self, user_id: &str, short: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        // A row owned by another user is left untouched; rows_affected is
        // deliberately ignored.
        sqlx::query("UPDATE links SET is_deleted = TRUE WHERE short = $1 AND user_id = $2")
            .bind(short)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS urls, COUNT(DISTINCT NULLIF(user_id, '')) AS users FROM links",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let urls: i64 = row.try_get("urls").map_err(map_sqlx_error)?;
        let users: i64 = row.try_get("users").map_err(map_sqlx_error)?;
        Ok(StoreStats {
            urls: urls as u64,
            users: users as u64,
        })
    }
}
