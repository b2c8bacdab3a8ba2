use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::{debug, warn};
use viplink_core::registry::{ReadRegistry, Registry, RegistryAdmin, Result};
use viplink_core::{Link, NewLink, SecretKey, StorageError, Suffix, UniqueKey};

const CREATE_SCHEMA: &str = include_str!("../ddl/mysql/links.sql");

const LINK_COLUMNS: &str = "suffix, link, secret_key, expiration_date, clicks, created_at";

/// MySQL implementation of the registry contract.
///
/// Instants are stored as epoch milliseconds. Expired rows stay in the table
/// and are filtered out of suffix lookups; an insert for the same suffix
/// replaces an expired row inside the inserting transaction.
#[derive(Debug, Clone)]
pub struct MySqlRegistry {
    pool: MySqlPool,
}

impl MySqlRegistry {
    /// Creates a registry from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a registry by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<Link>> {
        let row = sqlx::query(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE {clause} LIMIT 1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(parse_link).transpose()
    }
}

fn parse_timestamp(millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid timestamp '{}': {e}", millis))
    })
}

fn parse_link(row: &MySqlRow) -> Result<Link> {
    let suffix: String = row.try_get("suffix").map_err(map_sqlx_error)?;
    let long_url: String = row.try_get("link").map_err(map_sqlx_error)?;
    let secret_key: String = row.try_get("secret_key").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expiration_date").map_err(map_sqlx_error)?;
    let clicks: u64 = row.try_get("clicks").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(Link {
        suffix: Suffix::new_unchecked(suffix),
        long_url,
        secret_key: SecretKey::new_unchecked(secret_key),
        expires_at: expires_at.map(parse_timestamp).transpose()?,
        clicks,
        created_at: parse_timestamp(created_at)?,
    })
}

/// Name of the unique index on `secret_key` in `ddl/mysql/links.sql`.
const SECRET_KEY_INDEX: &str = "uq_links_secret_key";

/// Returns which unique key a duplicate-entry error violated, if it is one.
fn unique_violation(err: &sqlx::Error) -> Option<UniqueKey> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    Some(violated_key(db_err.message()))
}

/// Reads the index name MySQL puts at the end of a duplicate-entry message,
/// e.g. `Duplicate entry 'x' for key 'links.uq_links_secret_key'`.
///
/// The duplicated entry is caller data and may itself look like an index
/// name, so only the trailing key clause is inspected. Any index other than
/// the secret key's is the primary key on `suffix`.
fn violated_key(message: &str) -> UniqueKey {
    let index = message
        .rsplit_once("for key '")
        .map(|(_, quoted)| quoted.trim_end_matches('\''))
        .map(|name| name.rsplit_once('.').map_or(name, |(_, index)| index));

    match index {
        Some(SECRET_KEY_INDEX) => UniqueKey::SecretKey,
        _ => UniqueKey::Suffix,
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let kind: fn(String) -> StorageError = match &err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout,
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_) => StorageError::Unavailable,
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData,
        sqlx::Error::Configuration(_) => StorageError::Operation,
        _ => StorageError::Query,
    };
    kind(err.to_string())
}

#[async_trait]
impl ReadRegistry for MySqlRegistry {
    async fn find_by_suffix(&self, suffix: &Suffix, as_of: Timestamp) -> Result<Option<Link>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {LINK_COLUMNS}
            FROM links
            WHERE suffix = ?
              AND (expiration_date IS NULL OR expiration_date > ?)
            LIMIT 1
            "#
        ))
        .bind(suffix.as_str())
        .bind(as_of.as_millisecond())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(parse_link).transpose()
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<Link>> {
        self.fetch_one_where(
            "link = ? ORDER BY expiration_date IS NULL DESC, expiration_date DESC",
            long_url,
        )
        .await
    }

    async fn find_by_secret_key(&self, secret_key: &SecretKey) -> Result<Option<Link>> {
        self.fetch_one_where("secret_key = ?", secret_key.as_str())
            .await
    }
}

#[async_trait]
impl Registry for MySqlRegistry {
    async fn insert(&self, link: &NewLink) -> Result<()> {
        let created_at = link.created_at.as_millisecond();
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let reclaimed = sqlx::query(
            r#"
            DELETE FROM links
            WHERE suffix = ?
              AND expiration_date IS NOT NULL
              AND expiration_date <= ?
            "#,
        )
        .bind(link.suffix.as_str())
        .bind(created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if reclaimed.rows_affected() > 0 {
            debug!(suffix = %link.suffix, "reclaimed expired suffix");
        }

        let result = sqlx::query(
            r#"
            INSERT INTO links (suffix, link, secret_key, expiration_date, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(link.suffix.as_str())
        .bind(link.long_url.as_str())
        .bind(link.secret_key.as_str())
        .bind(link.expires_at.map(|ts| ts.as_millisecond()))
        .bind(created_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = result {
            // dropping `tx` rolls the reclaim back
            return Err(match unique_violation(&err) {
                Some(UniqueKey::SecretKey) => {
                    StorageError::conflict(UniqueKey::SecretKey, link.secret_key.as_str())
                }
                Some(UniqueKey::Suffix) => {
                    StorageError::conflict(UniqueKey::Suffix, link.suffix.as_str())
                }
                None => {
                    warn!(suffix = %link.suffix, error = %err, "insert failed");
                    map_sqlx_error(err)
                }
            });
        }

        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn delete_by_secret_key(&self, secret_key: &SecretKey) -> Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE secret_key = ?")
            .bind(secret_key.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_clicks(&self, suffix: &Suffix) -> Result<bool> {
        let result = sqlx::query("UPDATE links SET clicks = clicks + 1 WHERE suffix = ?")
            .bind(suffix.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RegistryAdmin for MySqlRegistry {
    async fn create_schema(&self) -> Result<()> {
        sqlx::query(CREATE_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn drop_schema(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS links")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM links")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt::{Display, Formatter};

    /// A server error as the MySQL driver would surface it.
    #[derive(Debug)]
    struct ServerError {
        duplicate: bool,
        message: String,
    }

    impl ServerError {
        fn duplicate(message: &str) -> sqlx::Error {
            sqlx::Error::Database(Box::new(Self {
                duplicate: true,
                message: message.to_string(),
            }))
        }
    }

    impl Display for ServerError {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.message)
        }
    }

    impl StdError for ServerError {}

    impl DatabaseError for ServerError {
        fn message(&self) -> &str {
            &self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23000"))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.duplicate {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    #[test]
    fn primary_key_violation_is_a_suffix_conflict() {
        let err = ServerError::duplicate("Duplicate entry 'promo1' for key 'links.PRIMARY'");
        assert_eq!(unique_violation(&err), Some(UniqueKey::Suffix));
    }

    #[test]
    fn secret_key_index_violation() {
        let err = ServerError::duplicate(
            "Duplicate entry '0123456789abcdef' for key 'links.uq_links_secret_key'",
        );
        assert_eq!(unique_violation(&err), Some(UniqueKey::SecretKey));

        // servers before 8.0.19 leave out the table name
        let err = ServerError::duplicate(
            "Duplicate entry '0123456789abcdef' for key 'uq_links_secret_key'",
        );
        assert_eq!(unique_violation(&err), Some(UniqueKey::SecretKey));
    }

    #[test]
    fn suffix_that_looks_like_an_index_name() {
        for suffix in ["my_secret_key", "uq_links_secret_key", "x' for key 'uq_links_secret_key"] {
            let err = ServerError::duplicate(&format!(
                "Duplicate entry '{suffix}' for key 'links.PRIMARY'"
            ));
            assert_eq!(unique_violation(&err), Some(UniqueKey::Suffix), "{suffix}");
        }
    }

    #[test]
    fn other_database_errors_are_not_conflicts() {
        let err = sqlx::Error::Database(Box::new(ServerError {
            duplicate: false,
            message: "Table 'viplink.links' doesn't exist".to_string(),
        }));
        assert_eq!(unique_violation(&err), None);
        assert!(matches!(map_sqlx_error(err), StorageError::Query(_)));

        assert_eq!(unique_violation(&sqlx::Error::PoolTimedOut), None);
    }

    #[test]
    fn driver_errors_map_to_storage_kinds() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::ColumnNotFound("clicks".to_string())),
            StorageError::InvalidData(_)
        ));
    }
}
