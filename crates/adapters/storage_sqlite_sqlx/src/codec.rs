//! Column conversions shared by the repositories.

use chrono::{DateTime, SecondsFormat};
use sqlx::SqlitePool;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use smarthome_domain::error::SmartHomeError;
use smarthome_domain::time::Timestamp;

use crate::error::StorageError;

pub(crate) type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Wrap a domain parsing failure as a row decoding error.
pub(crate) fn decode_error<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

/// Fixed-width UTC rendering; text order equals time order.
pub(crate) fn encode_timestamp(timestamp: Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<Timestamp, sqlx::Error> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(decode_error)?
        .to_utc())
}

pub(crate) fn encode_version(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

pub(crate) fn decode_version(raw: i64) -> Result<u64, sqlx::Error> {
    u64::try_from(raw).map_err(decode_error)
}

/// Run a write and report whether it touched a row.
pub(crate) async fn execute(pool: &SqlitePool, query: SqliteQuery<'_>) -> Result<bool, SmartHomeError> {
    let result = query.execute(pool).await.map_err(StorageError::from)?;
    Ok(result.rows_affected() > 0)
}
