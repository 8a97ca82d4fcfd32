use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime};
use quay_store::schema::{SCHEMA_PROBE_SQL, SENTINEL_TABLE};
use quay_store::{Query, Row, SqlParam};
use serde_json::{Number, Value};
use sqlx::mysql::types::MySqlTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Connection, Row as _, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use super::{StoreError, StoreResult, TerminalStore};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the terminal database pool.
#[derive(Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub query_timeout: Duration,
}

impl StoreConfig {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            database: database.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub const fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

/// Outcome of the one-time schema existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatus {
    Present,
    Seeded,
    Missing,
}

/// Pooled `MySQL` store. Clones share the same pool.
#[derive(Clone)]
pub struct MySqlTerminalStore {
    pool: MySqlPool,
    database: String,
    query_timeout: Duration,
}

impl MySqlTerminalStore {
    /// Opens the pool and verifies one connection answers a ping.
    ///
    /// # Errors
    /// Returns `StoreError::Connect` if the pool cannot be created or the ping fails.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(config.connect_options())
            .await
            .map_err(|err| StoreError::Connect(err.to_string()))?;

        let mut conn = pool
            .acquire()
            .await
            .map_err(|err| StoreError::Connect(err.to_string()))?;
        conn.ping()
            .await
            .map_err(|err| StoreError::Connect(err.to_string()))?;
        drop(conn);

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "database pool created"
        );
        Ok(Self {
            pool,
            database: config.database.clone(),
            query_timeout: config.query_timeout,
        })
    }

    #[must_use]
    pub const fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Closes every pooled connection. Further queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }

    /// Reports whether the sentinel table exists in the configured schema.
    ///
    /// # Errors
    /// Returns `StoreError::Query` if the information schema cannot be read.
    pub async fn schema_present(&self) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(SCHEMA_PROBE_SQL)
            .bind(self.database.as_str())
            .bind(SENTINEL_TABLE)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| StoreError::Query(err.to_string()))?;
        Ok(count > 0)
    }

    /// Imports `seed` as a multi-statement script when the schema is absent.
    ///
    /// # Errors
    /// Returns `StoreError` if the probe fails or the seed cannot be read or applied.
    pub async fn ensure_schema(&self, seed: Option<&Path>) -> StoreResult<SchemaStatus> {
        if self.schema_present().await? {
            info!("database tables already exist");
            return Ok(SchemaStatus::Present);
        }
        let Some(seed) = seed else {
            warn!(
                table = SENTINEL_TABLE,
                "database tables not found and no seed file configured"
            );
            return Ok(SchemaStatus::Missing);
        };

        info!(path = %seed.display(), "database tables not found, importing seed");
        let script = tokio::fs::read_to_string(seed)
            .await
            .map_err(|err| StoreError::Bootstrap(format!("{}: {err}", seed.display())))?;
        sqlx::raw_sql(&script)
            .execute(&self.pool)
            .await
            .map_err(|err| StoreError::Bootstrap(err.to_string()))?;
        info!("database seed imported");
        Ok(SchemaStatus::Seeded)
    }
}

impl TerminalStore for MySqlTerminalStore {
    async fn fetch(&self, query: Query, params: Vec<SqlParam>) -> StoreResult<Vec<Row>> {
        let started = Instant::now();
        let mut statement = sqlx::query(query.sql());
        for param in params {
            statement = match param {
                SqlParam::Text(value) => statement.bind(value),
                SqlParam::Null => statement.bind(Option::<String>::None),
            };
        }

        let rows = tokio::time::timeout(self.query_timeout, statement.fetch_all(&self.pool))
            .await
            .map_err(|_| StoreError::Timeout(self.query_timeout))?
            .map_err(|err| StoreError::Query(err.to_string()))?;

        debug!(
            query = query.label(),
            rows = rows.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "query complete"
        );
        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &MySqlRow) -> StoreResult<Row> {
    let mut record = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())
            .map_err(|err| StoreError::Query(format!("column {}: {err}", column.name())))?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    let (base, unsigned) = type_name
        .strip_suffix(" UNSIGNED")
        .map_or((type_name, false), |base| (base, true));

    let value = match base {
        "TINYINT" | "BOOLEAN" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            if unsigned {
                Value::from(row.try_get_unchecked::<u64, _>(index)?)
            } else {
                Value::from(row.try_get_unchecked::<i64, _>(index)?)
            }
        }
        "DECIMAL" => decimal_value(row.try_get_unchecked::<String, _>(index)?),
        "FLOAT" => float_value(f64::from(row.try_get_unchecked::<f32, _>(index)?)),
        "DOUBLE" => float_value(row.try_get_unchecked::<f64, _>(index)?),
        "DATETIME" | "TIMESTAMP" => Value::String(
            row.try_get_unchecked::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
        ),
        "DATE" => Value::String(
            row.try_get_unchecked::<NaiveDate, _>(index)?
                .format("%Y-%m-%d")
                .to_string(),
        ),
        "TIME" => time_value(row.try_get_unchecked::<MySqlTime, _>(index)?),
        _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
    };
    Ok(value)
}

fn decimal_value(text: String) -> Value {
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or(Value::String(text), Value::Number)
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

// TIME is a signed duration up to 838:59:59, not a time of day.
fn time_value(time: MySqlTime) -> Value {
    let sign = if time.is_negative() { "-" } else { "" };
    let clock = format!(
        "{sign}{:02}:{:02}:{:02}",
        time.hours(),
        time.minutes(),
        time.seconds()
    );
    match time.microseconds() {
        0 => Value::String(clock),
        micros => Value::String(format!("{clock}.{micros:06}")),
    }
}
