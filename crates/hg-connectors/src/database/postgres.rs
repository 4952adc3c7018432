//! PostgreSQL asset database adapter.
//!
//! Each lookup opens a single connection, calls the `get_asset` set-returning
//! function with the hostname as a bound parameter, and closes the
//! connection. Connect and query share one timeout.

use crate::secure_string::SecureString;
use crate::traits::{
    Applicability, AssetRecord, SkipReason, SourceAdapter, SourceError, SourceKind, SourceResult,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::Connection;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const ASSET_QUERY: &str = r#"
    SELECT hostname, owner_email, owner_team, environment, cost_center, status
    FROM get_asset($1)
"#;

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub username: String,
    /// The adapter is skipped when no password is configured.
    #[serde(default)]
    pub password: Option<SecureString>,
    /// Bound on connect plus query.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_port() -> u16 {
    5432
}

fn default_timeout_secs() -> u64 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "asset-db.contoso.com".to_string(),
            port: default_port(),
            database: "asset_inventory".to_string(),
            username: "keyfactor_reader".to_string(),
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl DatabaseConfig {
    /// Returns true when a password is present.
    pub fn is_configured(&self) -> bool {
        self.password.as_ref().is_some_and(|p| !p.is_empty())
    }

    fn connect_options(&self) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .application_name("hostgate");
        if let Some(password) = &self.password {
            options = options.password(password.expose_secret());
        }
        options
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AssetRow {
    hostname: Option<String>,
    owner_email: Option<String>,
    owner_team: Option<String>,
    environment: Option<String>,
    cost_center: Option<String>,
    status: Option<String>,
}

impl AssetRow {
    /// NULL columns read as empty strings. The queried hostname is kept as
    /// the record identity when the row omits it.
    fn into_record(self, queried: &str) -> AssetRecord {
        let hostname = self
            .hostname
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| queried.to_string());

        AssetRecord::known(hostname, self.status.unwrap_or_default())
            .with_owner_email(self.owner_email.unwrap_or_default())
            .with_owner_team(self.owner_team.unwrap_or_default())
            .with_environment(self.environment.unwrap_or_default())
            .with_cost_center(self.cost_center.unwrap_or_default())
    }
}

/// Asset database adapter (second in the fallback chain).
pub struct PostgresAdapter {
    config: DatabaseConfig,
}

impl PostgresAdapter {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    async fn query(&self, hostname: &str) -> SourceResult<Option<AssetRow>> {
        let mut conn = PgConnection::connect_with(&self.config.connect_options())
            .await
            .map_err(map_sqlx_error)?;

        let row = sqlx::query_as::<_, AssetRow>(ASSET_QUERY)
            .bind(hostname)
            .fetch_optional(&mut conn)
            .await
            .map_err(map_sqlx_error)?;

        if let Err(e) = conn.close().await {
            debug!(error = %e, "Closing database connection failed");
        }

        Ok(row)
    }
}

#[async_trait]
impl SourceAdapter for PostgresAdapter {
    fn name(&self) -> &str {
        "postgres"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Database
    }

    fn applicability(&self, _hostname: &str) -> Applicability {
        if self.config.is_configured() {
            Applicability::Applicable
        } else {
            Applicability::NotApplicable(SkipReason::ConfigurationMissing)
        }
    }

    #[instrument(skip(self), fields(db_host = %self.config.host))]
    async fn lookup(&self, hostname: &str) -> SourceResult<Option<AssetRecord>> {
        let timeout = Duration::from_secs(self.config.timeout_secs);

        let row = match tokio::time::timeout(timeout, self.query(hostname)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(timeout_secs = self.config.timeout_secs, "Database lookup timed out");
                return Err(SourceError::Timeout(format!(
                    "database lookup exceeded {}s",
                    self.config.timeout_secs
                )));
            }
        };

        Ok(row.map(|row| row.into_record(hostname)))
    }
}

fn map_sqlx_error(e: sqlx::Error) -> SourceError {
    let message = e.to_string();
    match e {
        sqlx::Error::PoolTimedOut => SourceError::Timeout(message),
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::TypeNotFound { .. } => SourceError::DataFormat(message),
        _ => SourceError::Transport(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ResolutionAttempt, ACTIVE_STATUS};

    fn row(status: Option<&str>) -> AssetRow {
        AssetRow {
            hostname: Some("db01.contoso.com".to_string()),
            owner_email: Some("dba@contoso.com".to_string()),
            owner_team: Some("data-platform".to_string()),
            environment: None,
            cost_center: Some("3003".to_string()),
            status: status.map(String::from),
        }
    }

    #[test]
    fn test_row_nulls_read_as_empty() {
        let record = row(Some(ACTIVE_STATUS)).into_record("db01.contoso.com");
        assert!(record.exists);
        assert_eq!(record.owner_team, "data-platform");
        assert_eq!(record.environment, "");
        assert!(record.is_authorizable());
    }

    #[test]
    fn test_row_status_is_taken_verbatim() {
        let record = row(Some("decommissioned")).into_record("db01.contoso.com");
        assert!(record.is_known_inactive());

        let record = row(None).into_record("db01.contoso.com");
        assert!(record.is_known_inactive());
    }

    #[test]
    fn test_missing_row_hostname_keeps_queried_name() {
        let mut r = row(Some(ACTIVE_STATUS));
        r.hostname = None;
        assert_eq!(r.into_record("DB01.contoso.com").hostname, "DB01.contoso.com");
    }

    #[tokio::test]
    async fn test_missing_password_is_not_applicable() {
        let adapter = PostgresAdapter::new(DatabaseConfig::default());
        assert_eq!(
            adapter.resolve("db01.contoso.com").await,
            ResolutionAttempt::NotApplicable(SkipReason::ConfigurationMissing)
        );
    }

    const GET_ASSET_FIXTURE: &str = r#"
        CREATE OR REPLACE FUNCTION get_asset(p_hostname text)
        RETURNS TABLE (
            hostname text, owner_email text, owner_team text,
            environment text, cost_center text, status text
        )
        LANGUAGE sql STABLE AS $$
            SELECT a.hostname, a.owner_email, a.owner_team, a.environment, a.cost_center, a.status
            FROM (VALUES
                ('db01.contoso.com', 'dba@contoso.com', 'data-platform', 'prod', '3003', 'active'),
                ('db02.contoso.com', 'dba@contoso.com', 'data-platform', NULL, NULL, 'retired')
            ) AS a(hostname, owner_email, owner_team, environment, cost_center, status)
            WHERE a.hostname = p_hostname
        $$
    "#;

    /// Adapter settings for the server named by `DATABASE_URL`.
    fn config_from_url(url: &str) -> DatabaseConfig {
        let url = reqwest::Url::parse(url).unwrap();
        let password = urlencoding::decode(url.password().unwrap_or_default())
            .unwrap()
            .into_owned();
        DatabaseConfig {
            host: url.host_str().unwrap_or("localhost").to_string(),
            port: url.port().unwrap_or(5432),
            database: url.path().trim_start_matches('/').to_string(),
            username: url.username().to_string(),
            password: Some(SecureString::new(password)),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL server at DATABASE_URL"]
    async fn test_get_asset_match_and_no_match() {
        let url = std::env::var("DATABASE_URL").unwrap();
        let mut conn = PgConnection::connect(&url).await.unwrap();
        sqlx::query(GET_ASSET_FIXTURE).execute(&mut conn).await.unwrap();
        conn.close().await.unwrap();

        let adapter = PostgresAdapter::new(config_from_url(&url));

        match adapter.resolve("db01.contoso.com").await {
            ResolutionAttempt::Match(record) => {
                assert_eq!(record.owner_team, "data-platform");
                assert_eq!(record.cost_center, "3003");
                assert!(record.is_authorizable());
            }
            other => panic!("Expected Match, got {:?}", other),
        }

        match adapter.resolve("db02.contoso.com").await {
            ResolutionAttempt::Match(record) => {
                assert!(record.is_known_inactive());
                assert_eq!(record.environment, "");
            }
            other => panic!("Expected Match, got {:?}", other),
        }

        assert_eq!(
            adapter.resolve("ghost.contoso.com").await,
            ResolutionAttempt::NoMatch
        );
    }

    #[tokio::test]
    async fn test_unreachable_database_is_adapter_error() {
        let adapter = PostgresAdapter::new(DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            password: Some(SecureString::from("reader")),
            timeout_secs: 2,
            ..DatabaseConfig::default()
        });

        match adapter.resolve("db01.contoso.com").await {
            ResolutionAttempt::AdapterError(e) => assert!(e.is_transient(), "{:?}", e),
            other => panic!("Expected AdapterError, got {:?}", other),
        }
    }
}
