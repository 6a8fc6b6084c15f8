//! PostgreSQL driver.
//!
//! [`PostgresSource`] implements [`MetadataSource`](crate::core::MetadataSource)
//! over a deadpool-postgres pool; [`PostgresRowDiffer`] implements
//! [`RowDiffEngine`](crate::core::RowDiffEngine) over one pool per side.

mod differ;
mod source;

pub use differ::PostgresRowDiffer;
pub use source::PostgresSource;

use std::time::Instant;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use serde::Serialize;
use tokio_postgres::Config as PgConfig;
use tracing::warn;

use crate::config::{Config, ConnectionConfig};
use crate::error::{DriftError, Result};

use super::tls::{SslMode, TlsBuilder};

/// Build a connection pool for one side. No connection is opened yet.
pub fn build_pool(name: &str, config: &ConnectionConfig) -> Result<Pool> {
    let (host, port) = config.host_and_port();

    let mut pg_config = PgConfig::new();
    pg_config.host(host);
    pg_config.port(port);
    pg_config.dbname(&config.database);
    pg_config.user(&config.username);
    pg_config.password(&config.password);
    pg_config.application_name("db-drift");

    let mgr_config = ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    };

    let context = format!("creating {} pool for {}", name, config.display_location());
    let ssl_mode: SslMode = config.ssl_mode.parse()?;
    let pool = match TlsBuilder::new(ssl_mode).build()? {
        None => {
            warn!(
                "{}: TLS is disabled. Credentials will be transmitted in plaintext.",
                name
            );
            let mgr = Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config);
            Pool::builder(mgr)
                .max_size(config.max_connections)
                .build()
                .map_err(|e| DriftError::pool(e, context))?
        }
        Some(tls_connector) => {
            let mgr = Manager::from_config(pg_config, tls_connector, mgr_config);
            Pool::builder(mgr)
                .max_size(config.max_connections)
                .build()
                .map_err(|e| DriftError::pool(e, context))?
        }
    };

    Ok(pool)
}

/// Connectivity of one side.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub name: String,
    pub location: String,
    pub connected: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Connectivity of both sides.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub source: ConnectionStatus,
    pub target: ConnectionStatus,
    pub healthy: bool,
}

/// Try to connect to both databases. Connection failures are reported in
/// the result, not returned as errors.
pub async fn health_check(config: &Config) -> HealthCheckResult {
    let source = check_connection("source", &config.source).await;
    let target = check_connection("target", &config.target).await;
    let healthy = source.connected && target.connected;
    HealthCheckResult {
        source,
        target,
        healthy,
    }
}

async fn check_connection(name: &str, config: &ConnectionConfig) -> ConnectionStatus {
    let start = Instant::now();
    let result = match build_pool(name, config) {
        Ok(pool) => PostgresSource::from_pool(name, pool).server_version().await,
        Err(e) => Err(e),
    };
    let latency_ms = start.elapsed().as_millis() as u64;

    let (server_version, error) = match result {
        Ok(version) => (Some(version), None),
        Err(e) => (None, Some(e.to_string())),
    };

    ConnectionStatus {
        name: name.to_string(),
        location: config.display_location(),
        connected: error.is_none(),
        latency_ms,
        server_version,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(ssl_mode: &str) -> ConnectionConfig {
        serde_yaml::from_str(&format!(
            "username: app\nserver: localhost\ndatabase: app\nssl_mode: {}\n",
            ssl_mode
        ))
        .unwrap()
    }

    #[test]
    fn test_build_pool_is_lazy() {
        let pool = build_pool("source", &connection("disable")).unwrap();
        assert_eq!(pool.status().size, 0);
        assert_eq!(pool.status().max_size, 4);
    }

    #[test]
    fn test_build_pool_rejects_bad_ssl_mode() {
        let err = build_pool("source", &connection("prefer")).unwrap_err();
        assert!(matches!(err, DriftError::Config(_)));
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let mut config = connection("disable");
        config.server = "127.0.0.1:1".into();
        let status = check_connection("target", &config).await;
        assert!(!status.connected);
        assert!(status.error.is_some());
        assert_eq!(status.location, "127.0.0.1:1/app");
    }
}
