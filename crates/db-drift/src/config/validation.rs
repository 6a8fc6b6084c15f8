//! Configuration validation.

use super::{Config, ConnectionConfig};
use crate::drivers::SslMode;
use crate::error::{DriftError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_connection("source", &config.source)?;
    validate_connection("target", &config.target)?;

    if config.source.host_and_port() == config.target.host_and_port()
        && config.source.database == config.target.database
    {
        return Err(DriftError::Config(
            "source and target cannot be the same database".into(),
        ));
    }

    if config.compare.watermark_column.trim().is_empty() {
        return Err(DriftError::Config(
            "compare.watermark_column cannot be empty".into(),
        ));
    }

    if let Some(schema) = config.compare.schemas.iter().find(|s| s.is_empty()) {
        return Err(DriftError::Config(format!(
            "compare.schemas contains an empty name: {:?}",
            schema
        )));
    }

    Ok(())
}

fn validate_connection(side: &str, conn: &ConnectionConfig) -> Result<()> {
    if conn.server.is_empty() {
        return Err(DriftError::Config(format!("{side}.server is required")));
    }
    if conn.database.is_empty() {
        return Err(DriftError::Config(format!("{side}.database is required")));
    }
    if conn.username.is_empty() {
        return Err(DriftError::Config(format!("{side}.username is required")));
    }
    if conn.ssl_mode.parse::<SslMode>().is_err() {
        return Err(DriftError::Config(format!(
            "{side}.ssl_mode must be one of {}, got '{}'",
            SslMode::VALUES.join(", "),
            conn.ssl_mode
        )));
    }
    if conn.max_connections == 0 {
        return Err(DriftError::Config(format!(
            "{side}.max_connections must be at least 1"
        )));
    }
    Ok(())
}
