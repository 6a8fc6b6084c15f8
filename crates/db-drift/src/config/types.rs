//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Schemas that never take part in a comparison.
pub const SYSTEM_SCHEMAS: &[&str] = &["pg_catalog", "information_schema", "sqitch"];

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database connection.
    pub source: ConnectionConfig,

    /// Target database connection.
    pub target: ConnectionConfig,

    /// Comparison behavior.
    #[serde(default)]
    pub compare: CompareConfig,
}

/// Connection parameters for one side of the comparison.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Username.
    pub username: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Database host, optionally with `:port`.
    pub server: String,

    /// Database port (default: 5432). A port given in `server` wins.
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// SSL mode: disable, require, verify-ca or verify-full (default: "disable").
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,

    /// Maximum pooled connections (default: 4).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

// Keep credentials out of logs.
impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl ConnectionConfig {
    /// Host and port, honoring a `host:port` form of `server`.
    ///
    /// IPv6 addresses take a port only in bracketed form (`[::1]:6543`);
    /// a bare address such as `fe80::1` is used whole with `port`.
    pub fn host_and_port(&self) -> (&str, u16) {
        let server = self.server.as_str();
        if let Some(rest) = server.strip_prefix('[') {
            if let Some((host, tail)) = rest.split_once(']') {
                let port = tail
                    .strip_prefix(':')
                    .and_then(|p| p.parse::<u16>().ok())
                    .unwrap_or(self.port);
                return (host, port);
            }
        }
        if let Some((host, port)) = server.rsplit_once(':') {
            if !host.contains(':') {
                if let Ok(port) = port.parse::<u16>() {
                    return (host, port);
                }
            }
        }
        (server, self.port)
    }

    /// Human-readable location without credentials, e.g. `db.local:5432/app`.
    pub fn display_location(&self) -> String {
        let (host, port) = self.host_and_port();
        if host.contains(':') {
            format!("[{}]:{}/{}", host, port, self.database)
        } else {
            format!("{}:{}/{}", host, port, self.database)
        }
    }
}

/// Comparison behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Schemas to compare. Empty means every non-system schema.
    #[serde(default)]
    pub schemas: Vec<String>,

    /// Extra schemas to ignore on both sides, on top of [`SYSTEM_SCHEMAS`].
    #[serde(default)]
    pub exclude_schemas: Vec<String>,

    /// Stop at the first disqualifying outcome (default: true).
    #[serde(default = "default_true")]
    pub break_on_diff: bool,

    /// Count target-only schemas and tables as drift (default: false).
    #[serde(default)]
    pub fail_on_extra: bool,

    /// Name of the update-watermark column (default: "date_updated").
    #[serde(default = "default_watermark_column")]
    pub watermark_column: String,

    /// Leave the watermark column out of row content comparison (default: false).
    #[serde(default)]
    pub exclude_watermark: bool,

    /// Append row differences to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            schemas: Vec::new(),
            exclude_schemas: Vec::new(),
            break_on_diff: true,
            fail_on_extra: false,
            watermark_column: default_watermark_column(),
            exclude_watermark: false,
            output_file: None,
        }
    }
}

impl CompareConfig {
    /// Every schema the catalogs must drop: built-ins plus configured ones.
    pub fn excluded_schemas(&self) -> Vec<String> {
        SYSTEM_SCHEMAS
            .iter()
            .map(|s| s.to_string())
            .chain(self.exclude_schemas.iter().cloned())
            .collect()
    }
}

// Default value functions for serde
fn default_pg_port() -> u16 {
    5432
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_max_connections() -> usize {
    4
}

fn default_watermark_column() -> String {
    "date_updated".to_string()
}

fn default_true() -> bool {
    true
}
