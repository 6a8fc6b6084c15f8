//! Database drivers.
//!
//! - [`postgres`]: metadata source and row-diff engine for PostgreSQL
//! - [`tls`]: TLS connector setup shared by every PostgreSQL pool

pub mod postgres;
pub mod tls;

pub use tls::{SslMode, TlsBuilder};
