//! Core abstractions shared by the catalog, the comparator and the drivers.
//!
//! - [`descriptor`]: table shape descriptors and the schema map
//! - [`identifier`]: identifier validation and quoting
//! - [`traits`]: metadata and row-diff seams implemented by drivers

pub mod descriptor;
pub mod identifier;
pub mod traits;

pub use descriptor::{SchemaMap, TableDescriptor, TableInfoRow};
pub use traits::{MetadataSource, RowDiffEngine};
