//! Accept-header content negotiation for versioned REST resources.
//!
//! Resources declare an ordered version list and a representation prefix;
//! clients pick a representation with
//! `Accept: application/{prefix}.{version}+json`. The latest version is
//! served natively by the resource store, older ones by registered
//! transforms.

pub mod api;
pub mod errors;
pub mod settings;
pub mod store;
pub mod system;
pub mod versioning;

pub use errors::{AppError, ConfigError};
pub use store::{ActionInput, MemoryStore, ResourceStore};
pub use versioning::{ActionKind, ApiVersioning, ResourceDefinition, TransformRegistry};
