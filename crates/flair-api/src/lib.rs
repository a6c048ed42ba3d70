// flair-api: async client for the Flair cloud REST API.

pub mod auth;
pub mod client;
pub mod error;
pub mod resource;
pub mod transport;

// ── Primary re-exports ──────────────────────────────────────────────
pub use auth::ClientCredentials;
pub use client::{DEFAULT_BASE_URL, FlairClient};
pub use error::Error;
pub use resource::{
    AccountSummary, FlairData, Relationship, RelationshipData, Resource, ResourceIdentifier,
    ResourceKind, StructureData,
};
pub use transport::TransportConfig;
