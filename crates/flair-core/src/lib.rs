// flair-core: Snapshot coordinator and entity views between flair-api and consumers.

pub mod command;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod error;
pub mod mapping;
pub mod model;
pub mod remote;
pub mod store;
pub mod stream;
pub mod units;
pub mod views;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{LocalPatch, Mutation, WritePlan};
pub use config::{ConnectionConfig, CoordinatorConfig, Credentials, UnitSystem};
pub use coordinator::{Coordinator, SyncStatus};
pub use error::{CoreError, FailureKind};
pub use remote::{AccountInfo, RemoteState, validate_account};
pub use store::DataStore;
pub use stream::{SnapshotStream, SnapshotWatchStream};
pub use units::TemperatureUnit;

pub use model::{Attributes, Category, DeviceRecord, Relation, Snapshot, Structure};
pub use views::{
    DeviceInfo, Entity, EntityAction, EntityCategory, EntityKind, EntityState, Platform,
    StateValue,
};
