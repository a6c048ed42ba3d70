// ── Domain model ──
//
// Plain data mirrored from the Flair cloud: structures and the records
// underneath them. Attributes stay vendor-shaped; typed interpretation
// happens in the entity views.

pub mod record;
pub mod snapshot;

pub use record::{Attributes, Category, DeviceRecord, Relation};
pub use snapshot::{Snapshot, Structure};
