// ── Snapshot store ──
//
// Lock-free snapshot storage with push-based change notification.

mod data_store;

pub use data_store::DataStore;
