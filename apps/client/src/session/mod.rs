pub mod persistence;
pub mod store;

pub use persistence::{FileSnapshotStore, MemorySnapshotStore, SessionSnapshot, SnapshotStore};
pub use store::{Session, SessionStore};
