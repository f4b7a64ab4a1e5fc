//! Session engine: applies user actions to the current snapshot.

pub mod session;

pub use session::{snapshot_feed, Session, SnapshotFeed};
