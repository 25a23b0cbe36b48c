//! snapclone Test & Validation
//!
//! End-to-end clone scenarios against in-memory devices, plus property-based
//! tests of history ordering, common-snapshot resolution and the clone
//! orchestrator.

pub mod harness;
pub mod proptest_clone;
pub mod proptest_resolver;
pub mod scenarios;

pub use harness::{
    apfs_volume, devices, history, snapshot_at, snapshot_numbered, DEFAULT_VARIANT, SOURCE_ID,
};
