//! Git integration layer.
//!
//! This module wraps the actual backend implementation (`git2_backend`)
//! and re-exports only the handle the pipeline works with.
//!
//! The rest of the crate never touches the filesystem of the history
//! repository directly; everything goes through [`SnapshotRepo`].

mod git2_backend;

pub use git2_backend::{SnapshotRepo, WriteOutcome};
