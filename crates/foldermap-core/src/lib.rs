//! Core types for foldermap.
//!
//! This crate provides the building blocks shared by the codec and sync
//! crates: typed values, filesystem bindings, traversal signals, errors and
//! container configuration.

mod binding;
mod config;
mod control;
mod error;
mod signal;
mod value;

pub use binding::{FileBinding, validate_name};
pub use config::{
    CodecKind, ConfigTable, ContainerConfig, ContainerConfigBuilder, ContainerDecl,
    ContainerKind, LeafPolicy,
};
pub use control::{IdFactory, LoopControl, LoopPosition};
pub use error::{IssueKind, SyncError, SyncIssue};
pub use signal::{PROGRESS_CHANNEL_SIZE, StepObserver, SyncProgress, SyncSignal, SyncStatus};
pub use value::{Value, ValueMap, ValueType};
