//! Forward and reverse reconciliation between the four project trees.
//!
//! Forward: clean tree + new files + patches -> working tree.
//! Reverse: working tree vs clean tree -> patches + new files.

pub mod errors;
pub mod filter;
pub mod layout;
pub mod ledger;
pub mod reconcile;

pub use errors::WorkspaceError;
pub use filter::{is_hidden, PathFilter, PatternError};
pub use layout::{strip_patch_extension, Locations, WorkspaceLayout, PATCH_EXTENSION};
pub use ledger::FetchLedger;
pub use reconcile::{
    reconcile_forward, reconcile_reverse, CleanStatus, ForwardReport, ReverseReport, Workspace,
};
