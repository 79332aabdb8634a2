#![warn(clippy::pedantic)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! Module installation with backup and rollback for modinstall
//!
//! This crate drives one installation run end to end: fetch the source
//! archive into a private staging directory, extract it, identify the
//! package, back up any installed copy, swap the new files into place and
//! apply pending migrations. If migrations fail the previous version is
//! restored.

mod api;
mod discovery;
mod installer;
mod lock;
mod staging;
mod swap;

pub use discovery::migration_candidates;
pub use installer::Installer;
pub use lock::{PackageLock, PackageLocks};
pub use staging::StagingGuard;

// Re-export the public API surface from api module
pub use api::config::InstallConfig;
pub use api::context::InstallContext;

// Re-export EventSender for use by contexts
pub use modinstall_events::EventSender;
