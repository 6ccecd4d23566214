//! Adapters over a LinuxGSM-style toolchain.
//!
//! Nothing here talks to the toolchain through anything richer than argv,
//! exit status, captured output and the lock files it leaves behind.

pub mod command;
pub mod lock_file;
pub mod probe;

pub use command::{CommandError, CommandOutput, ServerScript};
pub use lock_file::{LockError, LockRecord};
pub use probe::{ProbeError, Prober};
