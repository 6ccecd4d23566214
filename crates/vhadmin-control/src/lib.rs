//! HTTP control plane for LinuxGSM-managed game servers.
//!
//! Reads are recomputed from lock files and live probes on every request;
//! writes kick off the toolchain script in the background and return at once.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod outcomes;
pub mod public_ip;
pub mod reconcile;
pub mod request_meta;
pub mod state;

#[cfg(test)]
mod test_support;
