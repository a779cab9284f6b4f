//! # docket-compose
//!
//! Pure orchestration logic for docket sessions. Nothing in this crate
//! spawns a process.
//!
//! Handles:
//! - **Files**: discovery and deterministic ordering of environment definition files.
//! - **Model**: the subset of the merged compose configuration docket reads and writes.
//! - **Roles**: classification of services through the role label.
//! - **Mounts**: the source mounts plan and the compose fragment that applies it.
//! - **Selection**: translation of a test identity into an anchored selection pattern.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod files;
pub mod model;
pub mod mounts;
pub mod roles;
pub mod selection;
