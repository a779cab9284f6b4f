//! # docket-sdk
//!
//! Entry points for tests that need a compose environment.
//!
//! - [`run`](harness::run) / [`run_prefix`](harness::run_prefix): run a test
//!   in the environment selected by `DOCKET_MODE`, or directly when it is
//!   unset.
//! - [`DocketContext`](context::DocketContext): mode and published ports,
//!   available inside the test body.
//! - [`RunnerFlags`](flags::RunnerFlags): the selection and verbosity of the
//!   current test binary, forwarded to delegated runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use docket_sdk::harness::run;
//!
//! run("TestCache", |ctx| {
//!     if let Ok(port) = ctx.published_port("redis", 6379) {
//!         println!("redis on {port}");
//!     }
//! })
//! .expect("docket run");
//! ```

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod context;
pub mod flags;
pub mod harness;

pub use context::DocketContext;
pub use flags::RunnerFlags;
pub use harness::{run, run_prefix};
