//! Session lifecycle for docket.
//!
//! Everything that touches the outside world lives here: the compose tool
//! and the language toolchain are run through the [`process::CommandRunner`]
//! seam, the source mounts fragment is written to a temporary file, and the
//! [`session::Session`] ties the pieces together.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod cancel;
pub mod cleanup;
pub mod interrupt;
pub mod introspect;
pub mod locator;
pub mod process;
pub mod session;
