//! What a test body can ask about its docket environment.

use docket_common::error::{DocketError, Result};
use docket_runtime::session::Session;

/// Handle passed to the test body.
///
/// Inside a delegated run the mode is unset: the copy of the test running
/// in the container is not itself driven by docket.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocketContext<'a> {
    session: Option<&'a Session>,
}

impl<'a> DocketContext<'a> {
    /// A context with no active mode.
    #[must_use]
    pub const fn inactive() -> Self {
        Self { session: None }
    }

    /// A context backed by `session`.
    #[must_use]
    pub const fn active(session: &'a Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Active mode, if any.
    pub fn mode(&self) -> Option<&'a str> {
        self.session.map(Session::mode)
    }

    /// Host port published for `service`'s `container_port`.
    ///
    /// # Errors
    ///
    /// Returns [`DocketError::NoActiveMode`] when docket is inactive, or the
    /// session's lookup error.
    pub fn published_port(&self, service: &str, container_port: u16) -> Result<u16> {
        self.session
            .ok_or(DocketError::NoActiveMode)?
            .port(service, container_port)
    }
}
