//! Deferred teardown steps for a session.

use std::fmt;

use docket_common::error::Result;

type Step = Box<dyn FnOnce() -> Result<()> + Send>;

/// An ordered list of teardown steps.
///
/// Steps run in registration order. A failing step stops the chain: it is
/// consumed, and the steps after it stay registered for the next call to
/// [`Cleanup::run`] or for drop.
#[derive(Default)]
pub struct Cleanup {
    steps: Vec<(String, Step)>,
}

impl Cleanup {
    /// An empty cleanup; running it does nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named step.
    pub fn push<F>(&mut self, name: impl Into<String>, step: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.steps.push((name.into(), Box::new(step)));
    }

    /// Number of steps still registered.
    pub fn pending(&self) -> usize {
        self.steps.len()
    }

    /// Whether no steps are registered.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs pending steps until one fails.
    ///
    /// # Errors
    ///
    /// Returns the first step error.
    pub fn run(&mut self) -> Result<()> {
        while !self.steps.is_empty() {
            let (name, step) = self.steps.remove(0);
            tracing::debug!(step = %name, "running cleanup step");
            if let Err(e) = step() {
                tracing::warn!(step = %name, error = %e, "cleanup step failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("steps", &self.steps.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        while !self.steps.is_empty() {
            if let Err(e) = self.run() {
                tracing::warn!(error = %e, "cleanup failed during drop");
            }
        }
    }
}
