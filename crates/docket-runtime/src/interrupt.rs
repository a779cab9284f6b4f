//! Interrupt forwarding for foreground child processes.
//!
//! While a streamed child runs, Ctrl-C must reach the child (it shares our
//! process group) without killing docket before it can clean up. The first
//! live guard swaps the SIGINT disposition for a handler that does nothing;
//! the last one to drop restores the disposition that was active before.
//! A caught signal is reset to its default across `exec`, so the child keeps
//! normal interrupt delivery, which would not be the case with `SIG_IGN`.
//!
//! Guards may overlap (several sessions in one process) and drop in any
//! order.

#[cfg(unix)]
use std::sync::{Mutex, PoisonError};

#[cfg(unix)]
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

#[cfg(unix)]
extern "C" fn swallow_interrupt(_signal: libc::c_int) {}

/// Live guard count and the disposition to restore when it returns to zero.
#[cfg(unix)]
struct Installed {
    guards: usize,
    previous: Option<SigAction>,
}

#[cfg(unix)]
static INSTALLED: Mutex<Installed> = Mutex::new(Installed {
    guards: 0,
    previous: None,
});

/// Keeps SIGINT swallowed while alive.
#[derive(Debug)]
pub struct InterruptGuard {
    _private: (),
}

impl InterruptGuard {
    /// Starts swallowing SIGINT for this process, unless another guard
    /// already does.
    #[cfg(unix)]
    #[must_use]
    pub fn install() -> Self {
        let mut installed = INSTALLED.lock().unwrap_or_else(PoisonError::into_inner);
        if installed.guards == 0 {
            let action = SigAction::new(
                SigHandler::Handler(swallow_interrupt),
                SaFlags::SA_RESTART,
                SigSet::empty(),
            );
            // SAFETY: the handler touches no state, so it is async-signal-safe.
            installed.previous = match unsafe { sigaction(Signal::SIGINT, &action) } {
                Ok(previous) => Some(previous),
                Err(e) => {
                    tracing::warn!(error = %e, "could not install interrupt handler");
                    None
                }
            };
            tracing::trace!("interrupts forwarded to child");
        }
        installed.guards += 1;
        Self { _private: () }
    }

    /// Starts swallowing SIGINT for this process.
    #[cfg(not(unix))]
    #[must_use]
    pub fn install() -> Self {
        Self { _private: () }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            let mut installed = INSTALLED.lock().unwrap_or_else(PoisonError::into_inner);
            installed.guards = installed.guards.saturating_sub(1);
            if installed.guards > 0 {
                return;
            }
            if let Some(previous) = installed.previous.take() {
                // SAFETY: restores the disposition that was active before the first guard.
                if let Err(e) = unsafe { sigaction(Signal::SIGINT, &previous) } {
                    tracing::warn!(error = %e, "could not restore interrupt handler");
                }
            }
        }
    }
}
