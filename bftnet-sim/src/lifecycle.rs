use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot termination signal.
///
/// Starts open and can be closed exactly once; later and concurrent close
/// attempts are no-ops.
#[derive(Debug, Default)]
pub struct Shutdown {
    closed: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the signal. Returns `true` only for the caller that closed it.
    pub fn close(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
