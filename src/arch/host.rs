//! Host port, used when the crate is built for the development machine.
//!
//! There is no PendSV to pend; a switch request is latched in a flag so
//! tests can observe it.

use core::sync::atomic::{AtomicBool, Ordering};

static SWITCH_PENDING: AtomicBool = AtomicBool::new(false);

/// Latch a context-switch request.
pub fn request_switch() {
    SWITCH_PENDING.store(true, Ordering::SeqCst);
}

/// Consume the latched request, returning whether one was pending.
pub fn take_switch_request() -> bool {
    SWITCH_PENDING.swap(false, Ordering::SeqCst)
}
