//! # Architecture Abstraction Layer
//!
//! The boundary between the platform-independent scheduler and the CPU.
//! A port provides `request_switch()`; the Cortex-M4 port additionally
//! owns the context-switch trap, the tick handler, the fault handlers and
//! the launch of the first task. Interrupt masking goes through the
//! `critical-section` implementation selected for the target.

#[cfg(target_arch = "arm")]
pub mod cortex_m4;
#[cfg(target_arch = "arm")]
pub use cortex_m4::request_switch;

#[cfg(not(target_arch = "arm"))]
pub mod host;
#[cfg(not(target_arch = "arm"))]
pub use host::request_switch;
