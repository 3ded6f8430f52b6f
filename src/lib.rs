//! # rrsched — Round-Robin Preemptive Scheduler
//!
//! A tick-driven, preemptive round-robin task scheduler for ARM Cortex-M4
//! microcontrollers. A fixed set of statically allocated tasks shares one
//! register set; each task owns a private stack region.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                    Application Tasks                    │
//! ├────────────────────────────────────────────────────────┤
//! │                 Kernel API (kernel.rs)                  │
//! │      start_scheduler() · delay() · now() · current_task()│
//! ├───────────────────────────┬────────────────────────────┤
//! │  Scheduler (scheduler.rs) │  Context Frame (frame.rs)  │
//! │  ─ tick() / unblock       │  ─ init_frame()            │
//! │  ─ select_next()          │  ─ StackedFrame            │
//! │  ─ block_current()        │  Stack Arena (stack.rs)    │
//! ├───────────────────────────┴────────────────────────────┤
//! │              Task Model (task.rs)                       │
//! │         TCB · TaskState · TaskSet                       │
//! ├────────────────────────────────────────────────────────┤
//! │            Arch Port (arch/cortex_m4.rs)                │
//! │    PendSV · SysTick · Faults · First task launch       │
//! ├────────────────────────────────────────────────────────┤
//! │         ARM Cortex-M4 Hardware (Thumb-2)                │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Scheduling Model
//!
//! - SysTick fires at `TICK_HZ`, counts the tick, wakes every Blocked task
//!   whose wake tick has arrived and pends PendSV.
//! - PendSV saves R4–R11 of the running task on its own stack, selects the
//!   next Ready task in slot order after the current one and restores it.
//! - `delay(ticks)` blocks the caller and pends PendSV immediately.
//! - Slot 0 is the idle task. It is always Ready and runs only when no
//!   application task is.
//!
//! ## Memory Model
//!
//! - **No heap**: All state is statically allocated
//! - **No `alloc`**: Pure `core` only
//! - **Fixed-size TCB array**: `[TaskControlBlock; MAX_TASKS]`
//! - **Per-task stack**: one `STACK_SIZE` region per slot in a static arena
//! - **Critical sections**: `critical_section::with()` for shared state
//!
//! The data model and policy build for the host, where they are unit
//! tested; the arch port is compiled for `target_arch = "arm"` only.

#![no_std]

#[macro_use]
mod fmt;

pub mod arch;
pub mod config;
pub mod error;
pub mod frame;
pub mod kernel;
pub mod scheduler;
pub mod stack;
pub mod task;

pub use error::KernelError;
pub use kernel::{current_task, delay, now};
pub use task::{TaskEntry, TaskSet};
