//! # Scheduler Configuration
//!
//! Compile-time constants governing the task universe and the tick.
//! All limits are fixed at compile time — no dynamic allocation.

/// Number of task slots, including the idle slot.
/// This bounds the static TCB array and the stack arena. Each slot
/// consumes `STACK_SIZE` bytes of RAM.
pub const MAX_TASKS: usize = 5;

/// Slot reserved for the idle task. It is permanently Ready and is
/// selected only when no application task is.
pub const IDLE_TASK: usize = 0;

/// Slot whose context is resident when the scheduler starts.
pub const FIRST_TASK: usize = 1;

/// Per-task stack size in bytes. Must be large enough for the
/// deepest call chain plus the 16-word context frame (64 bytes).
pub const STACK_SIZE: usize = 1024;

/// Per-task stack size in 32-bit words.
pub const STACK_WORDS: usize = STACK_SIZE / core::mem::size_of::<u32>();

/// SysTick frequency in Hz. One tick is the scheduler's unit of time.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (STM32F4 reset default, 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// SysTick reload value for one tick.
pub const SYSTICK_RELOAD: u32 = SYSTEM_CLOCK_HZ / TICK_HZ - 1;

const _: () = assert!(SYSTICK_RELOAD <= 0x00FF_FFFF, "SysTick reload is 24 bits wide");
const _: () = assert!(IDLE_TASK < MAX_TASKS && FIRST_TASK < MAX_TASKS);
const _: () = assert!(FIRST_TASK != IDLE_TASK);
const _: () = assert!(STACK_SIZE % 8 == 0, "AAPCS requires 8-byte aligned stacks");
