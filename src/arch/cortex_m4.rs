//! # Cortex-M4 Port Layer
//!
//! Hardware-specific code for the ARM Cortex-M4 (Thumb-2) processor.
//! Implements context switching via PendSV, SysTick timer configuration,
//! fault handling and the launch of the first task.
//!
//! ## Context Switch Mechanism
//!
//! The Cortex-M4 uses a split-stack model:
//! - **MSP** (Main Stack Pointer): Used by interrupt handlers only, once
//!   the scheduler has started
//! - **PSP** (Process Stack Pointer): Used by tasks in Thread mode
//!
//! On exception entry, the hardware automatically stacks R0–R3, R12, LR, PC,
//! and xPSR onto the process stack. The PendSV handler manually saves and
//! restores R4–R11, which completes the full context save/restore.
//!
//! ## Interrupt Priorities
//!
//! - SysTick: Priority 0xE0 — preempts PendSV, never the other way round
//! - PendSV: Priority 0xFF (lowest) — runs only when no other ISR is active
//!
//! A switch requested by SysTick is therefore serviced right after SysTick
//! returns, and the switch itself is never re-entered.

use core::arch::{asm, naked_asm};

use cortex_m::peripheral::scb::{Exception, SystemHandler};
use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::{SCB, SYST};
use cortex_m_rt::{exception, ExceptionFrame};

use crate::config::SYSTICK_RELOAD;
use crate::frame::CONTROL_THREAD_PSP;
use crate::kernel;
use crate::task::TaskEntry;

/// PendSV priority: the lowest the NVIC can express.
const PENDSV_PRIORITY: u8 = 0xFF;

/// SysTick priority: one step above PendSV with 4 implemented priority bits.
const SYSTICK_PRIORITY: u8 = 0xE0;

// ---------------------------------------------------------------------------
// SysTick configuration
// ---------------------------------------------------------------------------

/// Configure the SysTick timer for the scheduler tick.
///
/// Reloads with `SYSTEM_CLOCK_HZ / TICK_HZ - 1` on the processor clock.
/// Each tick triggers `SysTick` which calls `kernel::on_tick()`.
pub fn configure_systick(syst: &mut SYST) {
    syst.set_reload(SYSTICK_RELOAD);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_interrupt();
    syst.enable_counter();
}

// ---------------------------------------------------------------------------
// PendSV trigger
// ---------------------------------------------------------------------------

/// Request a context switch by pending PendSV.
///
/// Sets the PENDSVSET bit (28) in the Interrupt Control and State Register.
/// The switch happens once every higher-priority handler has returned and
/// interrupts are unmasked.
#[inline]
pub fn request_switch() {
    SCB::set_pendsv();
}

// ---------------------------------------------------------------------------
// System handler configuration
// ---------------------------------------------------------------------------

/// Set PendSV to the lowest priority and SysTick just above it.
pub fn set_interrupt_priorities(scb: &mut SCB) {
    // Safety: called with interrupts masked, before any task runs, so no
    // priority-based critical section can be broken.
    unsafe {
        scb.set_priority(SystemHandler::PendSV, PENDSV_PRIORITY);
        scb.set_priority(SystemHandler::SysTick, SYSTICK_PRIORITY);
    }
}

/// Enable the MemManage, BusFault and UsageFault exceptions so that each
/// fault is reported by its own handler instead of escalating to HardFault.
pub fn enable_fault_exceptions(scb: &mut SCB) {
    scb.enable(Exception::MemoryManagement);
    scb.enable(Exception::BusFault);
    scb.enable(Exception::UsageFault);
}

// ---------------------------------------------------------------------------
// First task launch
// ---------------------------------------------------------------------------

/// Switch Thread mode onto the process stack at `psp` and jump to `entry`.
///
/// Called once from `kernel::start_scheduler()` with interrupts masked;
/// interrupts are unmasked right before the jump. The first task starts
/// on an empty stack; its synthetic frame is only needed by the other
/// tasks, which are entered through PendSV.
///
/// # Safety
/// Must only be called once, with `psp` the top of the region owned by the
/// task of `entry`.
pub unsafe fn start_first_task(psp: *const u32, entry: TaskEntry) -> ! {
    asm!(
        "msr psp, {psp}",          // Set process stack pointer
        "msr control, {control}",  // CONTROL.SPSEL = 1: Thread mode uses PSP
        "isb",
        "cpsie i",                 // Enable interrupts
        "bx {entry}",              // Jump to task entry (Thumb bit set in address)
        psp = in(reg) psp,
        control = in(reg) CONTROL_THREAD_PSP,
        entry = in(reg) entry,
        options(noreturn)
    );
}

/// Stop the core. Used for unrecoverable conditions.
pub fn halt() -> ! {
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::nop();
    }
}

// ---------------------------------------------------------------------------
// PendSV handler (context switch)
// ---------------------------------------------------------------------------

/// PendSV exception handler — performs the actual context switch.
///
/// ## Sequence
/// 1. Read PSP: the hardware has already stacked R0–R3, R12, LR, PC, xPSR
/// 2. Save R4–R11 below them on the current task's stack
/// 3. `switch_context` stores the updated PSP into the current TCB, selects
///    the next task and returns its saved PSP
/// 4. Restore R4–R11 from the new task's stack
/// 5. Set PSP and return from exception (hardware restores the rest)
///
/// Only basic frames are saved and restored: the return uses the EXC_RETURN
/// PendSV was entered with. Tasks must not execute floating-point
/// instructions; FPU use sets CONTROL.FPCA, the hardware then stacks an
/// extended frame and the next task would be resumed with the wrong
/// EXC_RETURN.
///
/// # Safety
/// This is a naked function entered only by the NVIC. Until R4–R11 are
/// saved it may only touch registers the hardware has already stacked.
#[unsafe(no_mangle)]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        // --- Save current context ---
        "mrs r0, psp",             // Get current PSP
        "stmdb r0!, {{r4-r11}}",   // Push R4-R11 onto task stack (decrement before store)

        // --- Save PSP, select next task, fetch its PSP ---
        "push {{r0, lr}}",         // Keep EXC_RETURN; 8-byte aligned MSP for the call
        "bl {switch}",             // r0 = switch_context(r0)
        "pop {{r1, lr}}",

        // --- Restore new context ---
        "ldmia r0!, {{r4-r11}}",   // Pop R4-R11 from new task stack
        "msr psp, r0",             // Set PSP to new task's stack

        // Return from exception; EXC_RETURN resumes Thread mode on PSP
        "bx lr",

        switch = sym switch_context,
    );
}

/// Save the current task's stack pointer and return the next task's.
/// Called from PendSV.
extern "C" fn switch_context(psp: *mut u32) -> *mut u32 {
    kernel::switch_context(psp)
}

// ---------------------------------------------------------------------------
// SysTick handler
// ---------------------------------------------------------------------------

/// SysTick exception handler — scheduler tick entry point.
#[exception]
fn SysTick() {
    kernel::on_tick();
}

// ---------------------------------------------------------------------------
// Fault handlers
// ---------------------------------------------------------------------------

// A task whose registers or stack may be corrupted cannot be resumed, so
// every fault is terminal.

#[exception]
unsafe fn HardFault(frame: &ExceptionFrame) -> ! {
    error!(
        "hard fault in task {}: pc={:#x} lr={:#x} xpsr={:#x}",
        kernel::current_task(),
        frame.pc(),
        frame.lr(),
        frame.xpsr()
    );
    halt()
}

#[exception]
fn MemoryManagement() -> ! {
    error!("memory management fault in task {}", kernel::current_task());
    halt()
}

#[exception]
fn BusFault() -> ! {
    error!("bus fault in task {}", kernel::current_task());
    halt()
}

#[exception]
fn UsageFault() -> ! {
    error!("usage fault in task {}", kernel::current_task());
    halt()
}
