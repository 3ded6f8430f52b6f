//! # Kernel
//!
//! Top-level initialization and public API.
//!
//! The kernel owns the single scheduler context and the stack arena. Task
//! code reaches the scheduler only through `delay()` and the read-only
//! accessors below; the arch layer reaches it through `on_tick()` and
//! `switch_context()`. Every access happens inside a critical section.
//!
//! ## Startup Sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         └─► kernel::start_scheduler()   ← no return
//!               ├─► kernel::init()         ← build every task's frame
//!               ├─► Enable fault exceptions
//!               ├─► Set PendSV/SysTick priorities
//!               ├─► Configure SysTick
//!               └─► Switch to the first task's PSP and jump to it
//! ```

use core::cell::RefCell;
use core::ptr::addr_of_mut;

use critical_section::Mutex;

use crate::arch;
use crate::config::MAX_TASKS;
use crate::error::KernelError;
use crate::scheduler::Scheduler;
use crate::stack::StackArena;
use crate::task::{TaskSet, TaskState};

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

/// Global scheduler context, shared by task code, SysTick and PendSV.
static SCHEDULER: Mutex<RefCell<Scheduler>> = Mutex::new(RefCell::new(Scheduler::new()));

/// Set once the task table has been built.
static INITIALIZED: Mutex<RefCell<bool>> = Mutex::new(RefCell::new(false));

/// Private stack regions for every slot.
///
/// # Safety
/// Borrowed mutably exactly once, by `init()`; afterwards each region is
/// only touched by its own task and by the context switch.
static mut TASK_STACKS: StackArena = StackArena::new();

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Build the task table: bind every slot to its entry point and place an
/// initial frame at the top of its stack region.
///
/// # Returns
/// - `Ok(())` on the first call.
/// - `Err(KernelError::AlreadyInitialized)` on any later call; the task
///   set is fixed for the lifetime of the program.
pub fn init(set: &TaskSet) -> Result<(), KernelError> {
    critical_section::with(|cs| {
        let mut initialized = INITIALIZED.borrow_ref_mut(cs);
        if *initialized {
            return Err(KernelError::AlreadyInitialized);
        }

        // Safety: guarded by INITIALIZED, so this is the only mutable
        // borrow of the arena that is ever created.
        let stacks = unsafe { &mut *addr_of_mut!(TASK_STACKS) };
        SCHEDULER.borrow_ref_mut(cs).init_tasks(stacks, set);
        *initialized = true;
        debug!("task table built: {} slots", MAX_TASKS);
        Ok(())
    })
}

/// Whether `init()` has completed.
pub fn is_initialized() -> bool {
    critical_section::with(|cs| *INITIALIZED.borrow_ref(cs))
}

/// Start the scheduler. **Does not return.**
///
/// Builds the task table, enables fault reporting, configures the tick and
/// transfers control to the first task. After this call the system is
/// fully preemptive.
///
/// If the task table cannot be built the error is logged and the core
/// halts.
#[cfg(target_arch = "arm")]
pub fn start_scheduler(mut core_peripherals: cortex_m::Peripherals, set: &TaskSet) -> ! {
    use crate::arch::cortex_m4;
    use crate::config::{SYSTICK_RELOAD, TICK_HZ};

    // Nothing may preempt us until thread mode runs on the first task's PSP
    cortex_m::interrupt::disable();

    if let Err(e) = init(set) {
        error!("scheduler start failed: {}", e);
        cortex_m4::halt();
    }

    cortex_m4::enable_fault_exceptions(&mut core_peripherals.SCB);
    cortex_m4::set_interrupt_priorities(&mut core_peripherals.SCB);
    cortex_m4::configure_systick(&mut core_peripherals.SYST);

    let (first, entry) = critical_section::with(|cs| {
        let scheduler = SCHEDULER.borrow_ref(cs);
        (scheduler.current_task, scheduler.current_tcb().entry)
    });
    info!(
        "starting scheduler: first task {}, {} Hz tick, reload {}",
        first,
        TICK_HZ,
        SYSTICK_RELOAD
    );

    // Safety: the arena region of `first` is not yet in use, and it is
    // only ever used as that task's stack from here on.
    let psp_top = unsafe { (*addr_of_mut!(TASK_STACKS)).region(first).top() };
    unsafe { cortex_m4::start_first_task(psp_top, entry) }
}

/// Block the calling task for `ticks` ticks and switch away from it.
///
/// The task becomes Ready at tick `now() + ticks` and runs again at a later
/// selection. A call from the idle task is a no-op. With `ticks == 0` the
/// task yields and rejoins the rotation after the next tick.
pub fn delay(ticks: u32) {
    trace!("delay for {} ticks", ticks);
    critical_section::with(|cs| {
        if SCHEDULER.borrow_ref_mut(cs).block_current(ticks) {
            arch::request_switch();
        }
    });
}

/// Ticks elapsed since the scheduler started.
pub fn now() -> u64 {
    critical_section::with(|cs| SCHEDULER.borrow_ref(cs).tick_count)
}

/// Slot of the task currently running.
pub fn current_task() -> usize {
    critical_section::with(|cs| SCHEDULER.borrow_ref(cs).current_task)
}

/// Scheduling state of `slot`, or `None` if there is no such slot.
pub fn task_state(slot: usize) -> Option<TaskState> {
    critical_section::with(|cs| SCHEDULER.borrow_ref(cs).tasks.get(slot).map(|t| t.state))
}

// ---------------------------------------------------------------------------
// Arch entry points
// ---------------------------------------------------------------------------

/// Tick handler body: count the tick, wake due tasks, request a switch.
#[cfg_attr(not(target_arch = "arm"), allow(dead_code))]
pub(crate) fn on_tick() {
    critical_section::with(|cs| SCHEDULER.borrow_ref_mut(cs).tick());
    arch::request_switch();
}

/// Context-switch body: persist the outgoing PSP, select the next task and
/// return the incoming PSP.
#[cfg_attr(not(target_arch = "arm"), allow(dead_code))]
pub(crate) fn switch_context(psp: *mut u32) -> *mut u32 {
    critical_section::with(|cs| SCHEDULER.borrow_ref_mut(cs).switch_context(psp))
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
