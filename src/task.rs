//! # Task Control Block
//!
//! Defines the fixed task universe. Each slot of the scheduler's task
//! table is permanently bound to one entry point and one private stack
//! region; slots are populated once at start-up and never destroyed.

use crate::config::{IDLE_TASK, MAX_TASKS};

/// Task entry point. Tasks never return.
///
/// Task bodies must not use the FPU: only the integer register context is
/// saved across a switch.
pub type TaskEntry = extern "C" fn() -> !;

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Scheduling state of a task slot.
///
/// ```text
///   ┌──────────┐      delay(ticks)     ┌──────────┐
///   │  Ready   │ ────────────────────► │ Blocked  │
///   └──────────┘                       └──────────┘
///        ▲                                  │
///        │   tick_count reaches wake_tick   │
///        └──────────────────────────────────┘
/// ```
///
/// The idle slot is always `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskState {
    /// Eligible for selection by the scheduling policy.
    Ready,
    /// Waiting for the tick counter to reach `wake_tick`.
    Blocked,
}

// ---------------------------------------------------------------------------
// Task set (collaborator contract)
// ---------------------------------------------------------------------------

/// Entry points supplied by the application: one for the idle slot and
/// one per application slot, in slot order.
#[derive(Clone, Copy)]
pub struct TaskSet {
    /// Runs whenever no application task is Ready.
    pub idle: TaskEntry,
    /// Application tasks, occupying every slot but `IDLE_TASK`, in order.
    pub tasks: [TaskEntry; MAX_TASKS - 1],
}

impl TaskSet {
    /// Entry point bound to `slot`.
    pub fn entry(&self, slot: usize) -> TaskEntry {
        match app_index(slot, IDLE_TASK) {
            Some(i) => self.tasks[i],
            None => self.idle,
        }
    }
}

/// Position of `slot` in the application entries, which fill every slot
/// except `idle` in ascending order. `None` for the idle slot itself.
fn app_index(slot: usize, idle: usize) -> Option<usize> {
    match slot {
        s if s == idle => None,
        s if s < idle => Some(s),
        s => Some(s - 1),
    }
}

// ---------------------------------------------------------------------------
// Task Control Block
// ---------------------------------------------------------------------------

/// Per-slot task record.
pub struct TaskControlBlock {
    /// Saved process stack pointer. Points at the bottom of the 16-word
    /// frame describing the task whenever the task is not resident.
    /// Written only by the context switch.
    pub stack_pointer: *mut u32,

    /// Tick at which a Blocked task becomes Ready again.
    pub wake_tick: u64,

    /// Current scheduling state.
    pub state: TaskState,

    /// Entry point; immutable once the slot is populated.
    pub entry: TaskEntry,
}

// Safety: `stack_pointer` only ever points into the task's own region of
// the static stack arena, and the TCB is only accessed inside a critical
// section or from the (non re-entrant) context switch.
unsafe impl Send for TaskControlBlock {}
unsafe impl Sync for TaskControlBlock {}

impl TaskControlBlock {
    /// An unpopulated slot. Used to initialize the static table.
    pub const EMPTY: Self = Self {
        stack_pointer: core::ptr::null_mut(),
        wake_tick: 0,
        state: TaskState::Ready,
        entry: unassigned,
    };

    /// Bind this slot to `entry` with a freshly built frame at `stack_pointer`.
    pub fn init(&mut self, entry: TaskEntry, stack_pointer: *mut u32) {
        self.entry = entry;
        self.stack_pointer = stack_pointer;
        self.wake_tick = 0;
        self.state = TaskState::Ready;
    }

    /// Block until the tick counter reaches `wake_tick`.
    pub fn block_until(&mut self, wake_tick: u64) {
        self.wake_tick = wake_tick;
        self.state = TaskState::Blocked;
    }

    /// Check if this task is eligible for selection.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == TaskState::Ready
    }

    /// Check if a Blocked task is due at `tick_count`.
    #[inline]
    pub fn is_due(&self, tick_count: u64) -> bool {
        self.state == TaskState::Blocked && tick_count >= self.wake_tick
    }
}

/// Placeholder entry for slots that have not been populated.
extern "C" fn unassigned() -> ! {
    loop {
        core::hint::spin_loop();
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
