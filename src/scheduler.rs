//! # Scheduler
//!
//! Platform-independent scheduling state and policy: the task table, the
//! tick counter and the round-robin selection. The arch layer drives it
//! from SysTick and PendSV; the kernel API drives it from task code.
//!
//! ## Scheduling Algorithm
//!
//! At each SysTick interrupt:
//! 1. **Count**: Increment the tick counter by one
//! 2. **Unblock**: Every Blocked application task whose wake tick has
//!    arrived becomes Ready
//! 3. **Request switch**: PendSV is pended; the switch itself runs once
//!    SysTick has returned
//!
//! In PendSV, the outgoing stack pointer is saved, the next task is picked
//! by plain round robin starting after the current slot, and the incoming
//! stack pointer is handed back to the trap. If no application task is
//! Ready, the idle slot runs.

use crate::config::{FIRST_TASK, IDLE_TASK, MAX_TASKS};
use crate::frame;
use crate::stack::StackArena;
use crate::task::{TaskControlBlock, TaskSet, TaskState};

// ---------------------------------------------------------------------------
// Scheduler struct
// ---------------------------------------------------------------------------

/// The central scheduler state. One instance lives in `kernel.rs` behind a
/// critical-section mutex.
///
/// ## Design Notes
///
/// - All tasks are stored inline in a fixed-size array (no heap)
/// - `current_task` tracks the slot whose context is resident
/// - The idle task (slot `IDLE_TASK`) is always present as a fallback
pub struct Scheduler {
    /// Fixed-size array of TCBs. Slot `IDLE_TASK` is the idle task.
    pub tasks: [TaskControlBlock; MAX_TASKS],

    /// Slot whose context is resident (or about to become resident).
    pub current_task: usize,

    /// Monotonic tick counter. 64 bits wide so it does not wrap in practice.
    pub tick_count: u64,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            tasks: [TaskControlBlock::EMPTY; MAX_TASKS],
            current_task: FIRST_TASK,
            tick_count: 0,
        }
    }

    /// Populate every slot and build its initial frame at the top of its
    /// stack region. Runs once, before the scheduler starts.
    pub fn init_tasks(&mut self, stacks: &mut StackArena, set: &TaskSet) {
        for slot in 0..MAX_TASKS {
            let entry = set.entry(slot);
            let sp = frame::init_frame(stacks.region_mut(slot).words_mut(), entry);
            self.tasks[slot].init(entry, sp);
        }
        self.current_task = FIRST_TASK;
        self.tick_count = 0;
    }

    /// Called from the SysTick handler every tick.
    ///
    /// Counts the tick and wakes due tasks. Never touches saved stack
    /// pointers; the caller requests the switch.
    pub fn tick(&mut self) {
        self.tick_count += 1;
        self.unblock_tasks();
    }

    /// Make every Blocked application task whose wake tick has arrived Ready.
    pub fn unblock_tasks(&mut self) {
        let now = self.tick_count;
        for (slot, tcb) in self.tasks.iter_mut().enumerate() {
            if slot != IDLE_TASK && tcb.is_due(now) {
                tcb.state = TaskState::Ready;
            }
        }
    }

    /// Select the next task to run.
    ///
    /// Scans forward from the slot after the current one through all
    /// slots; the first Ready application task wins. Falls back to the
    /// idle task when none is Ready.
    ///
    /// # Returns
    /// Index of the next task to run.
    pub fn select_next(&mut self) -> usize {
        let mut slot = self.current_task;
        for _ in 0..MAX_TASKS {
            slot = (slot + 1) % MAX_TASKS;
            if slot != IDLE_TASK && self.tasks[slot].is_ready() {
                self.current_task = slot;
                return slot;
            }
        }

        self.current_task = IDLE_TASK;
        IDLE_TASK
    }

    /// Block the current task for `ticks` ticks.
    ///
    /// Returns `false` (and does nothing) when the idle task is current,
    /// since idle never blocks. With `ticks == 0` the task rejoins the
    /// rotation after the next tick.
    pub fn block_current(&mut self, ticks: u32) -> bool {
        let current = self.current_task;
        if current == IDLE_TASK {
            return false;
        }

        let wake_tick = self.tick_count + u64::from(ticks);
        self.tasks[current].block_until(wake_tick);
        true
    }

    /// Save the outgoing task's stack pointer, pick the next task and
    /// return its stack pointer. Called from PendSV only.
    pub fn switch_context(&mut self, psp: *mut u32) -> *mut u32 {
        self.tasks[self.current_task].stack_pointer = psp;
        let next = self.select_next();
        self.tasks[next].stack_pointer
    }

    /// Get a reference to the current task's TCB.
    pub fn current_tcb(&self) -> &TaskControlBlock {
        &self.tasks[self.current_task]
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::STACK_WORDS;
    use crate::frame::{StackedFrame, EXC_RETURN_THREAD_PSP, FRAME_WORDS, INITIAL_XPSR};

    extern "C" fn idle() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }
    extern "C" fn task1() -> ! {
        let mut n = 1u32;
        loop {
            n = core::hint::black_box(n.wrapping_add(1));
        }
    }
    extern "C" fn task2() -> ! {
        let mut n = 2u32;
        loop {
            n = core::hint::black_box(n.wrapping_mul(3));
        }
    }
    extern "C" fn task3() -> ! {
        let mut n = 3u32;
        loop {
            n = core::hint::black_box(n ^ 0x5A);
        }
    }
    extern "C" fn task4() -> ! {
        let mut n = 4u32;
        loop {
            n = core::hint::black_box(n.rotate_left(1));
        }
    }

    fn task_set() -> TaskSet {
        TaskSet {
            idle,
            tasks: [task1, task2, task3, task4],
        }
    }

    fn started(stacks: &mut StackArena) -> Scheduler {
        let mut sched = Scheduler::new();
        sched.init_tasks(stacks, &task_set());
        sched
    }

    fn block(sched: &mut Scheduler, slot: usize, wake_tick: u64) {
        sched.tasks[slot].block_until(wake_tick);
    }

    #[test]
    fn test_initial_frames() {
        let mut stacks = StackArena::new();
        let sched = started(&mut stacks);
        let set = task_set();

        for slot in 0..MAX_TASKS {
            let tcb = &sched.tasks[slot];
            assert_eq!(tcb.state, TaskState::Ready);
            let frame = unsafe { StackedFrame::from_ptr(tcb.stack_pointer) };
            assert_eq!(frame.xpsr, INITIAL_XPSR);
            assert_eq!(frame.pc, set.entry(slot) as usize as u32);
            assert_eq!(frame.lr, EXC_RETURN_THREAD_PSP);
        }
        assert_eq!(sched.current_task, FIRST_TASK);
        assert_eq!(sched.tick_count, 0);
    }

    #[test]
    fn test_stack_isolation() {
        const SENTINEL: u32 = 0xDEAD_BEEF;
        let mut stacks = StackArena::new();
        for slot in 0..MAX_TASKS {
            stacks.region_mut(slot).words_mut().fill(SENTINEL);
        }
        let sched = started(&mut stacks);

        for slot in 0..MAX_TASKS {
            let region = stacks.region(slot);
            assert!(region.contains(sched.tasks[slot].stack_pointer));
            for other in (0..MAX_TASKS).filter(|&o| o != slot) {
                assert!(!region.contains(sched.tasks[other].stack_pointer));
            }

            // Only the top frame of each region was written
            let words = region.words();
            assert!(words[..STACK_WORDS - FRAME_WORDS].iter().all(|&w| w == SENTINEL));
            assert!(words[STACK_WORDS - FRAME_WORDS..].iter().all(|&w| w != SENTINEL));
        }
    }

    #[test]
    fn test_round_robin_order() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);

        // From task 1 all four application tasks are visited in order
        assert_eq!(sched.select_next(), 2);
        assert_eq!(sched.select_next(), 3);
        assert_eq!(sched.select_next(), 4);
        assert_eq!(sched.select_next(), 1);
        assert_eq!(sched.select_next(), 2);
    }

    #[test]
    fn test_blocked_tasks_are_skipped() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        block(&mut sched, 2, 10);
        block(&mut sched, 4, 10);

        assert_eq!(sched.select_next(), 3);
        assert_eq!(sched.select_next(), 1);
        assert_eq!(sched.select_next(), 3);
        // Idle is never chosen while an application task is Ready
        for _ in 0..8 {
            assert_ne!(sched.select_next(), IDLE_TASK);
        }
    }

    #[test]
    fn test_idle_fallback() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        for slot in 1..MAX_TASKS {
            block(&mut sched, slot, 100);
        }

        for start in 0..MAX_TASKS {
            sched.current_task = start;
            assert_eq!(sched.select_next(), IDLE_TASK);
            assert_eq!(sched.current_task, IDLE_TASK);
        }
    }

    #[test]
    fn test_solitary_task_not_starved() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        for slot in 2..MAX_TASKS {
            block(&mut sched, slot, u64::MAX);
        }

        // Only task 1 is Ready: it is re-selected, even from itself
        sched.current_task = IDLE_TASK;
        assert_eq!(sched.select_next(), 1);
        assert_eq!(sched.select_next(), 1);

        // It delays: idle runs until it wakes, then it is picked again
        assert!(sched.block_current(2));
        assert_eq!(sched.select_next(), IDLE_TASK);
        sched.tick();
        assert_eq!(sched.select_next(), IDLE_TASK);
        sched.tick();
        assert_eq!(sched.select_next(), 1);
    }

    #[test]
    fn test_tick_counts_by_one() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        for expected in 1..=1000u64 {
            sched.tick();
            assert_eq!(sched.tick_count, expected);
        }
    }

    #[test]
    fn test_unblock_exactly_at_wake_tick() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        block(&mut sched, 3, 5);

        for _ in 0..4 {
            sched.tick();
            assert_eq!(sched.tasks[3].state, TaskState::Blocked);
        }
        sched.tick();
        assert_eq!(sched.tick_count, 5);
        assert_eq!(sched.tasks[3].state, TaskState::Ready);
    }

    #[test]
    fn test_unblock_never_touches_stack_pointers() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        let before: [*mut u32; MAX_TASKS] = core::array::from_fn(|i| sched.tasks[i].stack_pointer);
        block(&mut sched, 1, 1);
        block(&mut sched, 2, 2);
        sched.tick();
        sched.tick();
        for slot in 0..MAX_TASKS {
            assert_eq!(sched.tasks[slot].stack_pointer, before[slot]);
        }
    }

    #[test]
    fn test_delay_round_trip() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        sched.tick_count = 100;
        sched.current_task = 2;

        assert!(sched.block_current(50));
        assert_eq!(sched.tasks[2].wake_tick, 150);
        assert_eq!(sched.tasks[2].state, TaskState::Blocked);

        for _ in 101..150 {
            sched.tick();
            assert_eq!(sched.tasks[2].state, TaskState::Blocked);
            assert_ne!(sched.select_next(), 2);
        }

        sched.tick();
        assert_eq!(sched.tick_count, 150);
        assert_eq!(sched.tasks[2].state, TaskState::Ready);
    }

    #[test]
    fn test_unblock_scan_ignores_idle_slot() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        block(&mut sched, IDLE_TASK, 1);
        block(&mut sched, FIRST_TASK, 1);

        sched.tick();
        assert_eq!(sched.tasks[IDLE_TASK].state, TaskState::Blocked);
        assert_eq!(sched.tasks[FIRST_TASK].state, TaskState::Ready);
    }

    #[test]
    fn test_idle_never_blocks() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        sched.current_task = IDLE_TASK;

        assert!(!sched.block_current(10));
        assert_eq!(sched.tasks[IDLE_TASK].state, TaskState::Ready);
    }

    #[test]
    fn test_zero_delay_rejoins_after_next_tick() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        for slot in 2..MAX_TASKS {
            block(&mut sched, slot, u64::MAX);
        }

        assert!(sched.block_current(0));
        assert_eq!(sched.select_next(), IDLE_TASK);
        sched.tick();
        assert_eq!(sched.select_next(), 1);
    }

    #[test]
    fn test_switch_context_saves_and_restores() {
        let mut stacks = StackArena::new();
        let mut sched = started(&mut stacks);
        let incoming = sched.tasks[2].stack_pointer;

        // Pretend task 1 ran and was preempted deeper in its stack
        let outgoing = unsafe { sched.tasks[1].stack_pointer.sub(12) };
        let next_sp = sched.switch_context(outgoing);

        assert_eq!(sched.tasks[1].stack_pointer, outgoing);
        assert_eq!(sched.current_task, 2);
        assert_eq!(next_sp, incoming);
        assert_eq!(sched.current_tcb().stack_pointer, incoming);
    }
}
