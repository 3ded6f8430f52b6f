//! # Stack Arena
//!
//! Private, fixed-size stack regions, one per task slot. The arena is a
//! single static placed in `.bss` by the linker; regions are disjoint
//! array elements, so a region can only be reached through its own slot.
//! The handler stack (MSP) is reserved separately at the top of RAM.

use crate::config::{MAX_TASKS, STACK_WORDS};

/// One task's stack region. Aligned to 8 bytes as required by ARM AAPCS.
#[repr(C, align(8))]
pub struct TaskStack {
    words: [u32; STACK_WORDS],
}

impl TaskStack {
    pub const fn new() -> Self {
        Self {
            words: [0; STACK_WORDS],
        }
    }

    /// The region as words, lowest address first.
    pub fn words(&self) -> &[u32; STACK_WORDS] {
        &self.words
    }

    pub fn words_mut(&mut self) -> &mut [u32; STACK_WORDS] {
        &mut self.words
    }

    /// One past the highest word of the region (the empty full-descending stack).
    pub fn top(&self) -> *const u32 {
        self.words.as_ptr_range().end
    }

    /// Whether `sp` lies within this region (the top itself included).
    pub fn contains(&self, sp: *const u32) -> bool {
        let range = self.words.as_ptr_range();
        sp >= range.start && sp <= range.end
    }
}

impl Default for TaskStack {
    fn default() -> Self {
        Self::new()
    }
}

/// All task stack regions, indexed by slot.
#[repr(C)]
pub struct StackArena {
    stacks: [TaskStack; MAX_TASKS],
}

impl StackArena {
    pub const fn new() -> Self {
        Self {
            stacks: [const { TaskStack::new() }; MAX_TASKS],
        }
    }

    pub fn region(&self, slot: usize) -> &TaskStack {
        &self.stacks[slot]
    }

    pub fn region_mut(&mut self, slot: usize) -> &mut TaskStack {
        &mut self.stacks[slot]
    }
}

impl Default for StackArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regions_are_disjoint_and_aligned() {
        let arena = StackArena::new();
        for i in 0..MAX_TASKS {
            let a = arena.region(i).words().as_ptr_range();
            assert_eq!(a.start as usize % 8, 0);
            assert_eq!(a.end as usize % 8, 0);
            for j in (i + 1)..MAX_TASKS {
                let b = arena.region(j).words().as_ptr_range();
                assert!(a.end <= b.start || b.end <= a.start);
            }
        }
    }

    #[test]
    fn test_contains() {
        let arena = StackArena::new();
        let stack = arena.region(1);
        assert!(stack.contains(stack.top()));
        assert!(stack.contains(stack.words().as_ptr()));
        assert!(!stack.contains(arena.region(0).words().as_ptr()));
        assert!(!stack.contains(arena.region(2).top()));
    }
}
