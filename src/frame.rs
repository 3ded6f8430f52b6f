//! # Context Frame
//!
//! Layout of a suspended task's saved context and the initializer that
//! synthesizes one for a task that has never run.
//!
//! ## Frame Layout (top = high address, growing down)
//!
//! ```text
//! [Hardware stacked frame]     pushed on exception entry, popped on return
//!   xPSR  (Thumb bit set)
//!   PC    (resume address / task entry point)
//!   LR    (EXC_RETURN_THREAD_PSP for a fresh task)
//!   R12
//!   R3
//!   R2
//!   R1
//!   R0
//! [Software saved context]     pushed and popped by PendSV
//!   R11
//!   R10
//!   R9
//!   R8
//!   R7
//!   R6
//!   R5
//!   R4                         <- saved stack pointer
//! ```
//!
//! A fresh frame is indistinguishable from that of a task preempted at the
//! first instruction of its entry point, so the first restore needs no
//! special case.

use crate::config::STACK_WORDS;
use crate::task::TaskEntry;

/// xPSR with only the Thumb (T) bit set.
pub const INITIAL_XPSR: u32 = 0x0100_0000;

/// EXC_RETURN: return to Thread mode, use the process stack, no FP state.
pub const EXC_RETURN_THREAD_PSP: u32 = 0xFFFF_FFFD;

/// EXC_RETURN bit 4 (FType): set for a basic frame without FP state.
pub const EXC_RETURN_BASIC_FRAME: u32 = 1 << 4;

/// CONTROL value for tasks: SPSEL = 1 (Thread mode on PSP), privileged,
/// FPCA clear.
pub const CONTROL_THREAD_PSP: u32 = 0b010;

/// Registers stacked by hardware on exception entry (R0-R3, R12, LR, PC, xPSR).
pub const HW_FRAME_WORDS: usize = 8;

/// Registers stacked by PendSV (R4-R11).
pub const SW_FRAME_WORDS: usize = 8;

/// Words in a complete saved context.
pub const FRAME_WORDS: usize = HW_FRAME_WORDS + SW_FRAME_WORDS;

/// General-purpose register slots below PC and LR in a fresh frame.
const ZEROED_REGISTERS: usize = 13;

const _: () = assert!(3 + ZEROED_REGISTERS == FRAME_WORDS);
const _: () = assert!(FRAME_WORDS <= STACK_WORDS);

/// A complete saved context, as found at a task's saved stack pointer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackedFrame {
    /// R4-R11, saved by PendSV.
    pub r4_r11: [u32; SW_FRAME_WORDS],
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    pub lr: u32,
    pub pc: u32,
    pub xpsr: u32,
}

const _: () = assert!(core::mem::size_of::<StackedFrame>() == FRAME_WORDS * 4);

impl StackedFrame {
    /// View the frame at a saved stack pointer.
    ///
    /// # Safety
    /// `sp` must point at a complete frame (`FRAME_WORDS` readable words)
    /// that is not modified for the lifetime `'a`.
    pub unsafe fn from_ptr<'a>(sp: *const u32) -> &'a StackedFrame {
        &*(sp as *const StackedFrame)
    }

    /// Whether this frame resumes Thumb code.
    pub fn is_thumb(&self) -> bool {
        self.xpsr & INITIAL_XPSR != 0
    }
}

/// Build the initial frame at the top of `stack` so the first restore
/// starts `entry`. Returns the saved stack pointer for the task.
///
/// Full-descending discipline: the pointer moves down, then the word is
/// stored. Only the top `FRAME_WORDS` words of `stack` are written.
pub fn init_frame(stack: &mut [u32; STACK_WORDS], entry: TaskEntry) -> *mut u32 {
    let mut sp = stack.len();

    sp -= 1;
    stack[sp] = INITIAL_XPSR;

    sp -= 1;
    stack[sp] = entry as usize as u32;

    sp -= 1;
    stack[sp] = EXC_RETURN_THREAD_PSP;

    for _ in 0..ZEROED_REGISTERS {
        sp -= 1;
        stack[sp] = 0;
    }

    stack[sp..].as_mut_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn entry() -> ! {
        loop {}
    }

    #[test]
    fn test_fresh_frame_contents() {
        let mut stack = [0xA5A5_A5A5u32; STACK_WORDS];
        let sp = init_frame(&mut stack, entry);

        let frame = unsafe { StackedFrame::from_ptr(sp) };
        assert_eq!(frame.xpsr, INITIAL_XPSR);
        assert!(frame.is_thumb());
        assert_eq!(frame.pc, entry as usize as u32);
        assert_eq!(frame.lr, EXC_RETURN_THREAD_PSP);
        assert_eq!(frame.r4_r11, [0; SW_FRAME_WORDS]);
        assert_eq!((frame.r0, frame.r1, frame.r2, frame.r3, frame.r12), (0, 0, 0, 0, 0));
    }

    #[test]
    fn test_frame_sits_at_top_of_stack() {
        let mut stack = [0xA5A5_A5A5u32; STACK_WORDS];
        let sp = init_frame(&mut stack, entry);

        let base = stack.as_ptr();
        assert_eq!(sp as *const u32, unsafe { base.add(STACK_WORDS - FRAME_WORDS) });

        // Nothing below the frame is touched
        assert!(stack[..STACK_WORDS - FRAME_WORDS]
            .iter()
            .all(|&w| w == 0xA5A5_A5A5));
    }

    #[test]
    fn test_exc_return_resumes_thread_on_psp_with_basic_frame() {
        // Bits 3:0 = 0b1101: return to Thread mode, restore from PSP
        assert_eq!(EXC_RETURN_THREAD_PSP & 0xF, 0b1101);
        assert_ne!(EXC_RETURN_THREAD_PSP & EXC_RETURN_BASIC_FRAME, 0);
    }

    #[test]
    fn test_task_control_value() {
        // SPSEL set, nPRIV clear, FPCA clear
        assert_eq!(CONTROL_THREAD_PSP & 0b010, 0b010);
        assert_eq!(CONTROL_THREAD_PSP & 0b001, 0);
        assert_eq!(CONTROL_THREAD_PSP & 0b100, 0);
    }

    #[test]
    fn test_frame_is_eight_byte_aligned() {
        let mut stack = [0u32; STACK_WORDS];
        let sp = init_frame(&mut stack, entry);
        let offset = sp as usize - stack.as_ptr() as usize;
        assert_eq!(offset % 8, 0);
    }
}
