//! # rrsched Demo Firmware
//!
//! Four application tasks run at different periods on top of the idle
//! task:
//!
//! | Slot | Task | Period |
//! |------|------|--------|
//! | 0 | `idle_task` | — (waits for interrupt) |
//! | 1 | `task1_handler` | 1000 ticks |
//! | 2 | `task2_handler` | 500 ticks |
//! | 3 | `task3_handler` | 250 ticks |
//! | 4 | `task4_handler` | 125 ticks |
//!
//! Each task does a unit of work (here: logging its activation count) and
//! then delays. With all four blocked most of the time, the idle task keeps
//! the core asleep between ticks. Build with `--features defmt` to see the
//! activity over RTT.

#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]

#[cfg(target_arch = "arm")]
mod firmware {
    use cortex_m_rt::entry;
    use panic_halt as _;

    #[cfg(feature = "defmt")]
    use defmt_rtt as _;

    use rrsched::arch::cortex_m4;
    use rrsched::kernel;
    use rrsched::task::TaskSet;

    // -----------------------------------------------------------------------
    // Task entry points
    // -----------------------------------------------------------------------

    /// Idle task: sleeps until the next interrupt. Never blocks.
    extern "C" fn idle_task() -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }

    /// Run `work` every `period` ticks, forever.
    fn periodic(period: u32, work: impl Fn(u32)) -> ! {
        let mut activations: u32 = 0;
        loop {
            activations = activations.wrapping_add(1);
            work(activations);
            kernel::delay(period);
        }
    }

    extern "C" fn task1_handler() -> ! {
        periodic(1000, |_n| {
            #[cfg(feature = "defmt")]
            defmt::info!("task 1: activation {} at tick {}", _n, kernel::now());
        })
    }

    extern "C" fn task2_handler() -> ! {
        periodic(500, |_n| {
            #[cfg(feature = "defmt")]
            defmt::info!("task 2: activation {} at tick {}", _n, kernel::now());
        })
    }

    extern "C" fn task3_handler() -> ! {
        periodic(250, |_n| {
            #[cfg(feature = "defmt")]
            defmt::info!("task 3: activation {} at tick {}", _n, kernel::now());
        })
    }

    extern "C" fn task4_handler() -> ! {
        periodic(125, |_n| {
            #[cfg(feature = "defmt")]
            defmt::debug!("task 4: activation {} at tick {}", _n, kernel::now());
        })
    }

    // -----------------------------------------------------------------------
    // Main entry point
    // -----------------------------------------------------------------------

    /// Firmware entry point. Hands the task set to the scheduler; does not
    /// return.
    #[entry]
    fn main() -> ! {
        let Some(cp) = cortex_m::Peripherals::take() else {
            cortex_m4::halt()
        };

        let tasks = TaskSet {
            idle: idle_task,
            tasks: [task1_handler, task2_handler, task3_handler, task4_handler],
        };

        kernel::start_scheduler(cp, &tasks)
    }
}

#[cfg(not(target_arch = "arm"))]
fn main() {
    println!("rrsched-demo is firmware; build it with --target thumbv7em-none-eabihf");
}
