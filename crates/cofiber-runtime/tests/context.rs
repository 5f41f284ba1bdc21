//! Injecting a custom hardware context

use std::cell::Cell;

use cofiber_runtime::{yield_now, EntryFn, HardwareContext, NativeContext};
use cofiber_runtime::{Scheduler, SchedulerConfig};

thread_local! {
    static SWITCHES: Cell<usize> = const { Cell::new(0) };
}

/// Native switching plus a per-thread switch counter
#[derive(Default)]
#[repr(transparent)]
struct Counting(NativeContext);

unsafe impl HardwareContext for Counting {
    unsafe fn prepare(&mut self, stack_top: *mut u8, entry: EntryFn, arg: usize) {
        self.0.prepare(stack_top, entry, arg);
    }

    unsafe fn switch(from: *mut Self, to: *const Self) {
        SWITCHES.with(|c| c.set(c.get() + 1));
        NativeContext::switch(from.cast(), to.cast());
    }

    fn stack_pointer(&self) -> usize {
        self.0.stack_pointer()
    }
}

fn switches() -> usize {
    SWITCHES.with(|c| c.get())
}

#[test]
fn test_every_switch_goes_through_context() {
    let sched: Scheduler<Counting> = Scheduler::with_context(SchedulerConfig::compiled()).unwrap();

    let a = sched.spawn(|| yield_now());
    let b = sched.spawn(|| {});
    assert_eq!(switches(), 0);

    sched.run();

    // a in, a out (yield), b in, b out (death), a in, a out (death)
    assert_eq!(switches(), 6);
    assert!(a.is_finished() && b.is_finished());
}

#[test]
fn test_sole_fiber_yield_does_not_switch() {
    let sched: Scheduler<Counting> = Scheduler::with_context(SchedulerConfig::compiled()).unwrap();
    let before = switches();

    let h = sched.spawn(|| {
        for _ in 0..10 {
            yield_now();
        }
    });
    sched.join(&h).unwrap();

    assert_eq!(switches() - before, 2);
}
