use std::cell::RefCell;
use std::rc::Rc;

use cofiber::{current_id, is_in_fiber, join, spawn, try_spawn, yield_now};
use cofiber::{FiberId, Runtime, SchedError, SchedulerConfig};

#[test]
fn test_block_on_runs_everything() {
    let runtime = Runtime::new(SchedulerConfig::compiled()).unwrap();
    let out = Rc::new(RefCell::new(Vec::new()));

    let handles = runtime.block_on(|| {
        ["abc", "efg"]
            .into_iter()
            .map(|name| {
                let out = Rc::clone(&out);
                spawn(move || {
                    for i in 0..2 {
                        out.borrow_mut().push(format!("{} : {}", name, i));
                        yield_now();
                    }
                })
            })
            .collect::<Vec<_>>()
    });

    assert!(handles.iter().all(|h| h.is_finished()));
    assert_eq!(
        *out.borrow(),
        ["abc : 0", "efg : 0", "abc : 1", "efg : 1"]
    );
    assert_eq!(runtime.scheduler().live_count(), 0);
}

#[test]
fn test_free_functions_on_root() {
    let _runtime = Runtime::new(SchedulerConfig::compiled()).unwrap();
    assert!(!is_in_fiber());
    assert_eq!(current_id(), FiberId::NONE);

    let seen = Rc::new(RefCell::new(FiberId::NONE));
    let s = Rc::clone(&seen);
    let h = spawn(move || {
        assert!(is_in_fiber());
        *s.borrow_mut() = current_id();
    });

    join(&h).unwrap();
    assert_eq!(*seen.borrow(), h.id());
}

#[test]
fn test_try_spawn_reports_capacity() {
    let _runtime = Runtime::new(SchedulerConfig::compiled().max_fibers(1)).unwrap();
    let h = try_spawn(|| {}).unwrap();
    assert_eq!(
        try_spawn(|| {}).unwrap_err(),
        SchedError::CapacityExceeded { capacity: 1 }
    );
    join(&h).unwrap();
    assert!(try_spawn(|| {}).is_ok());
}

#[test]
fn test_try_spawn_without_runtime() {
    assert_eq!(try_spawn(|| {}).unwrap_err(), SchedError::NotInitialized);
    assert_eq!(current_id(), FiberId::NONE);
}
