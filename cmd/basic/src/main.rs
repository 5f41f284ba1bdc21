//! Basic cofiber example
//!
//! Four fibers print a counter and yield after every line, then the root
//! flow joins them in creation order.
//!
//! # Environment Variables
//!
//! - `COF_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `COF_FLUSH_EPRINT=1` - Flush debug output immediately
//! - `COF_DEBUG=1` - Scheduler create/switch/join tracing

use cofiber::{kinfo, Scheduler, SchedulerConfig};
use cofiber::yield_now;

// COF_LOG_LEVEL=debug COF_DEBUG=1 cargo run -p cofiber-basic
fn count(label: &'static str, n: usize) {
    for i in 0..n {
        println!("{} : {}", label, i);
        yield_now();
    }
}

fn main() {
    let sched = match Scheduler::new(SchedulerConfig::default()) {
        Ok(sched) => sched,
        Err(e) => {
            eprintln!("basic: {}", e);
            std::process::exit(1);
        }
    };

    let handles: Vec<_> = [("abc", 15), ("efg", 2), ("hij", 8), ("klm", 10)]
        .into_iter()
        .map(|(label, n)| sched.spawn(move || count(label, n)))
        .collect();

    kinfo!("spawned {} fibers", handles.len());

    for h in &handles {
        if let Err(e) = sched.join(h) {
            eprintln!("basic: fiber {}: {}", h.id(), e);
        }
    }

    println!("done");
}
