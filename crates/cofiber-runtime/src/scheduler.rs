//! Shared-stack round-robin scheduler
//!
//! Every switch goes through the root flow (the OS thread stack):
//!
//! ```text
//!   root ──activate(a)──▶ fiber a ──yield──▶ root ──activate(b)──▶ fiber b ...
//! ```
//!
//! Because the root never runs on the shared stack, it is the one that moves
//! bytes in and out of it: after a fiber switches back, the root copies
//! `[saved sp, top)` into that fiber's snapshot; before it switches into a
//! Suspended fiber it writes the snapshot back in place. A Ready fiber
//! starts at the top with nothing to restore.
//!
//! The next fiber is the first occupied slot after the one that ran last,
//! wrapping around, which gives the round-robin order 0 → 1 → 2 → 0.

use std::cell::{Cell, UnsafeCell};
use std::panic::{self, AssertUnwindSafe};
use std::ptr::NonNull;
use std::rc::Rc;

use cofiber_core::kprint;
use cofiber_core::{kdebug, kerror, ktrace};
use cofiber_core::{Completion, FiberId, FiberState, SchedError, SchedResult, SlotTable};

use crate::config::SchedulerConfig;
use crate::context::{HardwareContext, NativeContext};
use crate::fiber::{Fiber, FiberHandle, FiberStats, Task};
use crate::memory::SharedStack;
use crate::tls;

/// Object-safe view of a scheduler, used by the thread-local pointer
pub(crate) trait Dispatch {
    fn spawn_task(&self, task: Task) -> SchedResult<FiberHandle>;
    fn yield_current(&self) -> SchedResult<()>;
    fn join(&self, completion: &Rc<Completion>) -> SchedResult<()>;
    fn running_id(&self) -> FiberId;
    fn state(&self, id: FiberId) -> Option<FiberState>;
}

/// Scheduler state shared between the root flow and fibers
///
/// Lives in a `Box` so fiber contexts can carry a stable pointer to it.
/// No reference into `slots` is held across a context switch.
struct Core<C: HardwareContext> {
    config: SchedulerConfig,
    slots: UnsafeCell<SlotTable<Box<Fiber<C>>>>,
    running: Cell<FiberId>,
    last_ran: Cell<FiberId>,
    /// Set while `resume` runs a single activation; yields then always
    /// return to the root
    stepping: Cell<bool>,
    stack: SharedStack,
    root: UnsafeCell<C>,
    /// Scratch save area for the final switch out of a dying fiber
    retired: UnsafeCell<C>,
}

impl<C: HardwareContext> Core<C> {
    #[inline]
    fn slots(&self) -> &SlotTable<Box<Fiber<C>>> {
        // SAFETY: single thread; mutation only through `slots_mut` in
        // short scopes that never overlap a shared borrow
        unsafe { &*self.slots.get() }
    }

    /// # Safety
    ///
    /// The returned borrow must end before any context switch and before
    /// another call to `slots` or `slots_mut`.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    unsafe fn slots_mut(&self) -> &mut SlotTable<Box<Fiber<C>>> {
        &mut *self.slots.get()
    }

    fn debug(&self) -> bool {
        self.config.debug_logging
    }

    fn in_fiber(&self) -> bool {
        self.running.get().is_some()
    }

    // ========================================================================
    // Creation
    // ========================================================================

    fn spawn(&self, task: Task) -> SchedResult<FiberHandle> {
        let core_ptr = self as *const Self as usize;
        let top = self.stack.top();
        let slots = unsafe { self.slots_mut() };

        let id = slots.insert_after(self.running.get(), |id| Box::new(Fiber::new(id, task)))?;
        let fiber = slots
            .get_mut(id)
            .ok_or(SchedError::InvalidHandle(id))?;

        // SAFETY: `top` is the top of the mapped shared stack; prepare only
        // records it
        unsafe { fiber.context.prepare(top, fiber_entry::<C>, core_ptr) };
        let handle = FiberHandle::new(id, Rc::clone(&fiber.completion));

        if self.debug() {
            kdebug!("created fiber {} ({} live)", id, slots.live_count());
        }
        Ok(handle)
    }

    // ========================================================================
    // Fiber side
    // ========================================================================

    /// Suspend the running fiber and return to the root
    fn yield_current(&self) -> SchedResult<()> {
        let id = self.running.get();
        if id.is_none() {
            return Err(SchedError::NotInFiber);
        }

        // Sole occupant: nobody else to run
        if !self.stepping.get() && self.slots().next_occupied(id) == Some(id) {
            return Ok(());
        }

        let ctx: *mut C = {
            let fiber = unsafe { self.slots_mut() }
                .get_mut(id)
                .ok_or(SchedError::InvalidHandle(id))?;
            fiber.set_state(FiberState::Suspended);
            &mut fiber.context
        };
        self.running.set(FiberId::NONE);

        if self.debug() {
            ktrace!("yield");
        }

        // SAFETY: the fiber box stays in its slot while Suspended; the root
        // context was saved by the `activate` that switched us in
        unsafe { C::switch(ctx, self.root.get()) };

        // Back on the shared stack; `activate` restored our bytes and
        // marked us Running
        Ok(())
    }

    /// Run the current fiber's task, containing any panic
    fn run_current_task(&self) -> SchedResult<()> {
        let id = self.running.get();
        let task = unsafe { self.slots_mut() }
            .get_mut(id)
            .and_then(|fiber| fiber.take_task());

        let Some(task) = task else {
            return Err(SchedError::InvalidHandle(id));
        };

        panic::catch_unwind(AssertUnwindSafe(task)).map_err(|payload| {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "non-string panic payload".to_string()
            };
            SchedError::Panicked { id, message }
        })
    }

    /// Running → Dead: free the slot, wake joiners, leave for good
    ///
    /// # Safety
    ///
    /// Must be the last thing a fiber does. Nothing with a destructor may
    /// remain on the fiber's frames.
    unsafe fn finish_current(&self, outcome: SchedResult<()>) -> ! {
        let id = self.running.get();

        let completion = match self.slots_mut().remove(id) {
            Some(mut fiber) => {
                fiber.set_state(FiberState::Dead);
                Rc::clone(&fiber.completion)
            }
            None => {
                kerror!("fiber {} finished without a slot", id);
                std::process::abort();
            }
        };
        self.running.set(FiberId::NONE);

        if self.debug() {
            kdebug!("fiber {} dead ({} live)", id, self.slots().live_count());
        }

        if let Err(e) = completion.fire(outcome) {
            kerror!("{}", e);
            std::process::abort();
        }
        drop(completion);

        C::switch(self.retired.get(), self.root.get());

        // Nobody switches back into a retired context
        std::process::abort();
    }

    // ========================================================================
    // Root side
    // ========================================================================

    /// Switch into fiber `id` and return once it yields or dies
    fn activate(&self, id: FiberId) -> SchedResult<()> {
        debug_assert!(!self.in_fiber(), "activate from inside a fiber");

        let ctx: *const C = {
            let fiber = unsafe { self.slots_mut() }
                .get_mut(id)
                .ok_or(SchedError::InvalidHandle(id))?;
            if fiber.state().needs_copy_in() {
                // SAFETY: we are on the root stack; no fiber is running
                fiber.snapshot.copy_in(unsafe { self.stack.as_mut_slice() })?;
            }
            fiber.set_state(FiberState::Running);
            &fiber.context
        };

        self.running.set(id);
        self.last_ran.set(id);
        kprint::enter_fiber(id);

        if self.debug() {
            ktrace!("switch in");
        }

        // SAFETY: the fiber's stack bytes are in place (copy-in above, or a
        // fresh context for a Ready fiber)
        unsafe { C::switch(self.root.get(), ctx) };

        kprint::leave_fiber();

        // Yielded: save the live span; died: the slot is already empty
        let fiber = match unsafe { self.slots_mut() }.get_mut(id) {
            Some(fiber) if fiber.state() == FiberState::Suspended => fiber,
            _ => return Ok(()),
        };
        let used = self.stack.span_from(fiber.context.stack_pointer())?;
        // SAFETY: the fiber is suspended and we are on the root stack
        fiber.snapshot.copy_out(unsafe { self.stack.as_slice() }, used)?;

        if self.debug() {
            ktrace!("fiber {} suspended, {} stack bytes saved", id, used);
        }
        Ok(())
    }

    /// Round-robin from the root until `done` holds or nothing is live
    fn drive(&self, done: impl Fn() -> bool) {
        while !done() {
            let Some(next) = self.slots().next_occupied(self.last_ran.get()) else {
                break;
            };
            if let Err(e) = self.activate(next) {
                panic!("{}", e);
            }
        }
    }

    fn join(&self, completion: &Rc<Completion>) -> SchedResult<()> {
        if let Some(outcome) = completion.outcome() {
            return outcome;
        }

        let target = completion.id();
        let live = self
            .slots()
            .get(target)
            .is_some_and(|fiber| Rc::ptr_eq(&fiber.completion, completion));
        if !live {
            return Err(SchedError::InvalidHandle(target));
        }

        let me = self.running.get();
        if self.debug() {
            kdebug!("join {} from {}", target, me);
        }

        assert!(me != target, "fiber {} cannot join itself", me);

        completion.add_waiter();
        if me.is_some() {
            while !completion.is_fired() {
                if let Err(e) = self.yield_current() {
                    completion.remove_waiter();
                    return Err(e);
                }
            }
        } else {
            self.drive(|| completion.is_fired());
        }
        completion.remove_waiter();

        completion
            .outcome()
            .unwrap_or(Err(SchedError::InvalidHandle(target)))
    }

    fn resume(&self, id: FiberId) -> bool {
        assert!(!self.in_fiber(), "resume called from inside fiber {}", self.running.get());

        if !self.slots().contains(id) {
            return false;
        }

        self.stepping.set(true);
        let result = self.activate(id);
        self.stepping.set(false);

        if let Err(e) = result {
            panic!("{}", e);
        }
        true
    }
}

impl<C: HardwareContext> Dispatch for Core<C> {
    fn spawn_task(&self, task: Task) -> SchedResult<FiberHandle> {
        self.spawn(task)
    }

    fn yield_current(&self) -> SchedResult<()> {
        Core::yield_current(self)
    }

    fn join(&self, completion: &Rc<Completion>) -> SchedResult<()> {
        Core::join(self, completion)
    }

    fn running_id(&self) -> FiberId {
        self.running.get()
    }

    fn state(&self, id: FiberId) -> Option<FiberState> {
        self.slots().get(id).map(|fiber| fiber.state())
    }
}

/// First Rust frame of every fiber
extern "C" fn fiber_entry<C: HardwareContext>(core: usize) -> ! {
    // SAFETY: `core` is the boxed Core that prepared this context; it
    // outlives every fiber it runs
    let core = unsafe { &*(core as *const Core<C>) };
    let outcome = core.run_current_task();
    unsafe { core.finish_current(outcome) }
}

// ============================================================================
// Public scheduler object
// ============================================================================

/// Cooperative fiber scheduler for the current thread
///
/// Owns the fiber table and the shared stack. Creating one installs it as
/// the thread's scheduler, so the free functions in this module (and
/// `FiberHandle::join`) reach it; dropping it uninstalls it.
///
/// ```rust,ignore
/// let sched = Scheduler::new(SchedulerConfig::default())?;
/// let h = sched.spawn(|| {
///     for i in 0..3 {
///         println!("tick {}", i);
///         cofiber_runtime::yield_now();
///     }
/// });
/// sched.join(&h)?;
/// ```
pub struct Scheduler<C: HardwareContext = NativeContext> {
    core: Box<Core<C>>,
}

impl Scheduler<NativeContext> {
    /// Create a scheduler using the native context switch
    pub fn new(config: SchedulerConfig) -> SchedResult<Self> {
        Self::with_context(config)
    }
}

impl<C: HardwareContext> Scheduler<C> {
    /// Create a scheduler with a caller-chosen context implementation
    pub fn with_context(config: SchedulerConfig) -> SchedResult<Self> {
        config.validate()?;
        if tls::is_installed() {
            return Err(SchedError::AlreadyInitialized);
        }

        let stack = SharedStack::new(config.stack_size)?;
        let core = Box::new(Core {
            slots: UnsafeCell::new(SlotTable::new(config.max_fibers)),
            running: Cell::new(FiberId::NONE),
            last_ran: Cell::new(FiberId::NONE),
            stepping: Cell::new(false),
            stack,
            root: UnsafeCell::new(C::default()),
            retired: UnsafeCell::new(C::default()),
            config,
        });

        let dispatch: &(dyn Dispatch + 'static) = &*core;
        tls::install(NonNull::from(dispatch))?;

        if core.debug() {
            kdebug!(
                "scheduler up: {} slots, {:?}",
                core.config.max_fibers,
                core.stack
            );
        }
        Ok(Self { core })
    }

    /// Spawn a fiber, panicking if the table is full
    pub fn spawn<F>(&self, f: F) -> FiberHandle
    where
        F: FnOnce() + 'static,
    {
        match self.try_spawn(f) {
            Ok(handle) => handle,
            Err(e) => panic!("{}", e),
        }
    }

    /// Spawn a fiber
    ///
    /// Returns `CapacityExceeded` when every slot is occupied.
    pub fn try_spawn<F>(&self, f: F) -> SchedResult<FiberHandle>
    where
        F: FnOnce() + 'static,
    {
        self.core.spawn(Box::new(f))
    }

    /// Wait for `handle`'s fiber to finish
    pub fn join(&self, handle: &FiberHandle) -> SchedResult<()> {
        self.core.join(handle.completion())
    }

    /// Run one activation of fiber `id` (until it yields or dies)
    ///
    /// Returns false, doing nothing, if the slot is empty. Panics when
    /// called from inside a fiber.
    pub fn resume(&self, id: FiberId) -> bool {
        self.core.resume(id)
    }

    /// Round-robin until every fiber is Dead
    pub fn run(&self) {
        assert!(!self.core.in_fiber(), "run called from inside a fiber");
        self.core.drive(|| false);
    }

    /// Fiber currently running, or `FiberId::NONE` on the root flow
    pub fn running_id(&self) -> FiberId {
        self.core.running.get()
    }

    /// Number of fibers not yet Dead
    pub fn live_count(&self) -> usize {
        self.core.slots().live_count()
    }

    /// Fiber table capacity
    pub fn capacity(&self) -> usize {
        self.core.slots().capacity()
    }

    /// Shared stack size, which is also each fiber's stack budget
    pub fn stack_size(&self) -> usize {
        self.core.stack.size()
    }

    /// State of the fiber in slot `id`, if occupied
    pub fn state(&self, id: FiberId) -> Option<FiberState> {
        Dispatch::state(&*self.core, id)
    }

    /// Diagnostics for the fiber in slot `id`, if occupied
    pub fn stats(&self, id: FiberId) -> Option<FiberStats> {
        self.core.slots().get(id).map(|fiber| fiber.stats())
    }

    /// Configuration the scheduler was built with
    pub fn config(&self) -> &SchedulerConfig {
        &self.core.config
    }
}

impl<C: HardwareContext> Drop for Scheduler<C> {
    fn drop(&mut self) {
        tls::uninstall();
        let live = self.core.slots().live_count();
        if live > 0 && self.core.debug() {
            kdebug!("scheduler dropped with {} unfinished fibers", live);
        }
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// Yield the running fiber to the next one in round-robin order
///
/// Panics outside a fiber.
pub fn yield_now() {
    match tls::with_current(|sched| sched.yield_current()) {
        Some(Ok(())) => {}
        Some(Err(e)) => panic!("yield_now: {}", e),
        None => panic!("yield_now: {}", SchedError::NotInitialized),
    }
}

/// Spawn on the thread's scheduler, panicking on failure
pub fn spawn<F>(f: F) -> FiberHandle
where
    F: FnOnce() + 'static,
{
    match try_spawn(f) {
        Ok(handle) => handle,
        Err(e) => panic!("spawn: {}", e),
    }
}

/// Spawn on the thread's scheduler
pub fn try_spawn<F>(f: F) -> SchedResult<FiberHandle>
where
    F: FnOnce() + 'static,
{
    let task: Task = Box::new(f);
    tls::with_current(move |sched| sched.spawn_task(task))
        .unwrap_or(Err(SchedError::NotInitialized))
}

/// Wait for `handle`'s fiber to finish
pub fn join(handle: &FiberHandle) -> SchedResult<()> {
    handle.join()
}

/// Id of the running fiber, `FiberId::NONE` on the root flow or when no
/// scheduler is installed
pub fn current_id() -> FiberId {
    tls::with_current(|sched| sched.running_id()).unwrap_or(FiberId::NONE)
}

/// Is the caller running inside a fiber?
pub fn is_in_fiber() -> bool {
    current_id().is_some()
}

/// State of fiber `id` on the thread's scheduler
pub fn fiber_state(id: FiberId) -> Option<FiberState> {
    tls::with_current(|sched| sched.state(id)).flatten()
}
