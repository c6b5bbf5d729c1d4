//! Async runtime for functionality crossing multiple ticks

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use cooked_waker::{IntoWaker, ViaRawPointer, Wake, WakeRef};
use futures::future::{FutureExt, LocalBoxFuture};

use common::*;

struct RuntimeInner {
    ready: Vec<TaskRef>,
    next_task: TaskHandle,
    tick: u64,
}

/// Single threaded executor, polled once per simulation tick by [Runtime::tick]
#[derive(Clone)]
pub struct Runtime(Rc<RefCell<RuntimeInner>>);

#[derive(Eq, PartialEq, Copy, Clone, Default)]
pub struct TaskHandle(u64);

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
enum TaskState {
    Pending,
    Polling,
    Finished,
    Cancelled,
}

pub struct Task {
    runtime: Weak<RefCell<RuntimeInner>>,
    handle: TaskHandle,
    state: Cell<TaskState>,
    /// Already in the ready queue
    queued: Cell<bool>,
    future: RefCell<Option<LocalBoxFuture<'static, ()>>>,
}

#[derive(Clone)]
pub struct TaskRef(Rc<Task>);

// everything will run on the main thread
unsafe impl Send for TaskRef {}
unsafe impl Sync for TaskRef {}

impl Runtime {
    /// The task is ready immediately and will first be polled on the next [tick](Self::tick)
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) -> TaskRef {
        let mut runtime = self.0.borrow_mut();
        let task = TaskRef(Rc::new(Task {
            runtime: Rc::downgrade(&self.0),
            handle: runtime.next_task_handle(),
            state: Cell::new(TaskState::Pending),
            queued: Cell::new(true),
            future: RefCell::new(Some(future.boxed_local())),
        }));

        trace!("spawned task"; "task" => ?task.0.handle);
        runtime.ready.push(task.clone());
        task
    }

    /// Polls all tasks that are ready at the start of the tick. Tasks woken during this tick are
    /// polled on the next one. Returns the number of tasks polled
    pub fn tick(&self) -> usize {
        let ready = {
            let mut runtime = self.0.borrow_mut();
            runtime.tick += 1;
            std::mem::take(&mut runtime.ready)
        };

        if !ready.is_empty() {
            trace!("{} ready tasks", ready.len());
        }

        let count = ready.len();
        for task in ready {
            task.poll();
        }
        count
    }

    /// Ticks until no tasks are ready or `max_ticks` have passed, returns ticks elapsed
    pub fn run_until_idle(&self, max_ticks: u32) -> u32 {
        let mut ticks = 0;
        while ticks < max_ticks && !self.is_idle() {
            self.tick();
            ticks += 1;
        }
        ticks
    }

    /// No tasks are waiting to be polled. Tasks parked on an external event do not count
    pub fn is_idle(&self) -> bool {
        self.0.borrow().ready.is_empty()
    }

    pub fn current_tick(&self) -> u64 {
        self.0.borrow().tick
    }
}

impl RuntimeInner {
    fn next_task_handle(&mut self) -> TaskHandle {
        let this = self.next_task;
        self.next_task.0 += 1;
        this
    }
}

impl Default for Runtime {
    fn default() -> Self {
        let inner = RefCell::new(RuntimeInner {
            ready: Vec::with_capacity(128),
            next_task: TaskHandle::default(),
            tick: 0,
        });

        Runtime(Rc::new(inner))
    }
}

impl TaskRef {
    pub fn handle(&self) -> TaskHandle {
        self.0.handle
    }

    /// Completed or cancelled
    pub fn is_finished(&self) -> bool {
        matches!(
            self.0.state.get(),
            TaskState::Finished | TaskState::Cancelled
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.state.get() == TaskState::Cancelled
    }

    /// Drops the future immediately, so by the time this returns everything it owned has been
    /// dropped. If called from within the task itself, the future is dropped as soon as the
    /// current poll returns instead
    pub fn cancel(&self) {
        match self.0.state.get() {
            TaskState::Finished | TaskState::Cancelled => {}
            TaskState::Polling => {
                trace!("cancelling task during its own poll"; "task" => ?self.0.handle);
                self.0.state.set(TaskState::Cancelled);
            }
            TaskState::Pending => {
                trace!("cancelling task"; "task" => ?self.0.handle);
                self.0.state.set(TaskState::Cancelled);

                // release borrow before the future's destructors run
                let future = self.0.future.borrow_mut().take();
                drop(future);
            }
        }
    }

    fn poll(&self) {
        self.0.queued.set(false);

        let mut future = match self.0.future.borrow_mut().take() {
            Some(fut) => fut,
            None => return, // finished or cancelled since being queued
        };

        let waker = self.clone().into_waker();
        let mut ctx = Context::from_waker(&waker);

        self.0.state.set(TaskState::Polling);
        trace!("polling task"; "task" => ?self.0.handle);
        match future.as_mut().poll(&mut ctx) {
            Poll::Ready(()) => {
                trace!("task is complete"; "task" => ?self.0.handle);
                self.0.state.set(TaskState::Finished);
            }
            Poll::Pending if self.0.state.get() == TaskState::Cancelled => {
                trace!("dropping task cancelled during poll"; "task" => ?self.0.handle);
            }
            Poll::Pending => {
                self.0.state.set(TaskState::Pending);
                *self.0.future.borrow_mut() = Some(future);
            }
        }
    }
}

impl WakeRef for TaskRef {
    fn wake_by_ref(&self) {
        if self.is_finished() || self.0.queued.replace(true) {
            return;
        }

        match self.0.runtime.upgrade() {
            Some(runtime) => runtime.borrow_mut().ready.push(self.clone()),
            None => self.0.queued.set(false),
        }
    }
}

impl Wake for TaskRef {}

unsafe impl ViaRawPointer for TaskRef {
    type Target = Task;

    fn into_raw(self) -> *mut Task {
        Rc::into_raw(self.0) as *mut Task
    }

    unsafe fn from_raw(ptr: *mut Task) -> Self {
        Self(Rc::from_raw(ptr as *const Task))
    }
}

impl Debug for TaskHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "TaskHandle({:#x})", self.0)
    }
}

impl Debug for TaskRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:?}[{:?}]", self.0.handle, self.0.state.get())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;
    use std::task::Waker;

    use crate::runtime::yield_now;

    use super::*;

    /// Pending until opened from outside the runtime
    #[derive(Clone, Default)]
    struct Gate(Rc<RefCell<(bool, Option<Waker>)>>);

    impl Gate {
        fn open(&self) {
            let mut gate = self.0.borrow_mut();
            gate.0 = true;
            if let Some(waker) = gate.1.take() {
                waker.wake();
            }
        }
    }

    impl Future for Gate {
        type Output = ();

        fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            let mut gate = self.0.borrow_mut();
            if gate.0 {
                Poll::Ready(())
            } else {
                gate.1 = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }

    #[test]
    fn basic_operation() {
        logging::for_tests();
        let runtime = Runtime::default();
        let gate = Gate::default();
        let it_worked = Rc::new(Cell::new(false));

        let gate2 = gate.clone();
        let it_worked2 = it_worked.clone();
        let task = runtime.spawn(async move {
            debug!("here we go!!");
            gate2.await;
            debug!("all done!!!!");
            it_worked2.set(true);
        });

        for _ in 0..4 {
            runtime.tick();
        }
        assert!(!task.is_finished());
        assert!(runtime.is_idle());
        assert_eq!(runtime.current_tick(), 4);

        gate.open();
        assert!(!runtime.is_idle());

        for _ in 0..2 {
            runtime.tick();
        }

        assert!(it_worked.get(), "future did not complete");
        assert!(task.is_finished());
        assert!(!task.is_cancelled());
    }

    struct DropFlag(Rc<Cell<bool>>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.set(true);
        }
    }

    #[test]
    fn cancel_drops_future_immediately() {
        let runtime = Runtime::default();
        let dropped = Rc::new(Cell::new(false));
        let flag = DropFlag(dropped.clone());

        let task = runtime.spawn(async move {
            let _flag = flag;
            futures::future::pending::<()>().await;
        });

        runtime.tick();
        assert!(!dropped.get());

        task.cancel();
        assert!(dropped.get(), "future should be dropped during cancel");
        assert!(task.is_finished());
        assert!(task.is_cancelled());

        // cancelling again is harmless
        task.cancel();
        runtime.tick();
    }

    #[test]
    fn cancel_before_first_poll() {
        let runtime = Runtime::default();
        let polled = Rc::new(Cell::new(false));
        let polled2 = polled.clone();

        let task = runtime.spawn(async move { polled2.set(true) });
        task.cancel();
        runtime.tick();

        assert!(!polled.get());
        assert!(task.is_cancelled());
    }

    #[test]
    fn yield_resumes_next_tick() {
        let runtime = Runtime::default();
        let steps = Rc::new(Cell::new(0));
        let steps2 = steps.clone();

        let task = runtime.spawn(async move {
            for _ in 0..3 {
                steps2.set(steps2.get() + 1);
                yield_now().await;
            }
        });

        assert_eq!(runtime.tick(), 1);
        assert_eq!(steps.get(), 1);
        runtime.tick();
        assert_eq!(steps.get(), 2);

        let ticks = runtime.run_until_idle(10);
        assert_eq!(ticks, 2);
        assert_eq!(steps.get(), 3);
        assert!(task.is_finished());
        assert_eq!(runtime.current_tick(), 4);
    }

    #[test]
    fn woken_twice_polled_once() {
        struct DoubleWake(bool);

        impl Future for DoubleWake {
            type Output = ();

            fn poll(mut self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
                if std::mem::replace(&mut self.0, true) {
                    Poll::Ready(())
                } else {
                    cx.waker().wake_by_ref();
                    cx.waker().wake_by_ref();
                    Poll::Pending
                }
            }
        }

        let runtime = Runtime::default();
        let task = runtime.spawn(DoubleWake(false));

        assert_eq!(runtime.tick(), 1);
        assert_eq!(runtime.tick(), 1);
        assert!(task.is_finished());
        assert!(runtime.is_idle());
    }
}
