//! Trailing-edge debouncing of repeated calls.
//!
//! A [`Debouncer`] wraps an action so that a burst of calls collapses into a
//! single execution, fired `delay` after the last call of the burst and fed
//! that last call's arguments.
//!
//! Each debouncer exclusively owns at most one pending tokio task. Calling
//! [`Debouncer::call`] aborts that task (if it has not fired yet) and spawns
//! a new one, so no lock is ever taken:
//!
//! ```no_run
//! use std::time::Duration;
//! use docview::debounce::Debouncer;
//!
//! # async fn demo() {
//! let mut search = Debouncer::new(Duration::from_millis(300), |query: String| {
//!     println!("searching for {query}");
//! });
//! search.call("ru".into());
//! search.call("rus".into());
//! search.call("rust".into()); // only this one runs, 300ms from now
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

type Action<A> = Arc<dyn Fn(A) + Send + Sync + 'static>;

/// Collapses rapid repeated calls into one delayed execution.
pub struct Debouncer<A> {
    delay: Duration,
    action: Action<A>,
    handle: Option<Handle>,
    /// The scheduled, not yet superseded execution.
    pending: Option<JoinHandle<()>>,
}

impl<A: Send + 'static> Debouncer<A> {
    /// Wrap `action` so it runs `delay` after the last call in a burst.
    ///
    /// Tasks are spawned onto the ambient tokio runtime, so [`call`](Self::call)
    /// must happen inside a runtime context. Use [`with_handle`](Self::with_handle)
    /// to schedule onto a specific runtime instead.
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            delay,
            action: Arc::new(action),
            handle: None,
            pending: None,
        }
    }

    /// Like [`new`](Self::new), but scheduling onto an explicit runtime.
    pub fn with_handle<F>(handle: Handle, delay: Duration, action: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            handle: Some(handle),
            ..Self::new(delay, action)
        }
    }

    /// Schedule the action with `args`, superseding any pending execution.
    ///
    /// Returns immediately. The deadline is fixed here, at `now + delay`.
    pub fn call(&mut self, args: A) {
        if let Some(prev) = self.pending.take() {
            prev.abort();
        }

        // A delay past the clock's range sleeps "forever", as tokio::time::sleep does.
        let deadline = Instant::now().checked_add(self.delay);
        let delay = self.delay;
        let action = Arc::clone(&self.action);
        let task = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => tokio::time::sleep(delay).await,
            }
            action(args);
        };

        let join = match &self.handle {
            Some(handle) => handle.spawn(task),
            None => tokio::spawn(task),
        };
        tracing::trace!(delay_ms = self.delay.as_millis() as u64, "debounce: rescheduled");
        self.pending = Some(join);
    }

    /// Drop the pending execution without scheduling a new one.
    ///
    /// Returns `true` if an execution was still waiting to fire.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(prev) => {
                let was_waiting = !prev.is_finished();
                prev.abort();
                was_waiting
            }
            None => false,
        }
    }

    /// Whether an execution is scheduled and has not run yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// The quiet period that must elapse before the action fires.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<A> fmt::Debug for Debouncer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}
