//! Deferred tasks on the host's single thread.
//!
//! The visualizer defers two things: the first render after data ingestion, and
//! the end of the post-click cool-down. Both go through a [`Scheduler`] so they
//! can be cancelled on teardown.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::Duration;

use log::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;

/// Handle to a scheduled task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(
	/// Scheduler-assigned number, unique per scheduler.
	pub u64,
);

/// A deferred unit of work.
pub type Task = Box<dyn FnOnce()>;

/// Single-threaded timer source.
pub trait Scheduler {
	/// Runs `task` after `delay`, on the same thread, outside the caller's stack.
	fn schedule(&self, delay: Duration, task: Task) -> TaskId;
	/// Drops a pending task. Unknown or already-run ids are ignored.
	fn cancel(&self, id: TaskId);
}

/// Browser scheduler backed by `setTimeout`.
#[derive(Default)]
pub struct TimeoutScheduler {
	handles: Rc<RefCell<HashMap<TaskId, i32>>>,
	next_id: Cell<u64>,
}

impl TimeoutScheduler {
	/// A scheduler with nothing pending.
	pub fn new() -> Self {
		Self::default()
	}
}

impl Scheduler for TimeoutScheduler {
	fn schedule(&self, delay: Duration, task: Task) -> TaskId {
		let id = TaskId(self.next_id.get());
		self.next_id.set(id.0 + 1);

		let Some(window) = web_sys::window() else {
			warn!("graph-unfold: no window, dropping deferred task");
			return id;
		};

		let handles = Rc::downgrade(&self.handles);
		// Frees itself after running. Cancelled callbacks stay allocated.
		let callback = Closure::once_into_js(move || {
			if let Some(handles) = handles.upgrade() {
				handles.borrow_mut().remove(&id);
			}
			task();
		});
		let timeout = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
		match window.set_timeout_with_callback_and_timeout_and_arguments_0(
			callback.unchecked_ref(),
			timeout,
		) {
			Ok(handle) => {
				self.handles.borrow_mut().insert(id, handle);
			}
			Err(e) => warn!("graph-unfold: setTimeout failed: {:?}", e),
		}
		id
	}

	fn cancel(&self, id: TaskId) {
		if let Some(handle) = self.handles.borrow_mut().remove(&id) {
			if let Some(window) = web_sys::window() {
				window.clear_timeout_with_handle(handle);
			}
		}
	}
}

#[derive(Default)]
struct QueueState {
	now: Duration,
	next_id: u64,
	/// Keyed by (due time, id) so equal deadlines run in scheduling order.
	pending: BTreeMap<(Duration, TaskId), Task>,
}

/// Manually driven task queue with a virtual clock.
///
/// Used on native hosts and in tests. Cloning yields another handle to the
/// same queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
	state: Rc<RefCell<QueueState>>,
}

impl TaskQueue {
	/// An empty queue at time zero.
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of tasks not yet run.
	pub fn pending(&self) -> usize {
		self.state.borrow().pending.len()
	}

	/// Current virtual time.
	pub fn now(&self) -> Duration {
		self.state.borrow().now
	}

	/// Moves the clock forward by `by`, running every task that falls due.
	/// Tasks scheduled by running tasks also run if they fall due in time.
	pub fn advance(&self, by: Duration) -> usize {
		let deadline = self.now() + by;
		let mut ran = 0;
		loop {
			let next = {
				let mut state = self.state.borrow_mut();
				let first = state.pending.keys().next().copied();
				match first {
					Some(key) if key.0 <= deadline => {
						state.now = state.now.max(key.0);
						state.pending.remove(&key)
					}
					_ => None,
				}
			};
			match next {
				Some(task) => {
					task();
					ran += 1;
				}
				None => break,
			}
		}
		self.state.borrow_mut().now = deadline;
		ran
	}

	/// Runs tasks until the queue is empty, jumping the clock as needed.
	pub fn run_until_idle(&self) -> usize {
		let mut ran = 0;
		loop {
			let next = {
				let mut state = self.state.borrow_mut();
				let first = state.pending.pop_first();
				first.map(|((due, _), task)| {
					state.now = state.now.max(due);
					task
				})
			};
			match next {
				Some(task) => {
					task();
					ran += 1;
				}
				None => return ran,
			}
		}
	}
}

impl Scheduler for TaskQueue {
	fn schedule(&self, delay: Duration, task: Task) -> TaskId {
		let mut state = self.state.borrow_mut();
		let id = TaskId(state.next_id);
		state.next_id += 1;
		let due = state.now + delay;
		state.pending.insert((due, id), task);
		id
	}

	fn cancel(&self, id: TaskId) {
		self.state.borrow_mut().pending.retain(|(_, task_id), _| *task_id != id);
	}
}
