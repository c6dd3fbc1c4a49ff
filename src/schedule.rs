// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
//! Cooperative, single-threaded deferral of calls.
//!
//! Jobs run one at a time on the thread that drives the scheduler, so a
//! deferred native call never overlaps another one.

use std::collections::BinaryHeap;
use std::time::{Duration, Instant};
use std::{cmp, fmt, thread};

type Job<'a> = Box<dyn FnOnce() + 'a>;

/// Stand-in due time for delays past what `Instant` can represent.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

struct Entry<'a> {
	due: Instant,
	seq: u64,
	job: Job<'a>,
}

impl PartialEq for Entry<'_> {
	fn eq(&self, other: &Self) -> bool {
		self.due == other.due && self.seq == other.seq
	}
}

impl Eq for Entry<'_> {}

impl PartialOrd for Entry<'_> {
	fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

// `BinaryHeap` is a max-heap; earliest due (then earliest queued) must come out first.
impl Ord for Entry<'_> {
	fn cmp(&self, other: &Self) -> cmp::Ordering {
		other
			.due
			.cmp(&self.due)
			.then_with(|| other.seq.cmp(&self.seq))
	}
}

/// A queue of calls to run no earlier than a given instant.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::time::Duration;
/// use dyninvoke::Scheduler;
///
/// let order = Cell::new(Vec::new());
/// let mut scheduler = Scheduler::new();
/// scheduler.after(Duration::from_millis(5), || {
///     let mut v = order.take();
///     v.push("second");
///     order.set(v);
/// });
/// scheduler.after(Duration::ZERO, || {
///     let mut v = order.take();
///     v.push("first");
///     order.set(v);
/// });
/// scheduler.run();
/// assert_eq!(order.take(), ["first", "second"]);
/// ```
pub struct Scheduler<'a> {
	queue: BinaryHeap<Entry<'a>>,
	next_seq: u64,
}

impl<'a> Scheduler<'a> {
	#[inline]
	pub fn new() -> Self {
		Self {
			queue: BinaryHeap::new(),
			next_seq: 0,
		}
	}

	/// Queues `job` to run once `delay` has passed.
	///
	/// A delay too large for the platform clock is capped at roughly a century.
	pub fn after<F>(&mut self, delay: Duration, job: F)
	where
		F: FnOnce() + 'a,
	{
		let now = Instant::now();
		let due = now
			.checked_add(delay)
			.or_else(|| now.checked_add(FAR_FUTURE))
			.unwrap_or(now);
		self.at(due, job);
	}

	/// Queues `job` to run at or after `due`.
	pub fn at<F>(&mut self, due: Instant, job: F)
	where
		F: FnOnce() + 'a,
	{
		let seq = self.next_seq;
		self.next_seq += 1;
		self.queue.push(Entry {
			due,
			seq,
			job: Box::new(job),
		});
	}

	/// Runs every job that is due now. Returns how many ran.
	#[inline]
	pub fn tick(&mut self) -> usize {
		self.tick_at(Instant::now())
	}

	/// Runs every job due at or before `now`, in due order.
	pub fn tick_at(&mut self, now: Instant) -> usize {
		let mut ran = 0;
		while self.queue.peek().is_some_and(|entry| entry.due <= now) {
			if let Some(entry) = self.queue.pop() {
				(entry.job)();
				ran += 1;
			}
		}
		if ran > 0 {
			tracing::trace!(ran, pending = self.queue.len(), "scheduler tick");
		}
		ran
	}

	/// Sleeps until each job is due and runs it, until the queue is empty.
	pub fn run(&mut self) {
		while let Some(due) = self.next_due() {
			let now = Instant::now();
			if due > now {
				thread::sleep(due - now);
			}
			self.tick();
		}
	}

	#[inline]
	pub fn next_due(&self) -> Option<Instant> {
		self.queue.peek().map(|entry| entry.due)
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.queue.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.queue.is_empty()
	}
}

impl Default for Scheduler<'_> {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Scheduler<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scheduler")
			.field("pending", &self.queue.len())
			.field("next_due", &self.next_due())
			.finish()
	}
}
