// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

#[derive(Debug, Default)]
struct Slot {
	busy: Mutex<bool>,
	freed: Condvar,
}

/// One exclusive lock per distinct library path.
///
/// [`Library`](crate::Library) does no locking of its own. When several
/// threads may load, call into and release the same path, hold a
/// [`PathGuard`] for the whole cycle so a release on one thread cannot
/// unmap code another thread is still running.
///
/// Paths are compared as given; resolve them first (see
/// [`Config::resolve`](crate::Config::resolve)) so that two spellings of the
/// same file share a lock.
#[derive(Debug, Default)]
pub struct PathLocks {
	slots: Mutex<HashMap<PathBuf, Arc<Slot>>>,
}

/// Held while a load/use/release cycle runs; unlocks on drop.
///
/// The last guard for a path also drops the path's entry, so the set of
/// tracked paths only holds paths that are locked or waited on.
#[derive(Debug)]
#[must_use = "the path is unlocked as soon as the guard is dropped"]
pub struct PathGuard<'a> {
	locks: &'a PathLocks,
	path: PathBuf,
	slot: Arc<Slot>,
}

impl PathLocks {
	#[inline]
	pub fn new() -> Self {
		Self::default()
	}

	fn slot(&self, path: &Path) -> Arc<Slot> {
		let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
		Arc::clone(slots.entry(path.to_owned()).or_default())
	}

	fn guard(&self, path: &Path, slot: Arc<Slot>) -> PathGuard<'_> {
		PathGuard {
			locks: self,
			path: path.to_owned(),
			slot,
		}
	}

	/// Blocks until no other guard for `path` is alive.
	pub fn lock<P: AsRef<Path>>(&self, path: P) -> PathGuard<'_> {
		let path = path.as_ref();
		let slot = self.slot(path);
		let mut busy = slot.busy.lock().unwrap_or_else(PoisonError::into_inner);
		while *busy {
			busy = slot.freed.wait(busy).unwrap_or_else(PoisonError::into_inner);
		}
		*busy = true;
		drop(busy);
		self.guard(path, slot)
	}

	/// Returns `None` instead of blocking when `path` is already locked.
	pub fn try_lock<P: AsRef<Path>>(&self, path: P) -> Option<PathGuard<'_>> {
		let path = path.as_ref();
		let slot = self.slot(path);
		let mut busy = slot.busy.lock().unwrap_or_else(PoisonError::into_inner);
		if *busy {
			return None;
		}
		*busy = true;
		drop(busy);
		Some(self.guard(path, slot))
	}
}

impl Drop for PathGuard<'_> {
	fn drop(&mut self) {
		// Every holder of a slot clones it under this lock, so the count below is stable.
		let mut slots = self.locks.slots.lock().unwrap_or_else(PoisonError::into_inner);
		let mut busy = self.slot.busy.lock().unwrap_or_else(PoisonError::into_inner);
		*busy = false;
		drop(busy);
		self.slot.freed.notify_one();
		// one reference in the map, one in this guard
		if Arc::strong_count(&self.slot) == 2 {
			slots.remove(&self.path);
		}
	}
}
