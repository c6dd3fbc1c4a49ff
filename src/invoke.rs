// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::path::Path;
use std::time::Duration;

use crate::{Config, Library, PathLocks, Result, Signature};

/// The value returned by a native call, and how long the call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Invocation<T> {
	pub value: T,
	/// Wall-clock time measured immediately before and after the call.
	pub elapsed: Duration,
}

impl<T> Invocation<T> {
	#[inline]
	pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Invocation<U> {
		Invocation {
			value: f(self.value),
			elapsed: self.elapsed,
		}
	}
}

/// Loads a library, calls one export, and unloads it again.
///
/// Every call is a full cycle: load, resolve, call, release. The release
/// happens on every path out of [`invoke`](Invoker::invoke), including a
/// failed lookup.
#[derive(Debug)]
pub struct Invoker {
	config: Config,
	locks: PathLocks,
}

impl Invoker {
	#[inline]
	pub fn new(config: Config) -> Self {
		Self {
			config,
			locks: PathLocks::new(),
		}
	}

	/// An invoker configured from the environment (see [`Config::from_env`]).
	#[inline]
	pub fn from_env() -> Self {
		Self::new(Config::from_env())
	}

	#[inline]
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Loads `path`, resolves `symbol` as `F`, calls it with `args`, and releases the library.
	///
	/// `path` is resolved against the invoker's [`Config`].
	///
	/// # Safety
	///
	/// `F` must match the export's real declaration, including its calling
	/// convention. A mismatch cannot be detected and is undefined behavior.
	/// `args` must satisfy the export's own preconditions. No other thread
	/// may be using the same library path concurrently; use
	/// [`invoke_serialized`](Invoker::invoke_serialized) when that cannot be
	/// ruled out.
	///
	/// # Errors
	///
	/// [`LoadFailed`](crate::Error::LoadFailed) without any lookup,
	/// [`SymbolNotFound`](crate::Error::SymbolNotFound) after the library was
	/// released, or [`ReleaseFailed`](crate::Error::ReleaseFailed) if the call
	/// succeeded but unloading did not.
	///
	/// # Examples
	///
	/// ```no_run
	/// use dyninvoke::{Config, Invoker};
	///
	/// let invoker = Invoker::new(Config::new().with_base_dir("assets"));
	/// // int add_two_ints(int a, int b);
	/// let sum = unsafe {
	///     invoker.invoke::<extern "C" fn(i32, i32) -> i32>("libfixture.so", "add_two_ints", (2, 3))?
	/// };
	/// assert_eq!(sum.value, 5);
	/// # Ok::<(), dyninvoke::Error>(())
	/// ```
	pub unsafe fn invoke<F: Signature>(
		&self,
		path: impl AsRef<Path>,
		symbol: &str,
		args: F::Args,
	) -> Result<Invocation<F::Output>> {
		self.invoke_resolved::<F>(&self.config.resolve(path), symbol, args)
	}

	unsafe fn invoke_resolved<F: Signature>(
		&self,
		path: &Path,
		symbol: &str,
		args: F::Args,
	) -> Result<Invocation<F::Output>> {
		let span = tracing::debug_span!("invoke", path = %path.display(), symbol);
		let _enter = span.enter();

		let mut lib = Library::open(path).map_err(|err| {
			tracing::warn!(error = %err, code = err.code(), "load failed");
			err
		})?;

		let outcome = lib
			.symbol(symbol)
			.map(|sym| sym.to_fn::<F>().call_timed_unchecked(args));
		let released = lib.release();

		match (outcome, released) {
			(Ok(invocation), Ok(())) => {
				tracing::debug!(
					elapsed_us = invocation.elapsed.as_micros(),
					"invocation finished"
				);
				Ok(invocation)
			}
			(Ok(_), Err(err)) => {
				tracing::warn!(error = %err, "call succeeded but release failed");
				Err(err)
			}
			(Err(err), released) => {
				tracing::warn!(error = %err, "symbol lookup failed");
				if let Err(release_err) = released {
					tracing::warn!(error = %release_err, "release after failed lookup also failed");
				}
				Err(err)
			}
		}
	}

	/// Like [`invoke`](Invoker::invoke), but holds this invoker's lock for the
	/// resolved path for the whole cycle.
	///
	/// # Safety
	///
	/// As for [`invoke`](Invoker::invoke). Other code loading the
	/// same path without going through this invoker is not serialized.
	pub unsafe fn invoke_serialized<F: Signature>(
		&self,
		path: impl AsRef<Path>,
		symbol: &str,
		args: F::Args,
	) -> Result<Invocation<F::Output>> {
		let resolved = self.config.resolve(path);
		let _guard = self.locks.lock(&resolved);
		self.invoke_resolved::<F>(&resolved, symbol, args)
	}
}

impl Default for Invoker {
	fn default() -> Self {
		Self::from_env()
	}
}
