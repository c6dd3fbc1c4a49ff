// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
//! Implicit binding: a library opened on first use and kept for the rest of
//! the process.
//!
//! A [`Binding`] never releases its library. The file stays mapped until the
//! process exits, so it cannot be replaced or rebuilt while the program runs.
//! Use [`Invoker`](crate::Invoker) or [`Library`] directly when that matters.

use std::sync::{Mutex, OnceLock, PoisonError};

use crate::{Library, Result, Signature, Symbol};

/// A library opened lazily from a list of candidate paths.
///
/// This object is designed to be used with [`bind`](crate::bind).
#[derive(Debug)]
pub struct Binding {
	paths: &'static [&'static str],
	init: Mutex<()>,
	lib: OnceLock<Library>,
}

impl Binding {
	/// Constructs a new `Binding`.
	///
	/// `paths` are tried in order and the first one that opens is kept. If
	/// `paths` is empty the running program itself is opened.
	///
	/// # Examples
	///
	/// ```rust
	/// use dyninvoke::Binding;
	///
	/// static LOOPS: Binding = Binding::new(&["./libloops.so", "libloops.so"]);
	/// ```
	#[inline]
	pub const fn new(paths: &'static [&'static str]) -> Self {
		Self {
			paths,
			init: Mutex::new(()),
			lib: OnceLock::new(),
		}
	}

	/// Returns the bound library, opening it on the first call.
	///
	/// May block while another thread is opening it. A failed attempt leaves
	/// the binding empty, so a later call tries again.
	///
	/// # Errors
	///
	/// The [`LoadFailed`](crate::Error::LoadFailed) error of the first
	/// candidate path if none of them could be opened.
	pub fn library(&self) -> Result<&Library> {
		if let Some(lib) = self.lib.get() {
			return Ok(lib);
		}
		let _init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(lib) = self.lib.get() {
			return Ok(lib);
		}
		let lib = self.open_first()?;
		tracing::debug!(path = %lib.path().display(), "binding initialized");
		Ok(self.lib.get_or_init(|| lib))
	}

	fn open_first(&self) -> Result<Library> {
		let Some((first, rest)) = self.paths.split_first() else {
			return Library::this();
		};
		match Library::open(first) {
			Ok(lib) => Ok(lib),
			Err(err) => rest
				.iter()
				.find_map(|path| Library::open(path).ok())
				.ok_or(err),
		}
	}

	/// Resolves `name` in the bound library, opening it first if needed.
	///
	/// # Errors
	///
	/// Whatever [`library`](Binding::library) or [`Library::symbol`] report.
	///
	/// # Examples
	///
	/// ```no_run
	/// use dyninvoke::Binding;
	///
	/// static LOOPS: Binding = Binding::new(&["libloops.so"]);
	/// let sym = LOOPS.symbol("loop1")?;
	/// let loop1 = unsafe { sym.to_fn::<extern "C" fn() -> i64>() };
	/// println!("{}", loop1.call(()));
	/// # Ok::<(), dyninvoke::Error>(())
	/// ```
	pub fn symbol(&self, name: &str) -> Result<Symbol<'_>> {
		self.library()?.symbol(name)
	}

	/// The bound library, if it has been opened.
	#[inline]
	pub fn get(&self) -> Option<&Library> {
		self.lib.get()
	}
}

/// A function pointer resolved from a [`Binding`] on first use and cached.
///
/// Usually declared by [`bind`](crate::bind) rather than by hand.
pub struct LazyFn<F: Signature> {
	name: &'static str,
	binding: &'static Binding,
	func: OnceLock<F>,
}

impl<F: Signature> LazyFn<F> {
	/// Declares `name` in `binding` with the signature `F`.
	///
	/// # Safety
	///
	/// `F` must match the export's real declaration, including its calling
	/// convention. Every later [`get`](LazyFn::get) relies on it.
	#[inline]
	pub const unsafe fn new(binding: &'static Binding, name: &'static str) -> Self {
		Self {
			name,
			binding,
			func: OnceLock::new(),
		}
	}

	/// Returns the function pointer, resolving it on the first call.
	///
	/// # Errors
	///
	/// Whatever [`Binding::symbol`] reports. Nothing is cached on failure.
	pub fn get(&self) -> Result<F> {
		if let Some(func) = self.func.get() {
			return Ok(*func);
		}
		let sym = self.binding.symbol(self.name)?;
		// SAFETY: the signature was asserted when this `LazyFn` was declared, and
		// the binding never releases its library.
		let func = unsafe { sym.to_fn::<F>() }.into_inner();
		Ok(*self.func.get_or_init(|| func))
	}

	#[inline]
	pub fn name(&self) -> &'static str {
		self.name
	}
}

impl<F: Signature> std::fmt::Debug for LazyFn<F> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LazyFn")
			.field("name", &self.name)
			.field("resolved", &self.func.get().is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ErrorKind;

	static MISSING: Binding = Binding::new(&["dyninvoke_missing_a", "dyninvoke_missing_b"]);

	#[test]
	fn failed_binding_stays_empty() {
		let err = MISSING.symbol("loop1").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::LoadFailed);
		assert!(err.to_string().contains("dyninvoke_missing_a"));
		assert!(MISSING.get().is_none());
	}

	#[test]
	fn lazy_fn_reports_load_failure() {
		static LOOP1: LazyFn<extern "C" fn() -> i64> = unsafe { LazyFn::new(&MISSING, "loop1") };
		assert_eq!(LOOP1.get().unwrap_err().kind(), ErrorKind::LoadFailed);
		assert_eq!(LOOP1.name(), "loop1");
	}
}
