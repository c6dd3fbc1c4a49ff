// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::{ffi, fmt};

use crate::os::{self, imp};
use crate::{Error, Result, Symbol};

static OUTSTANDING: AtomicUsize = AtomicUsize::new(0);

/// Number of libraries currently loaded through [`Library`] values in this process.
///
/// Every successful [`Library::load`] increments it and every release
/// decrements it, so a steady value across a load/use/release cycle means no
/// handle leaked.
#[inline]
pub fn outstanding() -> usize {
	OUTSTANDING.load(Ordering::Acquire)
}

/// Load state of a [`Library`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryState {
	Unloaded,
	Loaded,
}

/// An owned handle to a shared library on the filesystem.
///
/// The handle is released exactly once: by [`release`](Library::release), or
/// when the `Library` is dropped. Symbols borrow the library, so neither can
/// happen while a [`Symbol`] or [`Func`](crate::Func) is still alive.
///
/// Loading and unloading run the library's initializers and finalizers. Two
/// `Library` values for the same path share one platform reference count;
/// callers that load and release the same path from several threads must
/// serialize those cycles themselves (see [`PathLocks`](crate::PathLocks)).
pub struct Library {
	path: PathBuf,
	handle: Option<os::Handle>,
}

// The platform handle is process-wide, and symbol lookup is thread-safe on every
// supported platform.
unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Library {
	/// Creates an unloaded handle for `path`. Nothing touches the filesystem
	/// until [`load`](Library::load).
	#[inline]
	pub fn new<P: Into<PathBuf>>(path: P) -> Self {
		Self {
			path: path.into(),
			handle: None,
		}
	}

	/// Attempts to open a shared library.
	///
	/// # Errors
	///
	/// Returns [`Error::LoadFailed`] if the file is absent, built for another
	/// architecture, is missing dependencies, or is otherwise unloadable.
	///
	/// # Examples
	///
	/// ```no_run
	/// use dyninvoke::Library;
	///
	/// let mut lib = Library::open("/opt/app/libloops.so")?;
	/// assert!(lib.is_loaded());
	/// lib.release()?;
	/// # Ok::<(), dyninvoke::Error>(())
	/// ```
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
		let mut lib = Self::new(path.as_ref());
		lib.load()?;
		Ok(lib)
	}

	/// Opens the running program itself, so its own exports (and, on unix,
	/// those of every library loaded with global visibility) can be resolved.
	///
	/// The returned library has an empty [`path`](Library::path).
	pub fn this() -> Result<Self> {
		Self::open("")
	}

	/// Loads the library if it is not loaded yet. An empty path names the
	/// running program.
	///
	/// A failed attempt leaves the handle unloaded and may be retried.
	pub fn load(&mut self) -> Result<()> {
		if self.handle.is_some() {
			return Ok(());
		}
		let os_path = self.path.as_os_str();
		if imp::has_nul(os_path) {
			return Err(Error::InvalidName {
				name: self.path.to_string_lossy().into_owned(),
			});
		}
		let opened = if os_path.is_empty() {
			unsafe { imp::dylib_this() }
		} else {
			unsafe { imp::dylib_open(os_path) }
		};
		match opened {
			Ok(handle) => {
				self.handle = Some(handle);
				OUTSTANDING.fetch_add(1, Ordering::AcqRel);
				tracing::debug!(path = %self.path.display(), "library loaded");
				Ok(())
			}
			Err(err) => {
				tracing::debug!(
					path = %self.path.display(),
					code = err.code,
					message = %err.message,
					"library failed to load"
				);
				Err(Error::load_failed(self.path.clone(), err))
			}
		}
	}

	/// Resolves an exported name. The match is exact and case-sensitive; no
	/// decorated or mangled variants are tried.
	///
	/// # Errors
	///
	/// [`Error::NotLoaded`] if the library is unloaded, [`Error::InvalidName`]
	/// if `name` contains a nul byte, and [`Error::SymbolNotFound`] if the
	/// export does not exist. None of these change the load state.
	pub fn symbol(&self, name: &str) -> Result<Symbol<'_>> {
		let Some(handle) = self.handle else {
			return Err(Error::NotLoaded {
				path: self.path.clone(),
			});
		};
		let c_name = ffi::CString::new(name).map_err(|_| Error::InvalidName {
			name: name.to_owned(),
		})?;
		match unsafe { imp::dylib_symbol(handle, &c_name) } {
			Ok(addr) => {
				tracing::debug!(path = %self.path.display(), symbol = name, "symbol resolved");
				Ok(Symbol::new(addr))
			}
			Err(err) => Err(Error::SymbolNotFound {
				name: name.to_owned(),
				path: self.path.clone(),
				message: err.message,
			}),
		}
	}

	/// Unloads the library. Calling this on an unloaded library does nothing.
	///
	/// The handle is given up before the platform call, so a failed release is
	/// never retried.
	///
	/// # Errors
	///
	/// [`Error::ReleaseFailed`] if the platform reports an error.
	pub fn release(&mut self) -> Result<()> {
		let Some(handle) = self.handle.take() else {
			return Ok(());
		};
		OUTSTANDING.fetch_sub(1, Ordering::AcqRel);
		match unsafe { imp::dylib_close(handle) } {
			Ok(()) => {
				tracing::debug!(path = %self.path.display(), "library released");
				Ok(())
			}
			Err(err) => Err(Error::release_failed(self.path.clone(), err)),
		}
	}

	/// Opens `path`, runs `f` with the library, and releases it on every exit path.
	///
	/// A release failure is reported only if `f` itself succeeded; otherwise
	/// it is logged and `f`'s error is returned.
	pub fn scope<P, T, F>(path: P, f: F) -> Result<T>
	where
		P: AsRef<Path>,
		F: FnOnce(&Library) -> Result<T>,
	{
		let mut lib = Self::open(path)?;
		let result = f(&lib);
		let released = lib.release();
		match (result, released) {
			(Ok(value), Ok(())) => Ok(value),
			(Ok(_), Err(err)) => Err(err),
			(Err(err), Ok(())) => Err(err),
			(Err(err), Err(release_err)) => {
				tracing::warn!(error = %release_err, "release after failure also failed");
				Err(err)
			}
		}
	}

	#[inline]
	pub fn path(&self) -> &Path {
		&self.path
	}

	#[inline]
	pub fn state(&self) -> LibraryState {
		if self.handle.is_some() {
			LibraryState::Loaded
		} else {
			LibraryState::Unloaded
		}
	}

	#[inline]
	pub fn is_loaded(&self) -> bool {
		self.handle.is_some()
	}
}

impl Drop for Library {
	fn drop(&mut self) {
		if let Err(err) = self.release() {
			tracing::warn!(error = %err, "failed to release library on drop");
		}
	}
}

impl fmt::Debug for Library {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Library")
			.field("path", &self.path)
			.field("handle", &self.handle)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_is_unloaded() {
		let lib = Library::new("never_opened");
		assert_eq!(lib.state(), LibraryState::Unloaded);
		assert_eq!(lib.path(), Path::new("never_opened"));
	}

	#[test]
	fn unloaded_library_yields_no_symbols() {
		let lib = Library::new("never_opened");
		let err = lib.symbol("add_two_ints").unwrap_err();
		assert_eq!(err.kind(), crate::ErrorKind::NotLoaded);
	}

	#[test]
	fn releasing_unloaded_is_a_no_op() {
		let mut lib = Library::new("never_opened");
		assert!(lib.release().is_ok());
		assert!(lib.release().is_ok());
	}

	#[test]
	fn nul_in_path_is_rejected() {
		let mut lib = Library::new("bad\0path");
		let err = lib.load().unwrap_err();
		assert_eq!(err.kind(), crate::ErrorKind::InvalidName);
		assert!(!lib.is_loaded());
	}
}
