// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
use std::path::PathBuf;

use crate::os;

/// A list specifying general categories of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// The shared library could not be loaded.
	LoadFailed,
	/// The library is loaded, but does not export the requested name.
	SymbolNotFound,
	/// A symbol was requested from a library that is not loaded.
	NotLoaded,
	/// A path or symbol name contained an interior nul byte.
	InvalidName,
	/// The platform refused to unload the library.
	ReleaseFailed,
}

/// The error type for loading, resolving and releasing shared libraries.
///
/// Diagnostic codes are captured by the failing call itself, so there is no
/// separate "last error" to read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	/// `code` is never zero.
	#[error("failed to load library `{}` (code {code}): {message}", .path.display())]
	LoadFailed {
		path: PathBuf,
		code: i32,
		message: String,
	},
	#[error("symbol `{name}` not found in `{}`: {message}", .path.display())]
	SymbolNotFound {
		name: String,
		path: PathBuf,
		message: String,
	},
	#[error("library `{}` is not loaded", .path.display())]
	NotLoaded { path: PathBuf },
	#[error("`{name}` contains an interior nul byte")]
	InvalidName { name: String },
	#[error("failed to release library `{}` (code {code}): {message}", .path.display())]
	ReleaseFailed {
		path: PathBuf,
		code: i32,
		message: String,
	},
}

impl Error {
	#[inline]
	pub const fn kind(&self) -> ErrorKind {
		match self {
			Self::LoadFailed { .. } => ErrorKind::LoadFailed,
			Self::SymbolNotFound { .. } => ErrorKind::SymbolNotFound,
			Self::NotLoaded { .. } => ErrorKind::NotLoaded,
			Self::InvalidName { .. } => ErrorKind::InvalidName,
			Self::ReleaseFailed { .. } => ErrorKind::ReleaseFailed,
		}
	}

	/// The platform diagnostic code, if the platform reported one.
	#[inline]
	pub const fn code(&self) -> Option<i32> {
		match self {
			Self::LoadFailed { code, .. } | Self::ReleaseFailed { code, .. } => Some(*code),
			_ => None,
		}
	}

	pub(crate) fn load_failed(path: PathBuf, err: os::OsError) -> Self {
		Self::LoadFailed {
			path,
			code: err.code,
			message: err.message,
		}
	}

	pub(crate) fn release_failed(path: PathBuf, err: os::OsError) -> Self {
		Self::ReleaseFailed {
			path,
			code: err.code,
			message: err.message,
		}
	}
}

/// Translates a platform diagnostic code into text.
///
/// The lookup is best-effort and bounded to 255 characters. When the platform
/// has no text for `code`, the result is `"error code {code}"`.
///
/// # Examples
///
/// ```
/// let text = dyninvoke::describe_code(2);
/// assert!(!text.is_empty());
/// ```
pub fn describe_code(code: i32) -> String {
	os::describe_or_fallback(code)
}
