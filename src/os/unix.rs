// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
use super::{Handle, OsError};
use std::os::unix::ffi::OsStrExt;
use std::ptr::NonNull;
use std::{ffi, io};

#[cfg(not(any(
	target_os = "linux",
	target_os = "android",
	target_os = "macos",
	target_os = "ios",
	target_env = "gnu"
)))]
use std::sync;

// `dlerror` is only guaranteed to be thread-local on the platforms below.
#[cfg(not(any(
	target_os = "linux",
	target_os = "android",
	target_os = "macos",
	target_os = "ios",
	target_env = "gnu"
)))]
#[inline]
fn dylib_guard() -> sync::MutexGuard<'static, ()> {
	static LOCK: sync::Mutex<()> = sync::Mutex::new(());
	LOCK.lock().unwrap_or_else(sync::PoisonError::into_inner)
}

#[cfg(any(
	target_os = "linux",
	target_os = "android",
	target_os = "macos",
	target_os = "ios",
	target_env = "gnu"
))]
#[inline(always)]
fn dylib_guard() {}

#[inline]
fn clear_errno() {
	#[cfg(any(target_os = "linux", target_os = "emscripten"))]
	unsafe {
		*libc::__errno_location() = 0;
	}
	#[cfg(target_os = "android")]
	unsafe {
		*libc::__errno() = 0;
	}
	#[cfg(any(target_os = "macos", target_os = "ios", target_os = "freebsd"))]
	unsafe {
		*libc::__error() = 0;
	}
}

/// Reads `errno` and then `dlerror`, in that order, since `dlerror` may clobber `errno`.
unsafe fn capture() -> OsError {
	let code = io::Error::last_os_error().raw_os_error().unwrap_or(0);
	let text = libc::dlerror();
	let message = if text.is_null() {
		None
	} else {
		Some(ffi::CStr::from_ptr(text).to_string_lossy().into_owned())
	};
	OsError::new(code, message)
}

unsafe fn map_result<F>(f: F) -> Result<NonNull<ffi::c_void>, OsError>
where
	F: FnOnce() -> *mut ffi::c_void,
{
	let _lock = dylib_guard();
	let _ = libc::dlerror(); // clear existing errors
	clear_errno();
	match NonNull::new(f()) {
		Some(ptr) => Ok(ptr),
		None => Err(capture()),
	}
}

pub(crate) fn has_nul(path: &ffi::OsStr) -> bool {
	path.as_bytes().contains(&0)
}

pub(crate) unsafe fn dylib_open(path: &ffi::OsStr) -> Result<Handle, OsError> {
	let c_str = ffi::CString::new(path.as_bytes())
		.map_err(|_| OsError::new(libc::EINVAL, None))?;
	map_result(|| libc::dlopen(c_str.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL))
}

pub(crate) unsafe fn dylib_this() -> Result<Handle, OsError> {
	map_result(|| libc::dlopen(std::ptr::null(), libc::RTLD_NOW))
}

pub(crate) unsafe fn dylib_symbol(
	lib_handle: Handle,
	name: &ffi::CStr,
) -> Result<NonNull<ffi::c_void>, OsError> {
	map_result(|| libc::dlsym(lib_handle.as_ptr(), name.as_ptr()))
}

pub(crate) unsafe fn dylib_close(lib_handle: Handle) -> Result<(), OsError> {
	let _lock = dylib_guard();
	let _ = libc::dlerror(); // clear existing errors
	clear_errno();
	if libc::dlclose(lib_handle.as_ptr()) != 0 {
		Err(capture())
	} else {
		Ok(())
	}
}

pub(crate) fn describe(code: i32) -> Option<String> {
	if code <= 0 {
		return None;
	}
	let text = io::Error::from_raw_os_error(code).to_string();
	// std appends " (os error N)", which the caller already carries as `code`.
	let suffix = format!(" (os error {code})");
	Some(text.strip_suffix(suffix.as_str()).unwrap_or(&text).to_owned())
}
