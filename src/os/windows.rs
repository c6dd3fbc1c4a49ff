// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
use std::os::windows::ffi::OsStrExt;
use std::ptr::{self, NonNull};
use std::{ffi, iter};

use super::{Handle, OsError, MAX_MESSAGE_LEN};

mod c;

fn to_wide(path: &ffi::OsStr) -> Vec<u16> {
	path.encode_wide().chain(iter::once(0u16)).collect()
}

/// Must run before anything else that could reset the thread's last-error value.
unsafe fn capture() -> OsError {
	let code = c::GetLastError() as i32;
	OsError::new(code, describe(code))
}

pub(crate) fn has_nul(path: &ffi::OsStr) -> bool {
	path.encode_wide().any(|unit| unit == 0)
}

pub(crate) unsafe fn dylib_open(path: &ffi::OsStr) -> Result<Handle, OsError> {
	let wide_str: Vec<u16> = to_wide(path);
	c::SetLastError(0);
	let handle = c::LoadLibraryExW(wide_str.as_ptr(), ptr::null_mut(), 0);
	NonNull::new(handle).ok_or_else(|| capture())
}

/// Increments the reference count of the running executable, so the handle is
/// released like any other.
pub(crate) unsafe fn dylib_this() -> Result<Handle, OsError> {
	let mut handle: c::HMODULE = ptr::null_mut();
	c::SetLastError(0);
	if c::GetModuleHandleExW(0, ptr::null(), &mut handle) == 0 {
		return Err(capture());
	}
	NonNull::new(handle).ok_or_else(|| capture())
}

pub(crate) unsafe fn dylib_symbol(
	lib_handle: Handle,
	name: &ffi::CStr,
) -> Result<NonNull<ffi::c_void>, OsError> {
	c::SetLastError(0);
	let addr = c::GetProcAddress(lib_handle.as_ptr(), name.as_ptr());
	NonNull::new(addr).ok_or_else(|| capture())
}

pub(crate) unsafe fn dylib_close(lib_handle: Handle) -> Result<(), OsError> {
	c::SetLastError(0);
	if c::FreeLibrary(lib_handle.as_ptr()) == 0 {
		Err(capture())
	} else {
		Ok(())
	}
}

pub(crate) fn describe(code: i32) -> Option<String> {
	if code <= 0 {
		return None;
	}
	let mut buffer = [0u16; MAX_MESSAGE_LEN + 1];
	let len = unsafe {
		c::FormatMessageW(
			c::FORMAT_MESSAGE_FROM_SYSTEM | c::FORMAT_MESSAGE_IGNORE_INSERTS,
			ptr::null(),
			code as c::DWORD,
			0,
			buffer.as_mut_ptr(),
			buffer.len() as c::DWORD,
			ptr::null(),
		)
	};
	if len == 0 {
		None
	} else {
		let len = (len as usize).min(buffer.len());
		Some(String::from_utf16_lossy(&buffer[..len]).trim_end().to_owned())
	}
}
