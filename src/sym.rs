// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
use std::{ffi, fmt, marker, ptr::NonNull};

use crate::signature::{self, Func, Signature};
use crate::Library;

/// The address of an export resolved from a [`Library`].
///
/// A `Symbol` borrows the library it came from, so the library cannot be
/// released or dropped while the address is still reachable.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Symbol<'lib> {
	addr: NonNull<ffi::c_void>,
	_lib: marker::PhantomData<&'lib Library>,
}

impl<'lib> Symbol<'lib> {
	#[inline]
	pub(crate) fn new(addr: NonNull<ffi::c_void>) -> Self {
		Self {
			addr,
			_lib: marker::PhantomData,
		}
	}

	/// Returns the raw address.
	#[inline]
	pub const fn as_ptr(self) -> *mut ffi::c_void {
		self.addr.as_ptr()
	}

	/// Casts to a pointer of another type.
	#[inline]
	pub const fn cast<T>(self) -> *mut T {
		self.addr.as_ptr().cast()
	}

	/// Reinterprets the address as a function of type `F`.
	///
	/// # Safety
	///
	/// `F` must match the export's real parameter types, return type and
	/// calling convention. Nothing can verify this across the native boundary;
	/// a mismatch is undefined behavior when the function is called.
	///
	/// # Examples
	///
	/// ```no_run
	/// use dyninvoke::Library;
	///
	/// let lib = Library::open("libfixture.so")?;
	/// let sym = lib.symbol("add_two_ints")?;
	/// // declared in C as `int add_two_ints(int a, int b)`
	/// let add = unsafe { sym.to_fn::<extern "C" fn(i32, i32) -> i32>() };
	/// assert_eq!(add.call((2, 3)), 5);
	/// # Ok::<(), dyninvoke::Error>(())
	/// ```
	#[inline]
	pub unsafe fn to_fn<F: Signature>(self) -> Func<'lib, F> {
		signature::reinterpret(self)
	}
}

impl fmt::Debug for Symbol<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Symbol").field(&self.addr).finish()
	}
}
