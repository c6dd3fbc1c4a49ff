// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
//! Statically declared function shapes and the one place a raw address becomes one.

use std::time::Instant;
use std::{ffi, fmt, marker, mem, ptr::NonNull};

use crate::{Invocation, Library, Symbol};

mod sealed {
	pub trait Sealed {}
}

/// A function pointer type that a resolved export can be reinterpreted as.
///
/// Implemented for `extern "C"` and `extern "system"` function pointers, safe
/// and `unsafe`, taking up to six parameters. Arguments are passed as a tuple.
/// Only the safe ones implement [`SafeSignature`].
///
/// # Safety
///
/// Implementors must be plain function pointers the size of a data pointer.
/// The trait is sealed.
pub unsafe trait Signature: Copy + sealed::Sealed {
	/// Parameters as a tuple, e.g. `(i32, i32)`.
	type Args;
	/// Return type.
	type Output;

	#[doc(hidden)]
	unsafe fn call_with(self, args: Self::Args) -> Self::Output;
}

/// A [`Signature`] declared without `unsafe`: the export has no per-call
/// preconditions, so a [`Func`] of this type can be called from safe code.
///
/// `unsafe fn` pointers do not implement it and are called through
/// [`Func::call_unchecked`] instead.
///
/// ```compile_fail
/// # use dyninvoke::Library;
/// let lib = Library::this()?;
/// // size_t strlen(const char *s);
/// let strlen = unsafe {
///     lib.symbol("strlen")?
///         .to_fn::<unsafe extern "C" fn(*const std::ffi::c_char) -> usize>()
/// };
/// strlen.call((std::ptr::null(),));
/// # Ok::<(), dyninvoke::Error>(())
/// ```
pub trait SafeSignature: Signature {}

macro_rules! impl_signature {
	($($arg:ident : $ty:ident),*) => {
		impl_signature!(@impl [extern "C"] $($arg : $ty),*);
		impl_signature!(@impl [unsafe extern "C"] $($arg : $ty),*);
		impl_signature!(@impl [extern "system"] $($arg : $ty),*);
		impl_signature!(@impl [unsafe extern "system"] $($arg : $ty),*);
		impl<R, $($ty),*> SafeSignature for extern "C" fn($($ty),*) -> R {}
		impl<R, $($ty),*> SafeSignature for extern "system" fn($($ty),*) -> R {}
	};
	(@impl [$($abi:tt)*] $($arg:ident : $ty:ident),*) => {
		impl<R, $($ty),*> sealed::Sealed for $($abi)* fn($($ty),*) -> R {}

		unsafe impl<R, $($ty),*> Signature for $($abi)* fn($($ty),*) -> R {
			type Args = ($($ty,)*);
			type Output = R;

			#[inline]
			unsafe fn call_with(self, ($($arg,)*): Self::Args) -> R {
				(self)($($arg),*)
			}
		}
	};
}

impl_signature!();
impl_signature!(a: A);
impl_signature!(a: A, b: B);
impl_signature!(a: A, b: B, c: C);
impl_signature!(a: A, b: B, c: C, d: D);
impl_signature!(a: A, b: B, c: C, d: D, e: E);
impl_signature!(a: A, b: B, c: C, d: D, e: E, f: G);

struct AssertFnPtr<F>(marker::PhantomData<F>);

impl<F> AssertFnPtr<F> {
	const SIZE_MATCHES: () = assert!(
		mem::size_of::<F>() == mem::size_of::<*mut ffi::c_void>(),
		"function pointers must be the size of a data pointer"
	);
}

/// Reinterprets a resolved address as a function of type `F`.
///
/// This is the only unchecked conversion in the crate; everything downstream
/// works with the typed [`Func`].
///
/// # Safety
///
/// `F` must match the exported function's real parameter types, return type
/// and calling convention.
pub unsafe fn reinterpret<'lib, F: Signature>(symbol: Symbol<'lib>) -> Func<'lib, F> {
	let () = AssertFnPtr::<F>::SIZE_MATCHES;
	let addr = symbol.as_ptr();
	Func {
		// `AssertFnPtr` asserts sizeof(F) = sizeof(*mut c_void), so `transmute_copy` reads
		// exactly the address.
		f: mem::transmute_copy::<*mut ffi::c_void, F>(&addr),
		addr: NonNull::new_unchecked(addr),
		_lib: marker::PhantomData,
	}
}

/// A typed, callable export borrowed from a [`Library`].
pub struct Func<'lib, F: Signature> {
	f: F,
	addr: NonNull<ffi::c_void>,
	_lib: marker::PhantomData<&'lib Library>,
}

impl<'lib, F: SafeSignature> Func<'lib, F> {
	/// Calls the export.
	///
	/// Blocks until the native function returns; there is no timeout.
	#[inline]
	pub fn call(&self, args: F::Args) -> F::Output {
		// SAFETY: the caller of `reinterpret` asserted that `F` matches the export,
		// `F` carries no call preconditions, and the borrow on the library keeps
		// the code mapped.
		unsafe { self.f.call_with(args) }
	}

	/// Calls the export, measuring wall-clock time immediately around the call.
	#[inline]
	pub fn call_timed(&self, args: F::Args) -> Invocation<F::Output> {
		// SAFETY: as for `call`.
		unsafe { self.call_timed_unchecked(args) }
	}
}

impl<'lib, F: Signature> Func<'lib, F> {
	/// Calls the export whatever its declared safety.
	///
	/// # Safety
	///
	/// `args` must satisfy every precondition of the native function, such as
	/// pointer validity.
	#[inline]
	pub unsafe fn call_unchecked(&self, args: F::Args) -> F::Output {
		self.f.call_with(args)
	}

	/// [`call_unchecked`](Func::call_unchecked), measuring wall-clock time
	/// immediately around the call.
	///
	/// # Safety
	///
	/// As for [`call_unchecked`](Func::call_unchecked).
	pub unsafe fn call_timed_unchecked(&self, args: F::Args) -> Invocation<F::Output> {
		let start = Instant::now();
		let value = self.f.call_with(args);
		let elapsed = start.elapsed();
		Invocation { value, elapsed }
	}

	#[inline]
	pub fn as_ptr(&self) -> *mut ffi::c_void {
		self.addr.as_ptr()
	}
}

impl<F: Signature> Func<'static, F> {
	/// Unwraps the function pointer. Only possible for libraries that are
	/// never released, such as a [`Binding`](crate::Binding).
	#[inline]
	pub fn into_inner(self) -> F {
		self.f
	}
}

impl<F: Signature> Clone for Func<'_, F> {
	fn clone(&self) -> Self {
		*self
	}
}

impl<F: Signature> Copy for Func<'_, F> {}

impl<F: Signature> fmt::Debug for Func<'_, F> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Func").field(&self.addr).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	extern "C" fn add_two_ints(a: i32, b: i32) -> i32 {
		a + b
	}

	extern "C" fn answer() -> u64 {
		42
	}

	fn symbol_of(addr: *mut ffi::c_void) -> Symbol<'static> {
		Symbol::new(NonNull::new(addr).unwrap())
	}

	#[test]
	fn reinterpret_round_trips_through_the_address() {
		let sym = symbol_of(add_two_ints as *mut ffi::c_void);
		let add = unsafe { reinterpret::<extern "C" fn(i32, i32) -> i32>(sym) };
		assert_eq!(add.call((2, 3)), 5);
		assert_eq!(add.as_ptr(), sym.as_ptr());
	}

	#[test]
	fn zero_arity_calls_take_unit() {
		let sym = symbol_of(answer as *mut ffi::c_void);
		let f = unsafe { sym.to_fn::<extern "C" fn() -> u64>() };
		let invocation = f.call_timed(());
		assert_eq!(invocation.value, 42);
	}

	#[test]
	fn unsafe_signatures_call_through_unchecked() {
		let sym = symbol_of(add_two_ints as *mut ffi::c_void);
		let add = unsafe { sym.to_fn::<unsafe extern "C" fn(i32, i32) -> i32>() };
		assert_eq!(unsafe { add.call_unchecked((2, 3)) }, 5);
		let timed = unsafe { add.call_timed_unchecked((20, 22)) };
		assert_eq!(timed.value, 42);
	}

	#[test]
	fn static_funcs_unwrap() {
		let sym = symbol_of(add_two_ints as *mut ffi::c_void);
		let raw: extern "C" fn(i32, i32) -> i32 = unsafe { sym.to_fn() }.into_inner();
		assert_eq!(raw(40, 2), 42);
	}
}
