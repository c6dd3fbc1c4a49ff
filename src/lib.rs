// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
//! Load shared libraries at runtime, call their exports, and unload them again.
//!
//! Two binding modes are provided:
//!
//! * Explicit: a [`Library`] is opened, symbols are resolved from it, and it is
//!   released when done. [`Invoker`] wraps one complete load, resolve, call,
//!   release cycle and measures the call.
//! * Implicit: a [`Binding`] opens its library on first use and keeps it for
//!   the rest of the process. The [`bind`] attribute declares foreign
//!   functions against one.
//!
//! ```no_run
//! use dyninvoke::Library;
//!
//! let lib = Library::open("./libloops.so")?;
//! // long loop1(void);
//! let loop1 = unsafe { lib.symbol("loop1")?.to_fn::<extern "C" fn() -> i64>() };
//! let timed = loop1.call_timed(());
//! println!("loop1 = {} in {:?}", timed.value, timed.elapsed);
//! # Ok::<(), dyninvoke::Error>(())
//! ```
//!
//! # Safety
//!
//! A symbol's signature cannot be checked at runtime. Stating the wrong one,
//! or calling into native code that faults, is undefined behavior and may take
//! the process down; no error value can report it.
//!
//! Loading and unloading the same library concurrently from several threads
//! is the caller's responsibility to serialize. [`PathLocks`] and
//! [`Invoker::invoke_serialized`] do this for callers that need it.
#![allow(clippy::missing_safety_doc)]

mod binding;
mod config;
pub mod error;
mod invoke;
mod library;
mod locks;
mod os;
mod schedule;
mod signature;
mod sym;

pub use binding::{Binding, LazyFn};
pub use config::{library_filename, Config, LIBRARY_DIR_VAR};
#[doc(inline)]
pub use error::{describe_code, Error, ErrorKind};
pub use invoke::{Invocation, Invoker};
pub use library::{outstanding, Library, LibraryState};
pub use locks::{PathGuard, PathLocks};
pub use schedule::Scheduler;
pub use signature::{reinterpret, Func, SafeSignature, Signature};
pub use sym::Symbol;

/// Declares the functions of an `extern` block as lazily bound exports of a [`Binding`].
///
/// Each function becomes an `unsafe fn` that resolves its export on the first
/// call and panics with the error text if that fails.
///
/// ```no_run
/// use dyninvoke::{bind, Binding};
///
/// static LOOPS: Binding = Binding::new(&["./libloops.so"]);
///
/// #[bind(library = LOOPS)]
/// extern "C" {
///     fn loop1() -> i64;
///     #[link_name = "loop_DoublePrecision"]
///     fn loop_double_precision(count: i64, divide: bool, value: f64) -> f64;
/// }
///
/// let n = unsafe { loop1() };
/// ```
pub use dyninvoke_macro::bind;

/// The result of a dyninvoke operation.
pub type Result<T> = std::result::Result<T, Error>;
