#![cfg(unix)]

use std::path::Path;
use std::time::Duration;

use dyninvoke::*;
use dyninvoke_fixture as fixture;

fn init_logging() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

#[test]
fn test_add_two_ints() {
	init_logging();
	let invoker = Invoker::default();
	let sum = unsafe { invoker.invoke::<extern "C" fn(i32, i32) -> i32>(fixture::PATH, "add_two_ints", (2, 3)) }
		.unwrap();
	assert_eq!(sum.value, 5);
}

#[test]
fn test_symbol_not_found() {
	init_logging();
	let mut lib = Library::open(fixture::PATH).unwrap();
	let err = lib.symbol("nonexistent").unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
	// a failed lookup leaves the library usable
	assert!(lib.is_loaded());
	assert!(lib.symbol("add_two_ints").is_ok());
	lib.release().unwrap();
	lib.release().unwrap();
	assert_eq!(lib.state(), LibraryState::Unloaded);
	assert_eq!(lib.symbol("add_two_ints").unwrap_err().kind(), ErrorKind::NotLoaded);
}

#[test]
fn test_symbol_is_case_sensitive() {
	let lib = Library::open(fixture::PATH).unwrap();
	assert_eq!(lib.symbol("ADD_TWO_INTS").unwrap_err().kind(), ErrorKind::SymbolNotFound);
	assert_eq!(lib.symbol("add\0two").unwrap_err().kind(), ErrorKind::InvalidName);
}

#[test]
fn test_invoker_symbol_not_found() {
	let invoker = Invoker::default();
	let err = unsafe { invoker.invoke::<extern "C" fn() -> i64>(fixture::PATH, "loop3", ()) }.unwrap_err();
	match err {
		Error::SymbolNotFound { name, path, .. } => {
			assert_eq!(name, "loop3");
			assert_eq!(path, Path::new(fixture::PATH));
		}
		other => panic!("unexpected error: {other}"),
	}
}

#[test]
fn test_base_dir_resolution() {
	let dir = tempfile::tempdir().unwrap();
	let name = library_filename("relocated");
	fixture::copy_to(dir.path(), &name).unwrap();
	let invoker = Invoker::new(Config::new().with_base_dir(dir.path()));
	let sum = unsafe { invoker.invoke::<extern "C" fn(i32, i32) -> i32>(&name, "add_two_ints", (40, 2)) }
		.unwrap();
	assert_eq!(sum.value, 42);
}

// musl never unloads on dlclose
#[cfg(not(target_env = "musl"))]
#[test]
fn test_sessions_start_fresh() {
	init_logging();
	// a private copy, so no other test holds this library open
	let dir = tempfile::tempdir().unwrap();
	let path = fixture::copy_to(dir.path(), &library_filename("sessions")).unwrap();
	let invoker = Invoker::default();
	for _ in 0..5 {
		let count = unsafe { invoker.invoke::<extern "C" fn() -> i32>(&path, "session_counter", ()) }.unwrap();
		assert_eq!(count.value, 1);
	}

	// within one session the state persists
	let lib = Library::open(&path).unwrap();
	let counter = unsafe { lib.symbol("session_counter").unwrap().to_fn::<extern "C" fn() -> i32>() };
	assert_eq!(counter.call(()), 1);
	assert_eq!(counter.call(()), 2);
}

#[test]
fn test_heavier_loop_takes_longer() {
	let invoker = Invoker::default();
	let light = unsafe { invoker.invoke::<extern "C" fn() -> i64>(fixture::PATH, "loop1", ()) }.unwrap();
	let heavy = unsafe { invoker.invoke::<extern "C" fn() -> i64>(fixture::PATH, "loop2", ()) }.unwrap();
	assert!(light.value > 0);
	assert!(heavy.value > light.value);
	assert!(heavy.elapsed > light.elapsed);
	assert!(heavy.elapsed > Duration::ZERO);
}

#[test]
fn test_double_precision() {
	let invoker = Invoker::default();
	type LoopDouble = extern "C" fn(i64, bool, f64) -> f64;
	let same = unsafe { invoker.invoke::<LoopDouble>(fixture::PATH, "loop_double_precision", (0, true, 2.5)) }
		.unwrap();
	assert_eq!(same.value, 2.5);
	let divided = unsafe { invoker.invoke::<LoopDouble>(fixture::PATH, "loop_double_precision", (1000, true, 2.5)) }
		.unwrap();
	let multiplied =
		unsafe { invoker.invoke::<LoopDouble>(fixture::PATH, "loop_double_precision", (1000, false, 2.5)) }.unwrap();
	assert!(divided.value < 2.5);
	assert!(multiplied.value > 2.5);
}

#[test]
fn test_scope_releases() {
	let sum = Library::scope(fixture::PATH, |lib| {
		let add = unsafe { lib.symbol("add_two_ints")?.to_fn::<extern "C" fn(i32, i32) -> i32>() };
		Ok(add.call((7, 8)))
	})
	.unwrap();
	assert_eq!(sum, 15);

	let err = Library::scope(fixture::PATH, |lib| lib.symbol("nonexistent").map(|_| ())).unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
}

#[test]
fn test_invoke_serialized() {
	let invoker = Invoker::default();
	std::thread::scope(|s| {
		for i in 0..4 {
			let invoker = &invoker;
			s.spawn(move || {
				let sum = unsafe {
					invoker.invoke_serialized::<extern "C" fn(i32, i32) -> i32>(fixture::PATH, "add_two_ints", (i, i))
				}
				.unwrap();
				assert_eq!(sum.value, i * 2);
			});
		}
	});
}

#[test]
fn test_this_resolves_libc() {
	let lib = Library::this().unwrap();
	assert_eq!(lib.path(), Path::new(""));
	let sym = lib.symbol("strlen").unwrap();
	assert!(!sym.as_ptr().is_null());
}

#[test]
fn test_unsafe_signature_needs_unchecked_call() {
	use std::ffi::c_char;

	let lib = Library::this().unwrap();
	// size_t strlen(const char *s); `s` must be a valid C string
	let strlen = unsafe { lib.symbol("strlen").unwrap().to_fn::<unsafe extern "C" fn(*const c_char) -> usize>() };
	let len = unsafe { strlen.call_unchecked((b"dyninvoke\0".as_ptr().cast(),)) };
	assert_eq!(len, 9);
	let timed = unsafe { strlen.call_timed_unchecked((b"\0".as_ptr().cast(),)) };
	assert_eq!(timed.value, 0);
}
