#![cfg(unix)]
//! Kept in its own binary: `outstanding` is process-wide and other tests would race it.

use dyninvoke::*;
use dyninvoke_fixture as fixture;

#[test]
fn test_no_handles_leak() {
	let before = outstanding();
	let invoker = Invoker::default();
	for _ in 0..10 {
		let sum = unsafe { invoker.invoke::<extern "C" fn(i32, i32) -> i32>(fixture::PATH, "add_two_ints", (1, 2)) }
			.unwrap();
		assert_eq!(sum.value, 3);
		assert!(unsafe { invoker.invoke::<extern "C" fn() -> i32>(fixture::PATH, "nonexistent", ()) }.is_err());
	}
	assert_eq!(outstanding(), before);

	let lib = Library::open(fixture::PATH).unwrap();
	assert_eq!(outstanding(), before + 1);
	drop(lib);
	assert_eq!(outstanding(), before);

	let mut lib = Library::new(fixture::PATH);
	lib.load().unwrap();
	lib.load().unwrap();
	assert_eq!(outstanding(), before + 1);
	lib.release().unwrap();
	lib.release().unwrap();
	assert_eq!(outstanding(), before);
}
