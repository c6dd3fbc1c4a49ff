#![cfg(windows)]

use dyninvoke::*;

static KERNEL32: Binding = Binding::new(&["Kernel32.dll"]);

#[test]
fn test_bind_last_error() {
	#[bind(library = KERNEL32)]
	extern "system" {
		fn SetLastError(code: u32);
		fn GetLastError() -> u32;
	}

	unsafe {
		// resolve both first; a lookup resets the thread's last error
		SetLastError(0);
		let _ = GetLastError();
		SetLastError(53);
		assert_eq!(GetLastError(), 53);
	}
}

#[test]
fn test_bind_link_name() {
	#[bind(library = KERNEL32, link_name = "GetCurrentProcessId")]
	extern "system" {
		fn current_process_id() -> u32;
	}

	assert_eq!(unsafe { current_process_id() }, std::process::id());
}

#[test]
fn test_invoke_kernel32() {
	let invoker = Invoker::default();
	let pid = unsafe { invoker.invoke::<extern "system" fn() -> u32>("Kernel32.dll", "GetCurrentProcessId", ()) }
		.unwrap();
	assert_eq!(pid.value, std::process::id());
}

#[test]
fn test_missing_dll() {
	let err = Library::open("dyninvoke_not_here.dll").unwrap_err();
	// ERROR_MOD_NOT_FOUND
	assert_eq!(err.code(), Some(126));
}

#[test]
fn test_symbol_not_found() {
	let lib = Library::open("Kernel32.dll").unwrap();
	let err = lib.symbol("NoSuchExport").unwrap_err();
	assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
}
