//! Compiles `native/fixture.c` into a shared library with the host C compiler.

use std::env;
use std::path::PathBuf;
use std::process::Command;

fn main() {
	println!("cargo:rerun-if-changed=build.rs");
	println!("cargo:rerun-if-changed=native/fixture.c");
	println!("cargo:rerun-if-env-changed=CC");

	// Fixture-backed tests only run on unix; elsewhere the path stays empty.
	if env::var_os("CARGO_CFG_UNIX").is_none() {
		println!("cargo:rustc-env=DYNINVOKE_FIXTURE_PATH=");
		return;
	}

	let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
	let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
	let file_name = if target_os == "macos" || target_os == "ios" {
		"libdyninvoke_fixture.dylib"
	} else {
		"libdyninvoke_fixture.so"
	};
	let lib_path = out_dir.join(file_name);

	let cc = env::var("CC").unwrap_or_else(|_| "cc".to_string());
	let status = Command::new(&cc)
		.args(["-shared", "-fPIC", "-O0", "-o"])
		.arg(&lib_path)
		.arg("native/fixture.c")
		.status()
		.unwrap_or_else(|err| panic!("failed to run `{cc}`: {err}"));
	assert!(status.success(), "`{cc}` failed to build the fixture library");

	println!("cargo:rustc-env=DYNINVOKE_FIXTURE_PATH={}", lib_path.display());
}
