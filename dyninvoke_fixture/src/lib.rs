//! A small native library for exercising dyninvoke.
//!
//! Exports (C ABI):
//!
//! | name                    | signature                                  |
//! |-------------------------|--------------------------------------------|
//! | `add_two_ints`          | `int (int, int)`                           |
//! | `loop1`                 | `int64_t (void)`, light workload           |
//! | `loop2`                 | `int64_t (void)`, heavy workload           |
//! | `loop_double_precision` | `double (int64_t, bool, double)`           |
//! | `session_counter`       | `int (void)`, calls since the library loaded |

/// Absolute path of the built library. Empty on targets without a fixture.
pub const PATH: &str = env!("DYNINVOKE_FIXTURE_PATH");

/// Copies the library into `dir` under `name` and returns the new path.
///
/// A fresh copy is a distinct file to the loader, so its state is independent
/// of any other loaded copy.
pub fn copy_to(dir: &std::path::Path, name: &str) -> std::io::Result<std::path::PathBuf> {
	let dest = dir.join(name);
	std::fs::copy(PATH, &dest)?;
	Ok(dest)
}
