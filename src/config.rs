// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
use std::env;
use std::path::{Path, PathBuf};

/// Environment variable read by [`Config::from_env`].
pub const LIBRARY_DIR_VAR: &str = "DYNINVOKE_LIBRARY_DIR";

/// Where relative library paths are resolved from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
	base_dir: Option<PathBuf>,
}

impl Config {
	/// No base directory: relative paths go to the platform loader unchanged,
	/// so its own search rules apply.
	#[inline]
	pub const fn new() -> Self {
		Self { base_dir: None }
	}

	/// Reads the base directory from `DYNINVOKE_LIBRARY_DIR`. Unset or empty
	/// means no base directory.
	pub fn from_env() -> Self {
		let base_dir = env::var_os(LIBRARY_DIR_VAR)
			.filter(|dir| !dir.is_empty())
			.map(PathBuf::from);
		Self { base_dir }
	}

	#[must_use]
	pub fn with_base_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
		self.base_dir = Some(dir.into());
		self
	}

	#[inline]
	pub fn base_dir(&self) -> Option<&Path> {
		self.base_dir.as_deref()
	}

	/// Absolute paths are returned as they are; relative paths are joined to
	/// the base directory when one is set.
	///
	/// Bare file names with no base directory are left alone. Passing a full
	/// path is the safer choice, since a bare name is subject to the platform
	/// search order.
	pub fn resolve<P: AsRef<Path>>(&self, path: P) -> PathBuf {
		let path = path.as_ref();
		match &self.base_dir {
			Some(base) if path.is_relative() => base.join(path),
			_ => path.to_owned(),
		}
	}
}

/// The platform file name for a library called `stem`: `libstem.so`,
/// `libstem.dylib` or `stem.dll`.
pub fn library_filename(stem: &str) -> String {
	format!("{}{stem}{}", env::consts::DLL_PREFIX, env::consts::DLL_SUFFIX)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn relative_paths_join_the_base_dir() {
		let config = Config::new().with_base_dir("assets");
		assert_eq!(
			config.resolve("Dll_loop.dll"),
			Path::new("assets").join("Dll_loop.dll")
		);
	}

	#[test]
	fn absolute_paths_are_untouched() {
		let absolute = env::temp_dir().join("libloops.so");
		let config = Config::new().with_base_dir("assets");
		assert_eq!(config.resolve(&absolute), absolute);
	}

	#[test]
	fn no_base_dir_passes_names_through() {
		assert_eq!(Config::new().resolve("libm.so.6"), PathBuf::from("libm.so.6"));
		assert_eq!(Config::default().base_dir(), None);
	}

	#[test]
	fn filename_follows_platform_convention() {
		let name = library_filename("fixture");
		assert!(name.contains("fixture"));
		assert!(name.ends_with(env::consts::DLL_SUFFIX));
	}
}
