// Copyright (c) 2023 Jonathan "Razordor" Alan Thomason
//! Platform loader primitives.
//!
//! Every function here reads the platform's error channel (`errno`/`dlerror` or
//! `GetLastError`) immediately after the failing call and hands it back as an
//! [`OsError`], so nothing above this module ever touches ambient error state.

#[cfg(unix)]
pub(crate) mod unix;
#[cfg(windows)]
pub(crate) mod windows;

#[cfg(unix)]
pub(crate) use unix as imp;
#[cfg(windows)]
pub(crate) use windows as imp;

use std::{ffi, ptr::NonNull};

/// A non-null platform library handle (`void*` from `dlopen`, `HMODULE` on windows).
pub(crate) type Handle = NonNull<ffi::c_void>;

/// Reported when the platform failed but left no diagnostic code behind.
pub(crate) const UNKNOWN_CODE: i32 = -1;

/// Upper bound on translated diagnostic text, in characters.
pub(crate) const MAX_MESSAGE_LEN: usize = 255;

/// Diagnostic captured at the failure site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OsError {
	pub code: i32,
	pub message: String,
}

impl OsError {
	pub(crate) fn new(code: i32, message: Option<String>) -> Self {
		let code = if code == 0 { UNKNOWN_CODE } else { code };
		let message = match message {
			Some(text) if !text.trim().is_empty() => bounded(text),
			_ => describe_or_fallback(code),
		};
		Self { code, message }
	}
}

/// Best-effort platform text for `code`, never longer than [`MAX_MESSAGE_LEN`].
pub(crate) fn describe_or_fallback(code: i32) -> String {
	match imp::describe(code) {
		Some(text) if !text.trim().is_empty() => bounded(text),
		_ => format!("error code {code}"),
	}
}

fn bounded(text: String) -> String {
	let text = text.trim_end();
	match text.char_indices().nth(MAX_MESSAGE_LEN) {
		Some((end, _)) => text[..end].to_owned(),
		None => text.to_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_code_is_never_reported() {
		let err = OsError::new(0, Some("boom".to_owned()));
		assert_eq!(err.code, UNKNOWN_CODE);
		assert_eq!(err.message, "boom");
	}

	#[test]
	fn empty_message_falls_back_to_code_text() {
		let err = OsError::new(UNKNOWN_CODE, Some("  ".to_owned()));
		assert!(!err.message.trim().is_empty());
	}

	#[test]
	fn long_messages_are_bounded() {
		let long = "x".repeat(MAX_MESSAGE_LEN * 2);
		let err = OsError::new(7, Some(long));
		assert_eq!(err.message.chars().count(), MAX_MESSAGE_LEN);
	}
}
