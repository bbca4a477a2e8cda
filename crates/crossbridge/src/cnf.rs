use std::sync::LazyLock;

use crossbridge_types::lazy_env_parse;

/// Whether to capture a full backtrace when a callback is registered (default: false)
///
/// The caller location is always recorded. A backtrace makes leak reports far
/// easier to follow but is expensive to capture on every registration.
pub static CALLBACK_BACKTRACES: LazyLock<bool> =
	lazy_env_parse!("CROSSBRIDGE_CALLBACK_BACKTRACES", bool, false);
