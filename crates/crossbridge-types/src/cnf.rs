use std::sync::LazyLock;

/// The largest buffer a single lower may produce (default: 2147483647 bytes)
///
/// Sequence counts and blob lengths are carried as `i32`, so anything larger
/// could never be described on the wire.
pub static MAX_BUFFER_SIZE: LazyLock<usize> =
	lazy_env_parse!("CROSSBRIDGE_MAX_BUFFER_SIZE", usize, i32::MAX.unsigned_abs() as usize);
