//! Error types for the bridge.

use std::fmt;

use thiserror::Error;

/// The crate-wide result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A value was rejected by the local boundary check before any bytes were
/// written.
///
/// The item path records where in a nested value the problem was found. It is
/// built from the inside out as the error propagates through records
/// (`.field`), sequences (`[index]`) and call arguments (`name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
	/// What was wrong with the value
	pub reason: String,
	/// Where the offending item sits inside the value being lowered
	pub item: String,
}

impl TypeError {
	/// Create a new type error with an empty item path
	pub fn new(reason: impl Into<String>) -> Self {
		Self {
			reason: reason.into(),
			item: String::new(),
		}
	}

	/// Prepend a part to the item path
	pub fn with_item(mut self, part: impl AsRef<str>) -> Self {
		self.item.insert_str(0, part.as_ref());
		self
	}
}

impl fmt::Display for TypeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.item.is_empty() {
			write!(f, "{}", self.reason)
		} else {
			write!(f, "{}: {}", self.item, self.reason)
		}
	}
}

impl std::error::Error for TypeError {}

/// How an [`Error`] should be treated by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
	/// A local value could not be lowered; nothing crossed the boundary.
	Type,
	/// The two sides disagree about a buffer or a handle. Never recoverable.
	ContractViolation,
	/// A bridge-level defect or an unexpected failure on the other side.
	Internal,
}

/// An error raised by the bridge itself.
///
/// Declared errors of an operation are not represented here; they are carried
/// by [`CallError::Declared`](crate::CallError::Declared).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// A value failed the boundary type check
	#[error("Type error: {0}")]
	Type(#[from] TypeError),

	/// A read or write would run past the end of the buffer
	#[error(
		"Buffer overrun in {op}: {needed} bytes requested at offset {pos} of a {len} byte buffer"
	)]
	BufferOverrun {
		op: &'static str,
		pos: usize,
		needed: usize,
		len: usize,
	},

	/// The computed size and the bytes actually written disagree
	#[error("Size mismatch: size_of computed {computed} bytes but lower wrote {written}")]
	SizeMismatch {
		computed: usize,
		written: usize,
	},

	/// A lift finished before consuming the whole buffer
	#[error("Trailing bytes: lift consumed {consumed} of {len} bytes")]
	TrailingBytes {
		consumed: usize,
		len: usize,
	},

	/// A byte blob carried a negative length prefix
	#[error("Invalid byte blob length: {0}")]
	NegativeLength(i32),

	/// A callback handle is not known to its registry
	#[error("{interface}: invalid callback handle id: {handle}")]
	UnknownHandle {
		interface: String,
		handle: u64,
	},

	/// Text on the wire was not valid UTF-8
	#[error("Invalid UTF-8 text: {0}")]
	InvalidUtf8(String),

	/// A discriminant byte or index did not name a known variant
	#[error("Unexpected {type_name} tag: {tag}")]
	InvalidTag {
		type_name: &'static str,
		tag: i64,
	},

	/// A call envelope carried a status code this side does not understand
	#[error("Unexpected status code: {0}")]
	UnexpectedStatus(i8),

	/// A declared error arrived for an operation that declares none
	#[error("Received a declared error for an operation without a declared error type")]
	NoDeclaredError,

	/// No pointer table is registered under the requested id
	#[error("No pointer table registered with id {0}")]
	MissingPointerTable(u32),

	/// A pointer table did not recognise a pointer token
	#[error("{table}: unknown pointer token {token:#018x}")]
	UnknownPointer {
		table: String,
		token: u64,
	},

	/// A callback method index is not part of the interface
	#[error("{interface}: invalid method id: {method}")]
	UnknownMethod {
		interface: String,
		method: u32,
	},

	/// An interface id was registered twice with the same router
	#[error("A callback handler is already registered for interface id {0}")]
	DuplicateInterface(u32),

	/// No callback handler is registered for an interface id
	#[error("No callback handler registered for interface id {0}")]
	UnknownInterface(u32),

	/// New callbacks were refused because the registry has been quiesced
	#[error("No new callbacks allowed for {0}")]
	RegistrationClosed(String),

	/// A local callback method panicked
	#[error("{interface}: internal error invoking callback {method}: {message}")]
	CallbackPanic {
		interface: String,
		method: &'static str,
		message: String,
	},

	/// Callback objects were still registered when the registry was audited
	#[error(
		"Callback interface {interface} has {count} registered callbacks at shutdown. This likely indicates a callback leak.\nRegistration site for the first leaked callback (handle {handle}):\n{site}"
	)]
	LeakedCallbacks {
		interface: String,
		count: usize,
		handle: u64,
		site: String,
	},

	/// The bridge encountered unreachable logic
	#[error("Internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Returns how this error should be treated.
	pub fn category(&self) -> ErrorCategory {
		match self {
			Self::Type(_) => ErrorCategory::Type,
			Self::BufferOverrun {
				..
			}
			| Self::SizeMismatch {
				..
			}
			| Self::TrailingBytes {
				..
			}
			| Self::NegativeLength(_)
			| Self::UnknownHandle {
				..
			} => ErrorCategory::ContractViolation,
			_ => ErrorCategory::Internal,
		}
	}

	/// Checks if this error is a local type-check failure.
	pub fn is_type_error(&self) -> bool {
		self.category() == ErrorCategory::Type
	}

	/// Checks if this error is a buffer or handle contract violation.
	pub fn is_contract_violation(&self) -> bool {
		self.category() == ErrorCategory::ContractViolation
	}

	/// Checks if this error is an internal bridge error.
	pub fn is_internal(&self) -> bool {
		self.category() == ErrorCategory::Internal
	}
}
