//! The tagged outcome of one cross-boundary call.

use std::fmt;

use thiserror::Error;

use crate::buffer::Buffer;
use crate::codec::Codec;
use crate::err::{Error, Result};
use crate::pointer::PointerTables;

/// The message raised for an internal error that carries no payload.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// The status code carried alongside every call result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum CallStatus {
	Success = 0,
	Error = 1,
	InternalError = 2,
}

impl CallStatus {
	/// Decodes a status code. Unknown codes are never coerced into a known status.
	pub fn from_code(code: i8) -> Result<Self> {
		match code {
			0 => Ok(Self::Success),
			1 => Ok(Self::Error),
			2 => Ok(Self::InternalError),
			code => Err(Error::UnexpectedStatus(code)),
		}
	}

	pub fn as_code(self) -> i8 {
		self as i8
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::Error => "error",
			Self::InternalError => "internal-error",
		}
	}
}

impl fmt::Display for CallStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A call result exactly as the transport delivers it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawCallResult {
	pub code: i8,
	pub data: Option<Buffer>,
}

/// Exactly one of the three outcomes of a call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallEnvelope {
	/// The lowered return value.
	Success(Buffer),
	/// The lowered declared error of the operation.
	DeclaredError(Buffer),
	/// Plain UTF-8 text with no length prefix, or nothing at all.
	InternalError(Option<Buffer>),
}

impl TryFrom<RawCallResult> for CallEnvelope {
	type Error = Error;

	fn try_from(raw: RawCallResult) -> Result<Self> {
		let status = CallStatus::from_code(raw.code)?;
		Ok(match status {
			CallStatus::Success => Self::Success(raw.data.unwrap_or_default()),
			CallStatus::Error => Self::DeclaredError(raw.data.unwrap_or_default()),
			CallStatus::InternalError => Self::InternalError(raw.data),
		})
	}
}

impl From<CallEnvelope> for RawCallResult {
	fn from(envelope: CallEnvelope) -> Self {
		envelope.into_raw()
	}
}

impl CallEnvelope {
	/// Lowers a return value into a success envelope.
	pub fn success<T: Codec>(value: &T, tables: &PointerTables) -> Result<Self> {
		Ok(Self::Success(value.lower_with(tables)?))
	}

	/// Lowers a declared error into an error envelope.
	pub fn declared_error<E: Codec>(error: &E, tables: &PointerTables) -> Result<Self> {
		Ok(Self::DeclaredError(error.lower_with(tables)?))
	}

	/// Builds an internal error envelope carrying a message.
	pub fn internal_error(message: impl AsRef<str>) -> Self {
		Self::InternalError(Some(Buffer::from(message.as_ref().as_bytes().to_vec())))
	}

	pub fn status(&self) -> CallStatus {
		match self {
			Self::Success(_) => CallStatus::Success,
			Self::DeclaredError(_) => CallStatus::Error,
			Self::InternalError(_) => CallStatus::InternalError,
		}
	}

	pub fn into_raw(self) -> RawCallResult {
		let code = self.status().as_code();
		let data = match self {
			Self::Success(buf) | Self::DeclaredError(buf) => Some(buf),
			Self::InternalError(buf) => buf,
		};
		RawCallResult {
			code,
			data,
		}
	}

	/// Routes the envelope to its local effect.
	///
	/// A success payload is lifted as `T` and returned. A declared error payload
	/// is lifted as `E` and raised as [`CallError::Declared`]. An internal error
	/// is raised as [`CallError::Internal`] with its text, or with
	/// [`UNKNOWN_ERROR`] when it carries no payload. An empty payload is empty
	/// text.
	pub fn resolve<T: Codec, E: Codec>(self, tables: &PointerTables) -> Result<T, CallError<E>> {
		match self {
			Self::Success(buf) => Ok(T::lift_with(&buf, tables)?),
			Self::DeclaredError(buf) => Err(CallError::Declared(E::lift_with(&buf, tables)?)),
			Self::InternalError(Some(buf)) => {
				Err(CallError::Internal(String::from_utf8_lossy(&buf).into_owned()))
			}
			Self::InternalError(None) => Err(CallError::Internal(UNKNOWN_ERROR.to_owned())),
		}
	}
}

/// The fault raised by a failed cross-boundary call.
#[derive(Error, Debug)]
pub enum CallError<E> {
	/// The operation returned one of its declared errors.
	#[error("{0}")]
	Declared(E),
	/// The other side reported an internal failure.
	#[error("Internal error: {0}")]
	Internal(String),
	/// The bridge itself failed while lowering, lifting or routing the call.
	#[error(transparent)]
	Bridge(#[from] Error),
}

impl<E> CallError<E> {
	pub fn is_declared(&self) -> bool {
		matches!(self, Self::Declared(_))
	}

	pub fn is_internal(&self) -> bool {
		matches!(self, Self::Internal(_))
	}

	/// Returns the declared error, if this is one.
	pub fn into_declared(self) -> Option<E> {
		match self {
			Self::Declared(e) => Some(e),
			_ => None,
		}
	}
}

/// Resolves a transport result into the call's return value or fault.
pub fn handle_result<T: Codec, E: Codec>(
	raw: RawCallResult,
	tables: &PointerTables,
) -> Result<T, CallError<E>> {
	CallEnvelope::try_from(raw)?.resolve(tables)
}
