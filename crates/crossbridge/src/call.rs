//! Outbound calls to the other side of the boundary.
//!
//! The bridge does not move bytes itself. The host supplies a [`Transport`]
//! (or an [`AsyncTransport`]) which delivers one argument buffer to the named
//! function and hands back the tagged result. Everything on either side of
//! that hop, lowering the arguments and resolving the envelope, happens here.

use anyhow::Result;
use async_trait::async_trait;
use crossbridge_types::{Buffer, CallError, Codec, PointerTables, RawCallResult, handle_result};

/// Identifies one function exported by the other side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallTarget {
	pub module_id: u32,
	pub function_id: u32,
}

impl CallTarget {
	pub const fn new(module_id: u32, function_id: u32) -> Self {
		Self {
			module_id,
			function_id,
		}
	}
}

/// Delivers calls synchronously.
///
/// # Example
///
/// ```rust,ignore
/// struct Loopback;
///
/// impl Transport for Loopback {
///     fn call_sync(&self, target: CallTarget, args: Buffer) -> Result<RawCallResult> {
///         Ok(CallEnvelope::Success(args).into_raw())
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
	/// Invoke a function with a lowered argument buffer.
	///
	/// # Errors
	///
	/// Returns an error if the call could not be delivered at all. A call that
	/// was delivered and failed on the other side is reported through the
	/// status code of the returned result instead.
	fn call_sync(&self, target: CallTarget, args: Buffer) -> Result<RawCallResult>;
}

/// Delivers calls asynchronously.
///
/// The argument buffer is fully lowered before the call is issued and the
/// result is lifted only after it completes, so a buffer is never shared by
/// two logical calls.
#[async_trait]
pub trait AsyncTransport: Send + Sync {
	/// Invoke a function with a lowered argument buffer (async).
	///
	/// # Errors
	///
	/// Returns an error if the call could not be delivered at all.
	async fn call_async(&self, target: CallTarget, args: Buffer) -> Result<RawCallResult>;
}

fn transport_failure<E>(target: CallTarget, err: &anyhow::Error) -> CallError<E> {
	debug!(
		module_id = target.module_id,
		function_id = target.function_id,
		"Transport failed to deliver call: {err:#}"
	);
	CallError::Internal(format!("{err:#}"))
}

/// Lowers the arguments, calls the target and resolves the outcome.
///
/// Arguments are a tuple of the operation's parameters, in order. Operations
/// without a declared error use [`std::convert::Infallible`] for `E`.
pub fn call<A, T, E>(
	transport: &dyn Transport,
	tables: &PointerTables,
	target: CallTarget,
	args: &A,
) -> Result<T, CallError<E>>
where
	A: Codec,
	T: Codec,
	E: Codec,
{
	let args = args.lower_with(tables)?;
	trace!(
		module_id = target.module_id,
		function_id = target.function_id,
		"Calling with {} argument bytes",
		args.len()
	);
	let raw = transport.call_sync(target, args).map_err(|e| transport_failure(target, &e))?;
	handle_result(raw, tables)
}

/// The asynchronous counterpart of [`call`].
pub async fn call_async<A, T, E>(
	transport: &dyn AsyncTransport,
	tables: &PointerTables,
	target: CallTarget,
	args: &A,
) -> Result<T, CallError<E>>
where
	A: Codec,
	T: Codec,
	E: Codec,
{
	let args = args.lower_with(tables)?;
	trace!(
		module_id = target.module_id,
		function_id = target.function_id,
		"Calling with {} argument bytes",
		args.len()
	);
	let raw =
		transport.call_async(target, args).await.map_err(|e| transport_failure(target, &e))?;
	handle_result(raw, tables)
}
