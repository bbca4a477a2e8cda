use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crossbridge_types::{CallEnvelope, Codec, Error, PointerTables, Result};
use futures::FutureExt;
use futures::future::{self, BoxFuture};

type SyncInvoke<T> =
	dyn Fn(&T, &[u8], &PointerTables) -> Result<CallEnvelope> + Send + Sync + 'static;

type AsyncInvoke<T> = dyn Fn(Arc<T>, &[u8], &PointerTables) -> Result<BoxFuture<'static, Result<CallEnvelope>>>
	+ Send
	+ Sync
	+ 'static;

enum Kind<T: ?Sized> {
	Sync(Box<SyncInvoke<T>>),
	Async(Box<AsyncInvoke<T>>),
}

/// One method of a callback interface, invoked by index.
///
/// A method lifts its argument bytes as a tuple of its parameters, calls the
/// local object, and lowers the outcome: a return value becomes a success
/// envelope and a declared error becomes an error envelope. A panic inside the
/// local object becomes an internal error.
pub struct CallbackMethod<T: ?Sized> {
	name: &'static str,
	kind: Kind<T>,
}

impl<T: ?Sized> fmt::Debug for CallbackMethod<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CallbackMethod")
			.field("name", &self.name)
			.field("async", &self.is_async())
			.finish()
	}
}

impl<T: ?Sized> CallbackMethod<T> {
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub fn is_async(&self) -> bool {
		matches!(self.kind, Kind::Async(_))
	}
}

impl<T: ?Sized + Send + Sync + 'static> CallbackMethod<T> {
	/// Creates a method from a closure returning a value or a declared error.
	///
	/// # Parameters
	/// - `name`: The method name, used in diagnostics.
	/// - `f`: The closure invoked with the local object and the lifted arguments.
	///
	/// # Type Parameters
	/// - `A`: The argument tuple, in parameter order.
	/// - `R`: The return type.
	/// - `E`: The declared error type, or [`std::convert::Infallible`].
	pub fn new<A, R, E, F>(name: &'static str, f: F) -> Self
	where
		A: Codec + 'static,
		R: Codec + 'static,
		E: Codec + 'static,
		F: Fn(&T, A) -> Result<R, E> + Send + Sync + 'static,
	{
		Self {
			name,
			kind: Kind::Sync(Box::new(
				move |object: &T, args: &[u8], tables: &PointerTables| -> Result<CallEnvelope> {
					let args = A::lift_with(args, tables)?;
					match f(object, args) {
						Ok(v) => CallEnvelope::success(&v, tables),
						Err(e) => CallEnvelope::declared_error(&e, tables),
					}
				},
			)),
		}
	}

	/// Creates a method with no return value and no declared error.
	pub fn notify<A, F>(name: &'static str, f: F) -> Self
	where
		A: Codec + 'static,
		F: Fn(&T, A) + Send + Sync + 'static,
	{
		Self::new(name, move |object: &T, args: A| {
			f(object, args);
			Ok::<(), std::convert::Infallible>(())
		})
	}

	/// Creates a method whose local implementation is asynchronous.
	///
	/// The arguments are lifted before the future is created, so the inbound
	/// buffer is never held across an await point.
	///
	/// # Parameters
	/// - `name`: The method name, used in diagnostics.
	/// - `f`: The closure invoked with a shared reference to the local object and the lifted
	///   arguments, returning the future to drive.
	pub fn asynchronous<A, R, E, F, Fut>(name: &'static str, f: F) -> Self
	where
		A: Codec + 'static,
		R: Codec + 'static,
		E: Codec + 'static,
		F: Fn(Arc<T>, A) -> Fut + Send + Sync + 'static,
		Fut: Future<Output = Result<R, E>> + Send + 'static,
	{
		Self {
			name,
			kind: Kind::Async(Box::new(
				move |object: Arc<T>,
				      args: &[u8],
				      tables: &PointerTables|
				      -> Result<BoxFuture<'static, Result<CallEnvelope>>> {
					let args = A::lift_with(args, tables)?;
					let tables = tables.clone();
					let fut = f(object, args);
					Ok(async move {
						match fut.await {
							Ok(v) => CallEnvelope::success(&v, &tables),
							Err(e) => CallEnvelope::declared_error(&e, &tables),
						}
					}
					.boxed())
				},
			)),
		}
	}

	/// Invokes a synchronous method to completion.
	pub(crate) fn invoke(
		&self,
		interface: &str,
		object: &T,
		args: &[u8],
		tables: &PointerTables,
	) -> Result<CallEnvelope> {
		match &self.kind {
			Kind::Sync(f) => catch_unwind(AssertUnwindSafe(|| f(object, args, tables)))
				.unwrap_or_else(|payload| Err(self.panicked(interface, payload.as_ref()))),
			Kind::Async(_) => Err(Error::Internal(format!(
				"{interface}: callback {} is asynchronous and cannot be dispatched synchronously",
				self.name
			))),
		}
	}

	/// Invokes a method of either kind, returning a future for its outcome.
	pub(crate) fn invoke_async(
		&self,
		interface: &str,
		object: Arc<T>,
		args: &[u8],
		tables: &PointerTables,
	) -> BoxFuture<'static, Result<CallEnvelope>> {
		let Kind::Async(f) = &self.kind else {
			return future::ready(self.invoke(interface, &object, args, tables)).boxed();
		};
		let fut = match catch_unwind(AssertUnwindSafe(|| f(object, args, tables))) {
			Ok(Ok(fut)) => fut,
			Ok(Err(e)) => return future::ready(Err(e)).boxed(),
			Err(payload) => {
				return future::ready(Err(self.panicked(interface, payload.as_ref()))).boxed();
			}
		};
		let interface = interface.to_owned();
		let name = self.name;
		AssertUnwindSafe(fut)
			.catch_unwind()
			.map(move |res| {
				res.unwrap_or_else(|payload| {
					Err(Error::CallbackPanic {
						interface,
						method: name,
						message: panic_message(payload.as_ref()),
					})
				})
			})
			.boxed()
	}

	fn panicked(&self, interface: &str, payload: &(dyn Any + Send)) -> Error {
		Error::CallbackPanic {
			interface: interface.to_owned(),
			method: self.name,
			message: panic_message(payload),
		}
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		(*s).to_owned()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"panic with a non-string payload".to_owned()
	}
}
