//! Local objects exposed to the other side behind integer handles.

mod method;
mod site;

pub use method::CallbackMethod;
pub use site::RegistrationSite;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crossbridge_types::{Buffer, CallEnvelope, Error, Handle, PointerTables, Result};
use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::cnf::CALLBACK_BACKTRACES;
use crate::sink::{DiagnosticSink, TracingSink};

/// The method index the other side uses to drop its last reference to a
/// handle. It never reaches a local method.
pub const RELEASE_METHOD: u32 = 0;

struct Entry<T: ?Sized> {
	object: Arc<T>,
	site: RegistrationSite,
}

struct Table<T: ?Sized> {
	/// The next handle to issue
	counter: u64,
	entries: BTreeMap<Handle, Entry<T>>,
	accepting: bool,
}

/// The handle table of one callback interface.
///
/// Every operation that touches the table takes the same lock, but the lock
/// is never held while a local method runs, so a callback may register or
/// release other callbacks on the same registry.
pub struct CallbackRegistry<T: ?Sized> {
	name: String,
	methods: Vec<CallbackMethod<T>>,
	table: Mutex<Table<T>>,
	tables: PointerTables,
	sink: Arc<dyn DiagnosticSink>,
	backtraces: bool,
}

impl<T: ?Sized> fmt::Debug for CallbackRegistry<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let table = self.table.lock();
		f.debug_struct("CallbackRegistry")
			.field("name", &self.name)
			.field("methods", &self.methods)
			.field("registered", &table.entries.len())
			.field("accepting", &table.accepting)
			.finish()
	}
}

impl<T: ?Sized + Send + Sync + 'static> CallbackRegistry<T> {
	/// Creates a registry for one interface.
	///
	/// `methods` is the interface's ordered method list: method index `i`
	/// invokes `methods[i - 1]`, index `0` being [`RELEASE_METHOD`].
	pub fn new(name: impl Into<String>, methods: Vec<CallbackMethod<T>>) -> Self {
		Self {
			name: name.into(),
			methods,
			table: Mutex::new(Table {
				counter: 0,
				entries: BTreeMap::new(),
				accepting: true,
			}),
			tables: PointerTables::new(),
			sink: Arc::new(TracingSink),
			backtraces: *CALLBACK_BACKTRACES,
		}
	}

	/// Sets the pointer tables used to lift arguments and lower results.
	pub fn with_pointer_tables(mut self, tables: PointerTables) -> Self {
		self.tables = tables;
		self
	}

	/// Sets where dispatch failures are reported.
	pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
		self.sink = sink;
		self
	}

	/// Sets whether registrations capture a full backtrace.
	pub fn with_backtraces(mut self, backtraces: bool) -> Self {
		self.backtraces = backtraces;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Stores an object and returns its new handle.
	///
	/// # Errors
	///
	/// Fails with [`Error::RegistrationClosed`] once the registry has been
	/// quiesced.
	#[track_caller]
	pub fn register(&self, object: Arc<T>) -> Result<Handle> {
		let site = RegistrationSite::capture(self.backtraces);
		let mut table = self.table.lock();
		if !table.accepting {
			return Err(Error::RegistrationClosed(self.name.clone()));
		}
		let handle = Handle::new(table.counter);
		table.counter += 1;
		table.entries.insert(handle, Entry {
			object,
			site,
		});
		trace!(interface = %self.name, %handle, "Registered callback");
		Ok(handle)
	}

	/// Lowers a local object as a callback argument: the object is registered
	/// and its handle is what crosses the boundary.
	#[track_caller]
	pub fn lower(&self, object: Arc<T>) -> Result<Handle> {
		self.register(object)
	}

	/// Looks up the object behind a handle.
	///
	/// An unknown handle always means the two sides disagree, so it is
	/// reported as a contract violation.
	pub fn resolve(&self, handle: Handle) -> Result<Arc<T>> {
		self.table
			.lock()
			.entries
			.get(&handle)
			.map(|e| e.object.clone())
			.ok_or_else(|| self.unknown_handle(handle))
	}

	/// Removes a handle. Releasing the same handle twice fails.
	pub fn release(&self, handle: Handle) -> Result<()> {
		let removed = self.table.lock().entries.remove(&handle);
		match removed {
			Some(_) => {
				trace!(interface = %self.name, %handle, "Released callback");
				Ok(())
			}
			None => Err(self.unknown_handle(handle)),
		}
	}

	fn unknown_handle(&self, handle: Handle) -> Error {
		Error::UnknownHandle {
			interface: self.name.clone(),
			handle: handle.get(),
		}
	}

	fn method(&self, index: u32) -> Result<&CallbackMethod<T>> {
		usize::try_from(index)
			.ok()
			.and_then(|i| i.checked_sub(1))
			.and_then(|i| self.methods.get(i))
			.ok_or_else(|| Error::UnknownMethod {
				interface: self.name.clone(),
				method: index,
			})
	}

	/// Invokes method `index` on the object behind `handle`, returning any
	/// bridge failure to the caller.
	pub fn try_dispatch(&self, handle: Handle, index: u32, args: &[u8]) -> Result<CallEnvelope> {
		if index == RELEASE_METHOD {
			self.release(handle)?;
			return Ok(CallEnvelope::Success(Buffer::empty()));
		}
		let object = self.resolve(handle)?;
		let method = self.method(index)?;
		trace!(interface = %self.name, %handle, method = method.name(), "Dispatching callback");
		method.invoke(&self.name, &object, args, &self.tables)
	}

	/// Invokes method `index` on the object behind `handle`.
	///
	/// This never fails. A bridge failure, such as an unknown handle or
	/// malformed argument bytes, is reported to the diagnostic sink and
	/// answered with an internal error envelope. A declared error of the
	/// method is answered with an error envelope.
	pub fn dispatch(&self, handle: Handle, index: u32, args: &[u8]) -> CallEnvelope {
		let result = self.try_dispatch(handle, index, args);
		self.settle(handle, index, result)
	}

	/// The asynchronous counterpart of [`dispatch`](Self::dispatch).
	///
	/// Methods of either kind may be dispatched this way.
	pub async fn dispatch_async(&self, handle: Handle, index: u32, args: &[u8]) -> CallEnvelope {
		let result = match self.prepare_async(handle, index, args) {
			Ok(Some(fut)) => fut.await,
			Ok(None) => Ok(CallEnvelope::Success(Buffer::empty())),
			Err(e) => Err(e),
		};
		self.settle(handle, index, result)
	}

	fn prepare_async(
		&self,
		handle: Handle,
		index: u32,
		args: &[u8],
	) -> Result<Option<BoxFuture<'static, Result<CallEnvelope>>>> {
		if index == RELEASE_METHOD {
			self.release(handle)?;
			return Ok(None);
		}
		let object = self.resolve(handle)?;
		let method = self.method(index)?;
		trace!(interface = %self.name, %handle, method = method.name(), "Dispatching callback");
		Ok(Some(method.invoke_async(&self.name, object, args, &self.tables)))
	}

	fn settle(&self, handle: Handle, index: u32, result: Result<CallEnvelope>) -> CallEnvelope {
		match result {
			Ok(envelope) => {
				if let CallEnvelope::DeclaredError(_) = envelope {
					debug!(
						interface = %self.name,
						%handle,
						method = index,
						"Callback returned a declared error"
					);
				}
				envelope
			}
			Err(e) => {
				self.sink.report(&self.name, &e);
				CallEnvelope::internal_error(e.to_string())
			}
		}
	}

	/// Refuses any further registration. Existing handles keep working so
	/// that calls already in flight can finish.
	pub fn quiesce(&self) {
		let mut table = self.table.lock();
		table.accepting = false;
		debug!(
			interface = %self.name,
			registered = table.entries.len(),
			"Quiesced callback registry"
		);
	}

	/// Fails if any callback is still registered.
	///
	/// The error names the registration site of the oldest surviving handle.
	pub fn audit_no_leaks(&self) -> Result<()> {
		let table = self.table.lock();
		match table.entries.iter().next() {
			None => Ok(()),
			Some((handle, entry)) => Err(Error::LeakedCallbacks {
				interface: self.name.clone(),
				count: table.entries.len(),
				handle: handle.get(),
				site: entry.site.to_string(),
			}),
		}
	}

	/// Drops every registered object. Handles already issued are not reused.
	///
	/// The objects are dropped after the lock is released, so a `Drop` impl
	/// may call back into this registry.
	pub fn deregister_all(&self) {
		let mut table = self.table.lock();
		debug!(
			interface = %self.name,
			registered = table.entries.len(),
			"Deregistering all callbacks"
		);
		let entries = std::mem::take(&mut table.entries);
		drop(table);
		drop(entries);
	}

	pub fn has_registered_callbacks(&self) -> bool {
		!self.table.lock().entries.is_empty()
	}

	/// The number of live handles.
	pub fn len(&self) -> usize {
		self.table.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		!self.has_registered_callbacks()
	}

	pub fn is_accepting(&self) -> bool {
		self.table.lock().accepting
	}
}

#[cfg(test)]
mod tests {
	use std::convert::Infallible;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::{OnceLock, Weak, mpsc};
	use std::thread;
	use std::time::Duration;

	use crossbridge_types::Codec;

	use super::*;

	#[derive(Default)]
	struct Counter(AtomicU32);

	fn registry() -> CallbackRegistry<Counter> {
		CallbackRegistry::new(
			"Counter",
			vec![
				CallbackMethod::notify("add", |c: &Counter, (n,): (u32,)| {
					c.0.fetch_add(n, Ordering::SeqCst);
				}),
				CallbackMethod::new("get", |c: &Counter, (): ()| {
					Ok::<_, Infallible>(c.0.load(Ordering::SeqCst))
				}),
			],
		)
	}

	#[test]
	fn handles_start_at_zero_and_increase() {
		let reg = registry();
		assert_eq!(reg.register(Arc::default()).unwrap(), Handle::new(0));
		assert_eq!(reg.register(Arc::default()).unwrap(), Handle::new(1));
		assert_eq!(reg.len(), 2);
	}

	#[test]
	fn handles_are_never_reused() {
		let reg = registry();
		let a = reg.register(Arc::default()).unwrap();
		reg.release(a).unwrap();
		reg.deregister_all();
		let b = reg.register(Arc::default()).unwrap();
		assert_ne!(a, b);
		assert_eq!(b, Handle::new(1));
	}

	#[test]
	fn callbacks_can_register_on_their_own_registry() {
		let slot: Arc<OnceLock<Weak<CallbackRegistry<Counter>>>> = Arc::default();
		let inner = slot.clone();
		let reg = Arc::new(CallbackRegistry::new(
			"Counter",
			vec![CallbackMethod::notify("spawn", move |_: &Counter, (): ()| {
				if let Some(reg) = inner.get().and_then(Weak::upgrade) {
					reg.register(Arc::default()).unwrap();
				}
			})],
		));
		slot.set(Arc::downgrade(&reg)).unwrap();
		let handle = reg.register(Arc::default()).unwrap();
		reg.try_dispatch(handle, 1, &[]).unwrap();
		assert_eq!(reg.len(), 2);
	}

	#[test]
	fn method_indices_are_one_based() {
		let reg = registry();
		let handle = reg.register(Arc::default()).unwrap();
		let args = (5u32,).lower().unwrap();
		reg.try_dispatch(handle, 1, &args).unwrap();
		let envelope = reg.try_dispatch(handle, 2, &[]).unwrap();
		assert_eq!(envelope, CallEnvelope::Success(5u32.lower().unwrap()));
		assert!(matches!(
			reg.try_dispatch(handle, 3, &[]),
			Err(Error::UnknownMethod {
				method: 3,
				..
			})
		));
	}

	/// Releases a sibling handle when dropped.
	struct Holder {
		registry: Weak<CallbackRegistry<Holder>>,
		sibling: Option<Handle>,
		released: Arc<AtomicU32>,
	}

	impl Drop for Holder {
		fn drop(&mut self) {
			if let (Some(reg), Some(sibling)) = (self.registry.upgrade(), self.sibling) {
				// The sibling may already be gone
				let _ = reg.release(sibling);
				self.released.fetch_add(1, Ordering::SeqCst);
			}
		}
	}

	#[test]
	fn deregister_all_drops_objects_outside_the_lock() {
		let reg = Arc::new(CallbackRegistry::<Holder>::new("Holder", vec![]));
		let released = Arc::new(AtomicU32::new(0));
		let holder = |sibling| {
			Arc::new(Holder {
				registry: Arc::downgrade(&reg),
				sibling,
				released: released.clone(),
			})
		};
		let leaf = reg.register(holder(None)).unwrap();
		reg.register(holder(Some(leaf))).unwrap();
		let (tx, rx) = mpsc::channel();
		let worker = reg.clone();
		thread::spawn(move || {
			worker.deregister_all();
			tx.send(()).unwrap();
		});
		rx.recv_timeout(Duration::from_secs(5)).unwrap();
		assert_eq!(released.load(Ordering::SeqCst), 1);
		assert!(reg.is_empty());
	}

	#[test]
	fn release_drops_objects_outside_the_lock() {
		let reg = Arc::new(CallbackRegistry::<Holder>::new("Holder", vec![]));
		let released = Arc::new(AtomicU32::new(0));
		let leaf = reg
			.register(Arc::new(Holder {
				registry: Weak::new(),
				sibling: None,
				released: released.clone(),
			}))
			.unwrap();
		let owner = reg
			.register(Arc::new(Holder {
				registry: Arc::downgrade(&reg),
				sibling: Some(leaf),
				released: released.clone(),
			}))
			.unwrap();
		reg.release(owner).unwrap();
		assert_eq!(released.load(Ordering::SeqCst), 1);
		assert!(reg.resolve(leaf).is_err());
	}
}
