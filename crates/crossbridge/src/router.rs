//! Routing of inbound callback calls to the registry of their interface.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use crossbridge_types::{CallEnvelope, Error, Handle, Result};
use parking_lot::RwLock;

use crate::registry::CallbackRegistry;
use crate::sink::{DiagnosticSink, TracingSink};

/// Identifies one callback interface on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceId(pub u32);

impl fmt::Display for InterfaceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// The object-safe face of a [`CallbackRegistry`], whatever its object type.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
	fn interface(&self) -> &str;

	fn dispatch(&self, handle: Handle, method: u32, args: &[u8]) -> CallEnvelope;

	async fn dispatch_async(&self, handle: Handle, method: u32, args: &[u8]) -> CallEnvelope;

	fn quiesce(&self);

	fn audit_no_leaks(&self) -> Result<()>;

	fn deregister_all(&self);

	fn has_registered_callbacks(&self) -> bool;
}

#[async_trait]
impl<T: ?Sized + Send + Sync + 'static> CallbackHandler for CallbackRegistry<T> {
	fn interface(&self) -> &str {
		self.name()
	}

	fn dispatch(&self, handle: Handle, method: u32, args: &[u8]) -> CallEnvelope {
		CallbackRegistry::dispatch(self, handle, method, args)
	}

	async fn dispatch_async(&self, handle: Handle, method: u32, args: &[u8]) -> CallEnvelope {
		CallbackRegistry::dispatch_async(self, handle, method, args).await
	}

	fn quiesce(&self) {
		CallbackRegistry::quiesce(self)
	}

	fn audit_no_leaks(&self) -> Result<()> {
		CallbackRegistry::audit_no_leaks(self)
	}

	fn deregister_all(&self) {
		CallbackRegistry::deregister_all(self)
	}

	fn has_registered_callbacks(&self) -> bool {
		CallbackRegistry::has_registered_callbacks(self)
	}
}

/// The inbound side of the bridge.
///
/// The host's message loop hands every inbound callback call to the router,
/// which forwards it to the registry of the named interface. The router is
/// also the shutdown observer: [`shutdown`](Self::shutdown) stops every
/// registry from admitting new callbacks before auditing any of them.
pub struct CallbackRouter {
	routes: RwLock<Routes>,
	sink: Arc<dyn DiagnosticSink>,
}

#[derive(Default)]
struct Routes {
	handlers: BTreeMap<InterfaceId, Arc<dyn CallbackHandler>>,
	/// Set once shutdown has begun
	closed: bool,
}

impl Default for CallbackRouter {
	fn default() -> Self {
		Self::new()
	}
}

impl CallbackRouter {
	pub fn new() -> Self {
		Self {
			routes: RwLock::new(Routes::default()),
			sink: Arc::new(TracingSink),
		}
	}

	/// Sets where routing and shutdown failures are reported. Failures inside
	/// a registry go to that registry's own sink.
	pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
		self.sink = sink;
		self
	}

	/// Attaches the handler for an interface.
	///
	/// # Errors
	///
	/// Fails with [`Error::DuplicateInterface`] if the interface already has a
	/// handler, and with [`Error::RegistrationClosed`] once
	/// [`shutdown`](Self::shutdown) has begun.
	pub fn register_handler(
		&self,
		id: InterfaceId,
		handler: Arc<dyn CallbackHandler>,
	) -> Result<()> {
		let mut routes = self.routes.write();
		if routes.closed {
			return Err(Error::RegistrationClosed(handler.interface().to_owned()));
		}
		if routes.handlers.contains_key(&id) {
			return Err(Error::DuplicateInterface(id.0));
		}
		debug!(interface = handler.interface(), id = id.0, "Registered callback handler");
		routes.handlers.insert(id, handler);
		Ok(())
	}

	/// Detaches the handler for an interface, returning it.
	pub fn deregister_handler(&self, id: InterfaceId) -> Option<Arc<dyn CallbackHandler>> {
		self.routes.write().handlers.remove(&id)
	}

	pub fn handler(&self, id: InterfaceId) -> Result<Arc<dyn CallbackHandler>> {
		self.routes.read().handlers.get(&id).cloned().ok_or(Error::UnknownInterface(id.0))
	}

	pub fn len(&self) -> usize {
		self.routes.read().handlers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.read().handlers.is_empty()
	}

	/// Whether [`shutdown`](Self::shutdown) has begun.
	pub fn is_closed(&self) -> bool {
		self.routes.read().closed
	}

	fn unroutable(&self, id: InterfaceId, err: &Error) -> CallEnvelope {
		self.sink.report(&format!("interface {id}"), err);
		CallEnvelope::internal_error(err.to_string())
	}

	/// Routes one inbound call. Never fails; see [`CallbackRegistry::dispatch`].
	pub fn dispatch(
		&self,
		id: InterfaceId,
		handle: Handle,
		method: u32,
		args: &[u8],
	) -> CallEnvelope {
		match self.handler(id) {
			Ok(handler) => handler.dispatch(handle, method, args),
			Err(e) => self.unroutable(id, &e),
		}
	}

	/// Routes one inbound call to a handler that may complete asynchronously.
	pub async fn dispatch_async(
		&self,
		id: InterfaceId,
		handle: Handle,
		method: u32,
		args: &[u8],
	) -> CallEnvelope {
		match self.handler(id) {
			Ok(handler) => handler.dispatch_async(handle, method, args).await,
			Err(e) => self.unroutable(id, &e),
		}
	}

	/// Runs the ordered shutdown of every attached registry.
	///
	/// All registries are quiesced before any is audited, so a callback that
	/// was being registered on one interface while another was shutting down
	/// is either refused or counted, never missed. Handlers are detached once
	/// audited. Every leak is reported to the sink and returned. No handler
	/// can be attached once shutdown has begun.
	pub fn shutdown(&self) -> Result<(), Vec<Error>> {
		let handlers: Vec<(InterfaceId, Arc<dyn CallbackHandler>)> = {
			let mut routes = self.routes.write();
			routes.closed = true;
			routes.handlers.iter().map(|(id, h)| (*id, h.clone())).collect()
		};
		for (_, handler) in &handlers {
			handler.quiesce();
		}
		let mut leaks = Vec::new();
		for (_, handler) in &handlers {
			if let Err(e) = handler.audit_no_leaks() {
				self.sink.report(handler.interface(), &e);
				leaks.push(e);
			}
		}
		let mut routes = self.routes.write();
		for (id, _) in &handlers {
			routes.handlers.remove(id);
		}
		drop(routes);
		debug!(interfaces = handlers.len(), leaks = leaks.len(), "Callback router shut down");
		if leaks.is_empty() {
			Ok(())
		} else {
			Err(leaks)
		}
	}
}
