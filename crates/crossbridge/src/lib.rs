//! Runtime layer for the Crossbridge call bridge.
//!
//! Outbound calls go through a host-supplied [`Transport`] and come back as a
//! [`CallEnvelope`](crate::types::CallEnvelope), which [`call`] and
//! [`call_async`] resolve into a return value or a [`CallError`](crate::types::CallError).
//!
//! Inbound calls target local callback objects. Each callback interface owns
//! one [`CallbackRegistry`], which keeps the objects behind integer handles and
//! invokes their methods by index. A [`CallbackRouter`] routes inbound calls to
//! the right registry and runs the two-phase shutdown: quiesce every registry,
//! then audit every registry for leaked callbacks.

#[macro_use]
extern crate tracing;

pub mod call;
pub mod cnf;
pub mod registry;
pub mod router;
pub mod sink;

pub use crossbridge_types as types;

pub use call::{AsyncTransport, CallTarget, Transport, call, call_async};
pub use registry::{CallbackMethod, CallbackRegistry, RELEASE_METHOD, RegistrationSite};
pub use router::{CallbackHandler, CallbackRouter, InterfaceId};
pub use sink::{DiagnosticSink, TracingSink};
