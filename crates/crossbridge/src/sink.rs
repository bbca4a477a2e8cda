use crossbridge_types::Error;

/// Receives failures that cannot be returned to anyone.
///
/// Inbound callback dispatch runs on the bridge's own message loop, which must
/// keep going after one callback fails, so those failures end up here.
pub trait DiagnosticSink: Send + Sync {
	fn report(&self, interface: &str, error: &Error);
}

/// Reports failures as `error` level tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
	fn report(&self, interface: &str, error: &Error) {
		error!(interface, category = ?error.category(), "{error}");
	}
}
