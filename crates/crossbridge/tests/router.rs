use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbridge::types::{
	CallEnvelope, CallError, Codec, Error, Handle, PointerTables, handle_result,
};
use crossbridge::{
	CallbackHandler, CallbackMethod, CallbackRegistry, CallbackRouter, DiagnosticSink,
	InterfaceId, RELEASE_METHOD,
};
use parking_lot::Mutex;

#[derive(Default)]
struct RecordingSink {
	reports: Mutex<Vec<(String, String)>>,
}

impl DiagnosticSink for RecordingSink {
	fn report(&self, interface: &str, error: &Error) {
		self.reports.lock().push((interface.to_owned(), error.to_string()));
	}
}

#[derive(Default)]
struct Accumulator(AtomicU64);

fn accumulators(sink: Arc<RecordingSink>) -> Arc<CallbackRegistry<Accumulator>> {
	Arc::new(
		CallbackRegistry::new(
			"Accumulator",
			vec![
				CallbackMethod::new("add", |a: &Accumulator, (n,): (u64,)| {
					Ok::<_, Infallible>(a.0.fetch_add(n, Ordering::SeqCst) + n)
				}),
				CallbackMethod::asynchronous(
					"add_later",
					|a: Arc<Accumulator>, (n, delay_ms): (u64, u64)| async move {
						tokio::time::sleep(Duration::from_millis(delay_ms)).await;
						Ok::<_, String>(a.0.fetch_add(n, Ordering::SeqCst) + n)
					},
				),
				CallbackMethod::asynchronous("fail_later", |_: Arc<Accumulator>, (): ()| async move {
					tokio::task::yield_now().await;
					Err::<u64, _>(String::from("not today"))
				}),
				CallbackMethod::asynchronous("explode_later", |_: Arc<Accumulator>, (): ()| async move {
					tokio::task::yield_now().await;
					if true {
						panic!("accumulator exploded");
					}
					Ok::<(), Infallible>(())
				}),
			],
		)
		.with_sink(sink),
	)
}

struct Greeter;

fn greeters(sink: Arc<RecordingSink>) -> Arc<CallbackRegistry<Greeter>> {
	Arc::new(
		CallbackRegistry::new(
			"Greeter",
			vec![CallbackMethod::new("greet", |_: &Greeter, (name,): (String,)| {
				Ok::<_, Infallible>(format!("hello {name}"))
			})],
		)
		.with_sink(sink),
	)
}

const ACCUMULATOR: InterfaceId = InterfaceId(1);
const GREETER: InterfaceId = InterfaceId(2);

type Fixture = (CallbackRouter, Arc<CallbackRegistry<Accumulator>>, Arc<CallbackRegistry<Greeter>>);

fn router(sink: Arc<RecordingSink>) -> Fixture {
	let router = CallbackRouter::new().with_sink(sink.clone());
	let acc = accumulators(sink.clone());
	let greet = greeters(sink);
	router.register_handler(ACCUMULATOR, acc.clone()).unwrap();
	router.register_handler(GREETER, greet.clone()).unwrap();
	(router, acc, greet)
}

fn lift<T: Codec, E: Codec>(envelope: CallEnvelope) -> Result<T, CallError<E>> {
	handle_result(envelope.into_raw(), PointerTables::none())
}

#[test_log::test]
fn routes_by_interface() {
	let (router, acc, greet) = router(Arc::default());
	let a = acc.register(Arc::default()).unwrap();
	let g = greet.register(Arc::new(Greeter)).unwrap();
	// Handles are scoped to their registry
	assert_eq!(a, Handle::new(0));
	assert_eq!(g, Handle::new(0));
	let out = router.dispatch(GREETER, g, 1, &(String::from("ada"),).lower().unwrap());
	assert_eq!(lift::<String, Infallible>(out).unwrap(), "hello ada");
	let out = router.dispatch(ACCUMULATOR, a, 1, &(5u64,).lower().unwrap());
	assert_eq!(lift::<u64, Infallible>(out).unwrap(), 5);
}

#[test_log::test]
fn unknown_interface_is_reported() {
	let sink = Arc::new(RecordingSink::default());
	let (router, _, _) = router(sink.clone());
	let out = router.dispatch(InterfaceId(9), Handle::new(0), 1, &[]);
	let err = lift::<(), Infallible>(out).unwrap_err();
	assert!(matches!(
		err,
		CallError::Internal(ref msg) if msg == "No callback handler registered for interface id 9"
	));
	assert_eq!(sink.reports.lock().len(), 1);
}

#[test_log::test]
fn duplicate_interface_is_refused() {
	let (router, _, _) = router(Arc::default());
	let err = router.register_handler(GREETER, greeters(Arc::default())).unwrap_err();
	assert!(matches!(err, Error::DuplicateInterface(2)));
	assert_eq!(router.len(), 2);
	assert!(router.deregister_handler(GREETER).is_some());
	router.register_handler(GREETER, greeters(Arc::default())).unwrap();
}

#[test_log::test(tokio::test)]
async fn async_methods_complete_through_the_router() {
	let (router, acc, _) = router(Arc::default());
	let handle = acc.register(Arc::default()).unwrap();
	let args = (3u64, 10u64).lower().unwrap();
	let out = router.dispatch_async(ACCUMULATOR, handle, 2, &args).await;
	assert_eq!(lift::<u64, String>(out).unwrap(), 3);
	// Synchronous methods may be dispatched asynchronously too
	let out = router.dispatch_async(ACCUMULATOR, handle, 1, &(4u64,).lower().unwrap()).await;
	assert_eq!(lift::<u64, Infallible>(out).unwrap(), 7);
}

#[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
async fn concurrent_async_dispatch() {
	let (router, acc, _) = router(Arc::default());
	let router = Arc::new(router);
	let handle = acc.register(Arc::default()).unwrap();
	let mut tasks = Vec::new();
	for delay in [20u64, 5, 1, 10] {
		let router = router.clone();
		tasks.push(tokio::spawn(async move {
			let args = (1u64, delay).lower().unwrap();
			router.dispatch_async(ACCUMULATOR, handle, 2, &args).await
		}));
	}
	for task in tasks {
		assert!(matches!(task.await.unwrap(), CallEnvelope::Success(_)));
	}
	assert_eq!(acc.resolve(handle).unwrap().0.load(Ordering::SeqCst), 4);
}

#[test_log::test(tokio::test)]
async fn async_declared_errors_and_panics() {
	let sink = Arc::new(RecordingSink::default());
	let (router, acc, _) = router(sink.clone());
	let handle = acc.register(Arc::default()).unwrap();
	let out = router.dispatch_async(ACCUMULATOR, handle, 3, &[]).await;
	let err = lift::<u64, String>(out).unwrap_err();
	assert_eq!(err.into_declared().as_deref(), Some("not today"));
	assert!(sink.reports.lock().is_empty());
	let out = router.dispatch_async(ACCUMULATOR, handle, 4, &[]).await;
	let err = lift::<(), Infallible>(out).unwrap_err();
	assert!(matches!(err, CallError::Internal(ref msg) if msg.ends_with("accumulator exploded")));
	assert_eq!(sink.reports.lock().len(), 1);
}

#[test_log::test]
fn async_methods_refuse_synchronous_dispatch() {
	let sink = Arc::new(RecordingSink::default());
	let (router, acc, _) = router(sink.clone());
	let handle = acc.register(Arc::default()).unwrap();
	let out = router.dispatch(ACCUMULATOR, handle, 2, &(1u64, 1u64).lower().unwrap());
	assert!(lift::<u64, String>(out).unwrap_err().is_internal());
	assert_eq!(sink.reports.lock().len(), 1);
}

#[test_log::test]
fn shutdown_without_leaks() {
	let (router, acc, greet) = router(Arc::default());
	let a = acc.register(Arc::default()).unwrap();
	router.dispatch(ACCUMULATOR, a, RELEASE_METHOD, &[]);
	router.shutdown().unwrap();
	assert!(router.is_empty());
	assert!(!acc.is_accepting());
	assert!(!greet.is_accepting());
}

#[test_log::test]
fn shutdown_quiesces_everything_before_auditing() {
	let sink = Arc::new(RecordingSink::default());
	let (router, acc, greet) = router(sink.clone());
	acc.register(Arc::default()).unwrap();
	greet.register(Arc::new(Greeter)).unwrap();
	greet.register(Arc::new(Greeter)).unwrap();
	let leaks = router.shutdown().unwrap_err();
	assert_eq!(leaks.len(), 2);
	assert!(leaks.iter().all(|e| matches!(
		e,
		Error::LeakedCallbacks {
			..
		}
	)));
	assert_eq!(sink.reports.lock().len(), 2);
	assert!(matches!(acc.register(Arc::default()), Err(Error::RegistrationClosed(_))));
	assert!(greet.has_registered_callbacks());
	assert!(router.is_empty());
}

#[test_log::test]
fn handler_trait_is_object_safe() {
	let greet = greeters(Arc::default());
	let handler: Arc<dyn CallbackHandler> = greet.clone();
	let handle = greet.register(Arc::new(Greeter)).unwrap();
	assert_eq!(handler.interface(), "Greeter");
	assert!(handler.has_registered_callbacks());
	handler.deregister_all();
	assert!(greet.resolve(handle).is_err());
	handler.quiesce();
	handler.audit_no_leaks().unwrap();
}

#[test_log::test]
fn handlers_are_refused_once_shutdown_begins() {
	let (router, _, _) = router(Arc::default());
	assert!(!router.is_closed());
	router.shutdown().unwrap();
	assert!(router.is_closed());
	let late = greeters(Arc::default());
	let err = router.register_handler(InterfaceId(3), late.clone()).unwrap_err();
	assert!(matches!(err, Error::RegistrationClosed(ref name) if name == "Greeter"));
	assert!(router.is_empty());
	// Never attached, so never quiesced by the router
	assert!(late.is_accepting());
}

#[test_log::test]
fn registry_failures_go_to_the_registry_sink() {
	let routing = Arc::new(RecordingSink::default());
	let dispatching = Arc::new(RecordingSink::default());
	let router = CallbackRouter::new().with_sink(routing.clone());
	let greet = greeters(dispatching.clone());
	router.register_handler(GREETER, greet).unwrap();
	router.dispatch(GREETER, Handle::new(41), 1, &[]);
	assert!(routing.reports.lock().is_empty());
	assert_eq!(
		*dispatching.reports.lock(),
		vec![("Greeter".to_owned(), "Greeter: invalid callback handle id: 41".to_owned())]
	);
	router.dispatch(InterfaceId(8), Handle::new(0), 1, &[]);
	assert_eq!(routing.reports.lock().len(), 1);
	assert_eq!(dispatching.reports.lock().len(), 1);
}
