use crossbridge_types::envelope::UNKNOWN_ERROR;
use crossbridge_types::{
	Buffer, CallEnvelope, CallError, Codec, Error, PointerTables, RawCallResult, handle_result,
};
use rstest::rstest;

fn raw(code: i8, data: Option<Vec<u8>>) -> RawCallResult {
	RawCallResult {
		code,
		data: data.map(Buffer::from),
	}
}

#[test]
fn success_is_lifted_as_return_type() {
	let data = 42u32.lower().unwrap().to_vec();
	let value = handle_result::<u32, String>(raw(0, Some(data)), PointerTables::none()).unwrap();
	assert_eq!(value, 42);
}

#[test]
fn error_is_lifted_as_declared_type() {
	let data = String::from("bad input").lower().unwrap().to_vec();
	let err = handle_result::<u32, String>(raw(1, Some(data)), PointerTables::none()).unwrap_err();
	assert!(matches!(err, CallError::Declared(ref e) if e == "bad input"));
	assert_eq!(err.to_string(), "bad input");
}

#[rstest]
#[case::with_message(Some(b"kaboom".to_vec()), "kaboom")]
#[case::without_payload(None, UNKNOWN_ERROR)]
#[case::empty_payload(Some(vec![]), "")]
#[case::invalid_utf8(Some(vec![b'o', 0xFF, b'k']), "o\u{FFFD}k")]
fn internal_error_message(#[case] data: Option<Vec<u8>>, #[case] expected: &str) {
	let err = handle_result::<u32, String>(raw(2, data), PointerTables::none()).unwrap_err();
	assert!(err.is_internal());
	assert!(matches!(err, CallError::Internal(ref msg) if msg == expected));
}

#[rstest]
#[case::three(3)]
#[case::negative(-1)]
#[case::max(i8::MAX)]
fn unknown_status_is_never_success(#[case] code: i8) {
	let data = 42u32.lower().unwrap().to_vec();
	let err = handle_result::<u32, String>(raw(code, Some(data)), PointerTables::none()).unwrap_err();
	assert!(matches!(err, CallError::Bridge(Error::UnexpectedStatus(c)) if c == code));
	assert_eq!(err.to_string(), format!("Unexpected status code: {code}"));
}

#[test]
fn malformed_success_payload_is_a_bridge_error() {
	let err = handle_result::<u32, String>(raw(0, Some(vec![1, 2])), PointerTables::none())
		.unwrap_err();
	assert!(matches!(err, CallError::Bridge(ref e) if e.is_contract_violation()));
}

#[test]
fn envelope_builders_match_their_status() {
	let tables = PointerTables::none();
	assert_eq!(CallEnvelope::success(&(), tables).unwrap().into_raw().code, 0);
	assert_eq!(CallEnvelope::declared_error(&1u8, tables).unwrap().into_raw().code, 1);
	let raw = CallEnvelope::internal_error("oops").into_raw();
	assert_eq!(raw.code, 2);
	assert_eq!(raw.data.as_deref(), Some(&b"oops"[..]));
}
