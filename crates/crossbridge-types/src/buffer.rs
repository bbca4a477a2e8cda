//! Owned byte regions exchanged across the boundary.

use std::ops::Deref;

use bytes::Bytes;

/// A fixed-length byte region.
///
/// A buffer is produced by exactly one `lower` call, sized by the matching
/// `size_of`, and consumed by exactly one `lift`. It is never mutated after it
/// has been handed to the transport.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Buffer(Bytes);

impl Buffer {
	/// Creates an empty buffer.
	pub const fn empty() -> Self {
		Self(Bytes::new())
	}

	/// Returns the length of the buffer in bytes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Checks if the buffer holds no bytes.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Consumes the buffer, returning the underlying bytes.
	pub fn into_bytes(self) -> Bytes {
		self.0
	}
}

impl Deref for Buffer {
	type Target = [u8];

	fn deref(&self) -> &[u8] {
		&self.0
	}
}

impl AsRef<[u8]> for Buffer {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl From<Vec<u8>> for Buffer {
	fn from(v: Vec<u8>) -> Self {
		Self(Bytes::from(v))
	}
}

impl From<Bytes> for Buffer {
	fn from(v: Bytes) -> Self {
		Self(v)
	}
}

impl From<&'static [u8]> for Buffer {
	fn from(v: &'static [u8]) -> Self {
		Self(Bytes::from_static(v))
	}
}
