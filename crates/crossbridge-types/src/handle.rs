use std::fmt;

use crate::codec::Codec;
use crate::cursor::{Reader, Writer};
use crate::err::Result;

/// A registry-scoped reference to a local callback object.
///
/// Handles are issued from a counter that only moves forward, so a released
/// handle is never handed out again by the same registry. A handle carries no
/// meaning outside the registry that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

impl Handle {
	pub const fn new(id: u64) -> Self {
		Self(id)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

impl From<u64> for Handle {
	fn from(v: u64) -> Self {
		Self(v)
	}
}

impl fmt::Display for Handle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl Codec for Handle {
	fn size_of(&self) -> usize {
		8
	}

	fn write(&self, w: &mut Writer<'_, '_>) -> Result<()> {
		w.write_u64(self.0)
	}

	fn read(r: &mut Reader<'_, '_>) -> Result<Self> {
		Ok(Self(r.read_u64()?))
	}
}
