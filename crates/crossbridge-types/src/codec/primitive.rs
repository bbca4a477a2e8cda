use std::convert::Infallible;

use bytes::Bytes;

use super::Codec;
use crate::cursor::{Reader, Writer};
use crate::err::{Error, Result, TypeError};

macro_rules! impl_scalar {
	($($t:ty => $read:ident, $write:ident;)+) => {
		$(
			impl Codec for $t {
				fn size_of(&self) -> usize {
					std::mem::size_of::<$t>()
				}

				fn write(&self, w: &mut Writer<'_, '_>) -> Result<()> {
					w.$write(*self)
				}

				fn read(r: &mut Reader<'_, '_>) -> Result<Self> {
					r.$read()
				}
			}
		)+
	};
}

impl_scalar! {
	u8 => read_u8, write_u8;
	i8 => read_i8, write_i8;
	u16 => read_u16, write_u16;
	i16 => read_i16, write_i16;
	u32 => read_u32, write_u32;
	i32 => read_i32, write_i32;
	u64 => read_u64, write_u64;
	i64 => read_i64, write_i64;
	f32 => read_f32, write_f32;
	f64 => read_f64, write_f64;
}

impl Codec for bool {
	fn size_of(&self) -> usize {
		1
	}

	fn write(&self, w: &mut Writer<'_, '_>) -> Result<()> {
		w.write_u8(u8::from(*self))
	}

	fn read(r: &mut Reader<'_, '_>) -> Result<Self> {
		match r.read_u8()? {
			0 => Ok(false),
			1 => Ok(true),
			v => Err(Error::InvalidTag {
				type_name: "bool",
				tag: i64::from(v),
			}),
		}
	}
}

impl Codec for String {
	fn size_of(&self) -> usize {
		4 + self.len()
	}

	fn check(&self) -> Result<(), TypeError> {
		if u32::try_from(self.len()).is_err() {
			return Err(TypeError::new(format!(
				"text of {} bytes does not fit a u32 length",
				self.len()
			)));
		}
		Ok(())
	}

	fn write(&self, w: &mut Writer<'_, '_>) -> Result<()> {
		w.write_string(self)
	}

	fn read(r: &mut Reader<'_, '_>) -> Result<Self> {
		r.read_string()
	}
}

impl Codec for Bytes {
	fn size_of(&self) -> usize {
		4 + self.len()
	}

	fn check(&self) -> Result<(), TypeError> {
		if i32::try_from(self.len()).is_err() {
			return Err(TypeError::new(format!(
				"byte blob of {} bytes does not fit an i32 length",
				self.len()
			)));
		}
		Ok(())
	}

	fn write(&self, w: &mut Writer<'_, '_>) -> Result<()> {
		w.write_bytes(self)
	}

	fn read(r: &mut Reader<'_, '_>) -> Result<Self> {
		r.read_bytes()
	}
}

impl Codec for () {
	fn size_of(&self) -> usize {
		0
	}

	fn write(&self, _: &mut Writer<'_, '_>) -> Result<()> {
		Ok(())
	}

	fn read(_: &mut Reader<'_, '_>) -> Result<Self> {
		Ok(())
	}
}

/// The declared error type of operations that declare none.
///
/// No value of it can exist, so reading one always fails.
impl Codec for Infallible {
	fn size_of(&self) -> usize {
		match *self {}
	}

	fn write(&self, _: &mut Writer<'_, '_>) -> Result<()> {
		match *self {}
	}

	fn read(_: &mut Reader<'_, '_>) -> Result<Self> {
		Err(Error::NoDeclaredError)
	}
}
