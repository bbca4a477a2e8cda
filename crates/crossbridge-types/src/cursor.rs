//! A linear cursor over one buffer.
//!
//! The cursor only ever moves forward. Every read and write checks the
//! remaining room first: running off the end is a contract violation and is
//! reported as [`Error::BufferOverrun`], never truncated or zero-filled.

use bytes::Bytes;

use crate::err::{Error, Result, TypeError};
use crate::pointer::{ForeignPointer, POINTER_SIZE, PointerTables, TableId};

/// A forward-only cursor over a byte buffer.
///
/// The pointer tables are consulted only when a pointer is read or written.
#[derive(Debug)]
pub struct ByteCursor<'t, B> {
	buf: B,
	pos: usize,
	tables: &'t PointerTables,
}

/// A cursor decoding values from a borrowed buffer.
pub type Reader<'t, 'b> = ByteCursor<'t, &'b [u8]>;

/// A cursor encoding values into a pre-sized buffer.
pub type Writer<'t, 'b> = ByteCursor<'t, &'b mut [u8]>;

impl<B> ByteCursor<'static, B> {
	/// Creates a cursor with no pointer tables attached.
	pub fn new(buf: B) -> Self {
		Self::with_tables(buf, PointerTables::none())
	}
}

impl<'t, B> ByteCursor<'t, B> {
	/// Creates a cursor at offset zero.
	pub fn with_tables(buf: B, tables: &'t PointerTables) -> Self {
		Self {
			buf,
			pos: 0,
			tables,
		}
	}

	/// The current offset into the buffer.
	pub fn position(&self) -> usize {
		self.pos
	}

	pub fn tables(&self) -> &'t PointerTables {
		self.tables
	}

	pub fn into_inner(self) -> B {
		self.buf
	}
}

impl<B: AsRef<[u8]>> ByteCursor<'_, B> {
	/// The total length of the buffer.
	pub fn len(&self) -> usize {
		self.buf.as_ref().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// The number of bytes between the cursor and the end of the buffer.
	pub fn remaining(&self) -> usize {
		self.len() - self.pos
	}

	/// Checks if every byte of the buffer has been consumed.
	pub fn is_exhausted(&self) -> bool {
		self.pos == self.len()
	}

	/// Fails unless `needed` more bytes fit after the cursor.
	fn ensure(&self, op: &'static str, needed: usize) -> Result<usize> {
		let len = self.len();
		match self.pos.checked_add(needed) {
			Some(end) if end <= len => Ok(end),
			_ => Err(Error::BufferOverrun {
				op,
				pos: self.pos,
				needed,
				len,
			}),
		}
	}
}

macro_rules! read_scalars {
	($($name:ident => $t:ty),+ $(,)?) => {
		$(
			#[doc = concat!("Reads a big-endian `", stringify!($t), "`.")]
			pub fn $name(&mut self) -> Result<$t> {
				Ok(<$t>::from_be_bytes(self.take_array(stringify!($name))?))
			}
		)+
	};
}

macro_rules! write_scalars {
	($($name:ident => $t:ty),+ $(,)?) => {
		$(
			#[doc = concat!("Writes a big-endian `", stringify!($t), "`.")]
			pub fn $name(&mut self, v: $t) -> Result<()> {
				self.put(stringify!($name), &v.to_be_bytes())
			}
		)+
	};
}

impl<'b> ByteCursor<'_, &'b [u8]> {
	fn take(&mut self, op: &'static str, n: usize) -> Result<&'b [u8]> {
		let end = self.ensure(op, n)?;
		let buf: &'b [u8] = self.buf;
		let out = &buf[self.pos..end];
		self.pos = end;
		Ok(out)
	}

	fn take_array<const N: usize>(&mut self, op: &'static str) -> Result<[u8; N]> {
		let mut out = [0u8; N];
		out.copy_from_slice(self.take(op, N)?);
		Ok(out)
	}

	read_scalars! {
		read_u8 => u8,
		read_i8 => i8,
		read_u16 => u16,
		read_i16 => i16,
		read_u32 => u32,
		read_i32 => i32,
		read_u64 => u64,
		read_i64 => i64,
		read_f32 => f32,
		read_f64 => f64,
	}

	/// Reads a `u32` length followed by exactly that many UTF-8 bytes.
	pub fn read_string(&mut self) -> Result<String> {
		let len = self.read_u32()? as usize;
		let raw = self.take("read_string", len)?;
		match std::str::from_utf8(raw) {
			Ok(s) => Ok(s.to_owned()),
			Err(e) => Err(Error::InvalidUtf8(e.to_string())),
		}
	}

	/// Reads an `i32` length followed by exactly that many raw bytes.
	pub fn read_bytes(&mut self) -> Result<Bytes> {
		let len = self.read_i32()?;
		let Ok(n) = usize::try_from(len) else {
			return Err(Error::NegativeLength(len));
		};
		Ok(Bytes::copy_from_slice(self.take("read_bytes", n)?))
	}

	/// Reads eight pointer bytes and hands them to the given table.
	pub fn read_pointer(&mut self, table: TableId) -> Result<ForeignPointer> {
		let handler = self.tables.get(table)?;
		let raw = self.take_array::<POINTER_SIZE>("read_pointer")?;
		handler.read(table, raw)
	}
}

impl ByteCursor<'_, &mut [u8]> {
	fn put(&mut self, op: &'static str, bytes: &[u8]) -> Result<()> {
		let end = self.ensure(op, bytes.len())?;
		self.buf[self.pos..end].copy_from_slice(bytes);
		self.pos = end;
		Ok(())
	}

	write_scalars! {
		write_u8 => u8,
		write_i8 => i8,
		write_u16 => u16,
		write_i16 => i16,
		write_u32 => u32,
		write_i32 => i32,
		write_u64 => u64,
		write_i64 => i64,
		write_f32 => f32,
		write_f64 => f64,
	}

	/// Writes a `u32` length followed by the UTF-8 bytes of the text.
	///
	/// Nothing is written unless both the prefix and the text fit.
	pub fn write_string(&mut self, v: &str) -> Result<()> {
		let Ok(len) = u32::try_from(v.len()) else {
			return Err(TypeError::new(format!("text of {} bytes does not fit a u32 length", v.len()))
				.into());
		};
		self.ensure("write_string", 4 + v.len())?;
		self.write_u32(len)?;
		self.put("write_string", v.as_bytes())
	}

	/// Writes an `i32` length followed by the raw bytes.
	///
	/// Nothing is written unless both the prefix and the bytes fit.
	pub fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
		let Ok(len) = i32::try_from(v.len()) else {
			return Err(TypeError::new(format!(
				"byte blob of {} bytes does not fit an i32 length",
				v.len()
			))
			.into());
		};
		self.ensure("write_bytes", 4 + v.len())?;
		self.write_i32(len)?;
		self.put("write_bytes", v)
	}

	/// Asks the given table for the eight bytes of a pointer and writes them.
	pub fn write_pointer(&mut self, table: TableId, pointer: &ForeignPointer) -> Result<()> {
		if pointer.table() != table {
			return Err(TypeError::new(format!(
				"pointer belongs to table {} but was written through table {table}",
				pointer.table()
			))
			.into());
		}
		let raw = self.tables.get(table)?.write(pointer)?;
		self.put("write_pointer", &raw)
	}
}
