//! The uniform lower / lift contract shared by every transmissible type.

mod collection;
mod primitive;

use crate::buffer::Buffer;
use crate::cnf::MAX_BUFFER_SIZE;
use crate::cursor::{ByteCursor, Reader, Writer};
use crate::err::{Error, Result, TypeError};
use crate::pointer::PointerTables;

/// A type that can cross the boundary.
///
/// `write` and `read` are the thin variants used for fields nested inside a
/// larger value; they work against an existing cursor and never allocate a
/// buffer of their own. `lower` and `lift` are the entry points for a whole
/// argument list or return value.
pub trait Codec: Sized {
	/// The exact number of bytes `write` will produce for this value.
	fn size_of(&self) -> usize;

	/// Writes the value at the cursor.
	fn write(&self, w: &mut Writer<'_, '_>) -> Result<()>;

	/// Reads a value at the cursor.
	fn read(r: &mut Reader<'_, '_>) -> Result<Self>;

	/// Rejects values the wire cannot carry, before any bytes are written.
	fn check(&self) -> Result<(), TypeError> {
		Ok(())
	}

	/// Lowers a value that contains no foreign pointers.
	fn lower(&self) -> Result<Buffer> {
		self.lower_with(PointerTables::none())
	}

	/// Allocates a buffer of exactly `size_of` bytes and writes the value into it.
	fn lower_with(&self, tables: &PointerTables) -> Result<Buffer> {
		self.check()?;
		let size = self.size_of();
		if size > *MAX_BUFFER_SIZE {
			return Err(TypeError::new(format!(
				"value needs {size} bytes, more than the {} byte buffer limit",
				*MAX_BUFFER_SIZE
			))
			.into());
		}
		let mut buf = vec![0u8; size];
		let mut w = ByteCursor::with_tables(buf.as_mut_slice(), tables);
		self.write(&mut w)?;
		let written = w.position();
		if written != size {
			return Err(Error::SizeMismatch {
				computed: size,
				written,
			});
		}
		Ok(Buffer::from(buf))
	}

	/// Lifts a value that contains no foreign pointers.
	fn lift(buf: &[u8]) -> Result<Self> {
		Self::lift_with(buf, PointerTables::none())
	}

	/// Reads a value from the start of the buffer, which it must consume entirely.
	fn lift_with(buf: &[u8], tables: &PointerTables) -> Result<Self> {
		let mut r = ByteCursor::with_tables(buf, tables);
		let value = Self::read(&mut r)?;
		if !r.is_exhausted() {
			return Err(Error::TrailingBytes {
				consumed: r.position(),
				len: r.len(),
			});
		}
		Ok(value)
	}
}

/// Rejects an absent required value coming from a dynamically typed caller.
pub fn require<T>(value: Option<T>, name: &str) -> Result<T, TypeError> {
	value.ok_or_else(|| TypeError::new("missing required value").with_item(name))
}

/// Runs the boundary check of one named call argument.
pub fn check_arg<T: Codec>(value: &T, name: &str) -> Result<(), TypeError> {
	value.check().map_err(|e| e.with_item(name))
}
