//! Wire layer for the Crossbridge call bridge.
//!
//! This crate defines everything that must be bit-exact on both sides of the
//! boundary between a native component and a managed component:
//!
//! - [`Buffer`]: a fixed-length byte region produced by one lower and consumed by one lift
//! - [`ByteCursor`]: a linear cursor encoding and decoding scalars, text, byte blobs and
//!   opaque pointer tokens over one buffer
//! - [`Codec`]: the uniform `size_of` / `lower` / `lift` contract implemented by every
//!   transmissible type
//! - [`CallEnvelope`]: the tagged outcome of one cross-boundary call
//! - [`PointerTables`]: pluggable tables that own the representation of foreign object
//!   pointers
//!
//! # Wire Format
//!
//! All multi-byte scalars are big-endian.
//!
//! ```text
//! u8/i8 ........ 1 byte
//! u16/i16 ...... 2 bytes
//! u32/i32/f32 .. 4 bytes
//! u64/i64/f64 .. 8 bytes
//! bool ......... 1 byte, 0 or 1
//! text ......... [u32 byte length][UTF-8 bytes], no terminator
//! byte blob .... [i32 byte length][raw bytes], negative lengths are invalid
//! pointer ...... 8 bytes, interpreted only by its pointer table
//! optional ..... [u8 0 = absent | 1 = present][value]
//! sequence ..... [i32 count][elements...]
//! map .......... [i32 count][key value...]
//! record ....... fields in declaration order
//! enum ......... [i32 variant index][variant fields]
//! ```

#[macro_use]
mod mac;

pub mod buffer;
pub mod cnf;
pub mod codec;
pub mod cursor;
pub mod envelope;
pub mod err;
pub mod handle;
pub mod pointer;

pub use buffer::Buffer;
pub use codec::{Codec, check_arg, require};
pub use cursor::{ByteCursor, Reader, Writer};
pub use envelope::{CallEnvelope, CallError, CallStatus, RawCallResult, handle_result};
pub use err::{Error, ErrorCategory, Result, TypeError};
pub use handle::Handle;
pub use pointer::{
	ForeignObject, ForeignPointer, MemoryPointerTable, POINTER_SIZE, PointerTable, PointerTables,
	TableId,
};
