//! Opaque pointers to objects owned by the other side of the boundary.
//!
//! A pointer always occupies [`POINTER_SIZE`] bytes on the wire. The cursor
//! never interprets those bytes itself: it hands them to the [`PointerTable`]
//! registered for the object's type, which turns them into a
//! [`ForeignPointer`] token and back.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::err::{Error, Result};

/// The number of bytes a pointer occupies on the wire.
pub const POINTER_SIZE: usize = 8;

/// Identifies the pointer table responsible for one object type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A token for one foreign object, valid only within its table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ForeignPointer {
	table: TableId,
	token: u64,
}

impl ForeignPointer {
	pub fn new(table: TableId, token: u64) -> Self {
		Self {
			table,
			token,
		}
	}

	pub fn table(&self) -> TableId {
		self.table
	}

	pub fn token(&self) -> u64 {
		self.token
	}
}

/// Owns the wire representation of pointers for one object type.
pub trait PointerTable: Send + Sync {
	/// The name used in diagnostics.
	fn name(&self) -> &str;

	/// Turns eight wire bytes into a pointer token.
	fn read(&self, table: TableId, raw: [u8; POINTER_SIZE]) -> Result<ForeignPointer>;

	/// Turns a pointer token into eight wire bytes.
	fn write(&self, pointer: &ForeignPointer) -> Result<[u8; POINTER_SIZE]>;
}

/// A type whose values are handles to objects on the other side.
pub trait ForeignObject {
	fn from_pointer(pointer: ForeignPointer) -> Self;

	fn pointer(&self) -> &ForeignPointer;
}

static NO_TABLES: LazyLock<PointerTables> = LazyLock::new(PointerTables::new);

/// The set of pointer tables available to one bridge.
#[derive(Clone, Default)]
pub struct PointerTables {
	tables: BTreeMap<TableId, Arc<dyn PointerTable>>,
}

impl fmt::Debug for PointerTables {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_map().entries(self.tables.iter().map(|(id, t)| (id, t.name()))).finish()
	}
}

impl PointerTables {
	pub fn new() -> Self {
		Self {
			tables: BTreeMap::new(),
		}
	}

	/// An empty set of tables, for payloads that never carry pointers.
	pub fn none() -> &'static PointerTables {
		&NO_TABLES
	}

	/// Registers a table under an id, replacing any previous table.
	pub fn register(&mut self, id: TableId, table: Arc<dyn PointerTable>) -> &mut Self {
		self.tables.insert(id, table);
		self
	}

	pub fn with(mut self, id: TableId, table: Arc<dyn PointerTable>) -> Self {
		self.register(id, table);
		self
	}

	pub fn get(&self, id: TableId) -> Result<&Arc<dyn PointerTable>> {
		self.tables.get(&id).ok_or(Error::MissingPointerTable(id.0))
	}
}

/// An in-process pointer table that issues sequential tokens and tracks
/// which of them are still live.
///
/// Tokens are written as big-endian `u64` values and are never reused.
pub struct MemoryPointerTable {
	name: String,
	state: Mutex<MemoryState>,
}

struct MemoryState {
	next: u64,
	live: HashSet<u64>,
}

impl MemoryPointerTable {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			state: Mutex::new(MemoryState {
				next: 1,
				live: HashSet::new(),
			}),
		}
	}

	/// Issues a new live pointer for the given table.
	pub fn issue(&self, table: TableId) -> ForeignPointer {
		let mut state = self.state.lock();
		let token = state.next;
		state.next += 1;
		state.live.insert(token);
		ForeignPointer::new(table, token)
	}

	/// Marks a pointer as freed. Returns false if it was not live.
	pub fn free(&self, pointer: &ForeignPointer) -> bool {
		self.state.lock().live.remove(&pointer.token())
	}

	/// Returns the number of live pointers.
	pub fn live(&self) -> usize {
		self.state.lock().live.len()
	}

	fn ensure_live(&self, token: u64) -> Result<()> {
		if self.state.lock().live.contains(&token) {
			Ok(())
		} else {
			Err(Error::UnknownPointer {
				table: self.name.clone(),
				token,
			})
		}
	}
}

impl PointerTable for MemoryPointerTable {
	fn name(&self) -> &str {
		&self.name
	}

	fn read(&self, table: TableId, raw: [u8; POINTER_SIZE]) -> Result<ForeignPointer> {
		let token = u64::from_be_bytes(raw);
		self.ensure_live(token)?;
		Ok(ForeignPointer::new(table, token))
	}

	fn write(&self, pointer: &ForeignPointer) -> Result<[u8; POINTER_SIZE]> {
		self.ensure_live(pointer.token())?;
		Ok(pointer.token().to_be_bytes())
	}
}
