use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use super::Codec;
use crate::cursor::{Reader, Writer};
use crate::err::{Error, Result, TypeError};

fn check_count(len: usize, what: &str) -> Result<i32, TypeError> {
	i32::try_from(len)
		.map_err(|_| TypeError::new(format!("{what} of {len} items does not fit an i32 count")))
}

fn read_count(r: &mut Reader<'_, '_>) -> Result<usize> {
	let count = r.read_i32()?;
	usize::try_from(count).map_err(|_| Error::NegativeLength(count))
}

impl<T: Codec> Codec for Option<T> {
	fn size_of(&self) -> usize {
		1 + self.as_ref().map_or(0, Codec::size_of)
	}

	fn check(&self) -> Result<(), TypeError> {
		match self {
			Some(v) => v.check(),
			None => Ok(()),
		}
	}

	fn write(&self, w: &mut Writer<'_, '_>) -> Result<()> {
		match self {
			None => w.write_u8(0),
			Some(v) => {
				w.write_u8(1)?;
				v.write(w)
			}
		}
	}

	fn read(r: &mut Reader<'_, '_>) -> Result<Self> {
		match r.read_u8()? {
			0 => Ok(None),
			1 => Ok(Some(T::read(r)?)),
			tag => Err(Error::InvalidTag {
				type_name: "Option",
				tag: i64::from(tag),
			}),
		}
	}
}

impl<T: Codec> Codec for Vec<T> {
	fn size_of(&self) -> usize {
		4 + self.iter().map(Codec::size_of).sum::<usize>()
	}

	fn check(&self) -> Result<(), TypeError> {
		check_count(self.len(), "sequence")?;
		for (i, v) in self.iter().enumerate() {
			v.check().map_err(|e| e.with_item(format!("[{i}]")))?;
		}
		Ok(())
	}

	fn write(&self, w: &mut Writer<'_, '_>) -> Result<()> {
		w.write_i32(check_count(self.len(), "sequence")?)?;
		for v in self {
			v.write(w)?;
		}
		Ok(())
	}

	fn read(r: &mut Reader<'_, '_>) -> Result<Self> {
		let count = read_count(r)?;
		// Every element takes at least one byte, except zero-sized ones
		let mut out = Vec::with_capacity(count.min(r.remaining()));
		for _ in 0..count {
			out.push(T::read(r)?);
		}
		Ok(out)
	}
}

macro_rules! impl_map {
	($map:ident, $($bound:ident),+) => {
		impl<K: Codec $(+ $bound)+, V: Codec> Codec for $map<K, V> {
			fn size_of(&self) -> usize {
				4 + self.iter().map(|(k, v)| k.size_of() + v.size_of()).sum::<usize>()
			}

			fn check(&self) -> Result<(), TypeError> {
				check_count(self.len(), "map")?;
				for (i, (k, v)) in self.iter().enumerate() {
					k.check().map_err(|e| e.with_item(format!("[{i}].key")))?;
					v.check().map_err(|e| e.with_item(format!("[{i}].value")))?;
				}
				Ok(())
			}

			fn write(&self, w: &mut Writer<'_, '_>) -> Result<()> {
				w.write_i32(check_count(self.len(), "map")?)?;
				for (k, v) in self {
					k.write(w)?;
					v.write(w)?;
				}
				Ok(())
			}

			fn read(r: &mut Reader<'_, '_>) -> Result<Self> {
				let count = read_count(r)?;
				let mut out = $map::new();
				for _ in 0..count {
					let k = K::read(r)?;
					let v = V::read(r)?;
					out.insert(k, v);
				}
				Ok(out)
			}
		}
	};
}

impl_map!(HashMap, Eq, Hash);
impl_map!(BTreeMap, Ord);

macro_rules! impl_tuple {
	($(($($name:ident $idx:tt),+)),+ $(,)?) => {
		$(impl<$($name: Codec),+> Codec for ($($name,)+) {
			fn size_of(&self) -> usize {
				0 $(+ self.$idx.size_of())+
			}

			fn check(&self) -> Result<(), TypeError> {
				$(self.$idx.check().map_err(|e| e.with_item(concat!(".", stringify!($idx))))?;)+
				Ok(())
			}

			fn write(&self, w: &mut Writer<'_, '_>) -> Result<()> {
				$(self.$idx.write(w)?;)+
				Ok(())
			}

			fn read(r: &mut Reader<'_, '_>) -> Result<Self> {
				Ok(($($name::read(r)?,)+))
			}
		})+
	}
}

impl_tuple! {
	(A 0),
	(A 0, B 1),
	(A 0, B 1, C 2),
	(A 0, B 1, C 2, D 3),
	(A 0, B 1, C 2, D 3, E 4),
	(A 0, B 1, C 2, D 3, E 4, F 5),
	(A 0, B 1, C 2, D 3, E 4, F 5, G 6),
	(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7),
}
