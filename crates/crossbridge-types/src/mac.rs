/// Declares a lazily read setting: the environment variable `$key` parsed as
/// `$t`, or `$default` when the variable is unset or does not parse.
///
/// ```rust,ignore
/// pub static MAX_BUFFER_SIZE: LazyLock<usize> =
///     lazy_env_parse!("CROSSBRIDGE_MAX_BUFFER_SIZE", usize, 1 << 20);
/// ```
#[macro_export]
macro_rules! lazy_env_parse {
	($key:expr_2021, $t:ty, $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or($default)
		})
	};
}

/// Implements [`Codec`](crate::Codec) for a record type.
///
/// Fields are written in the order they are listed, with no framing between
/// them, and read back in the same order. The listed order is part of the wire
/// format and must match the foreign side's declaration order.
///
/// ```rust,ignore
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// impl_record_codec!(Point { x: f64, y: f64 });
/// ```
#[macro_export]
macro_rules! impl_record_codec {
	($name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
		impl $crate::Codec for $name {
			#[allow(unused_variables)]
			fn size_of(&self) -> usize {
				0 $(+ $crate::Codec::size_of(&self.$field))*
			}

			#[allow(unused_variables)]
			fn check(&self) -> ::std::result::Result<(), $crate::TypeError> {
				$(
					$crate::Codec::check(&self.$field)
						.map_err(|e| e.with_item(concat!(".", stringify!($field))))?;
				)*
				Ok(())
			}

			#[allow(unused_variables)]
			fn write(&self, w: &mut $crate::Writer<'_, '_>) -> $crate::Result<()> {
				$($crate::Codec::write(&self.$field, w)?;)*
				Ok(())
			}

			#[allow(unused_variables)]
			fn read(r: &mut $crate::Reader<'_, '_>) -> $crate::Result<Self> {
				Ok(Self {
					$($field: <$ty as $crate::Codec>::read(r)?,)*
				})
			}
		}
	};
}

/// Implements [`Codec`](crate::Codec) for a tagged union.
///
/// Each variant is written as its `i32` index followed by its fields in the
/// order they are listed. Indices are declared explicitly because they are part
/// of the wire format; by convention they start at `1`. Unit variants are
/// listed with empty braces.
///
/// ```rust,ignore
/// enum Shape {
///     Circle { radius: f64 },
///     Empty,
/// }
///
/// impl_enum_codec!(Shape {
///     1 => Circle { radius: f64 },
///     2 => Empty {},
/// });
/// ```
#[macro_export]
macro_rules! impl_enum_codec {
	($name:ident { $($index:literal => $variant:ident { $($field:ident : $ty:ty),* $(,)? }),+ $(,)? }) => {
		impl $crate::Codec for $name {
			fn size_of(&self) -> usize {
				4 + match self {
					$(Self::$variant { $($field),* } => 0 $(+ $crate::Codec::size_of($field))*,)+
				}
			}

			fn check(&self) -> ::std::result::Result<(), $crate::TypeError> {
				match self {
					$(Self::$variant { $($field),* } => {
						$(
							$crate::Codec::check($field)
								.map_err(|e| e.with_item(concat!(".", stringify!($field))))?;
						)*
					})+
				}
				Ok(())
			}

			fn write(&self, w: &mut $crate::Writer<'_, '_>) -> $crate::Result<()> {
				match self {
					$(Self::$variant { $($field),* } => {
						w.write_i32($index)?;
						$($crate::Codec::write($field, w)?;)*
					})+
				}
				Ok(())
			}

			fn read(r: &mut $crate::Reader<'_, '_>) -> $crate::Result<Self> {
				match r.read_i32()? {
					$($index => Ok(Self::$variant {
						$($field: <$ty as $crate::Codec>::read(r)?,)*
					}),)+
					tag => Err($crate::Error::InvalidTag {
						type_name: stringify!($name),
						tag: i64::from(tag),
					}),
				}
			}
		}
	};
}

/// Implements [`Codec`](crate::Codec) for an object type whose instances live
/// on the foreign side and are referenced through a pointer table.
///
/// The type must implement [`ForeignObject`](crate::ForeignObject). The table id
/// is fixed per type; the eight pointer bytes are never interpreted here, they
/// are handed to the table registered under that id.
#[macro_export]
macro_rules! impl_object_codec {
	($name:ident, $table:expr_2021) => {
		impl $crate::Codec for $name {
			fn size_of(&self) -> usize {
				$crate::POINTER_SIZE
			}

			fn check(&self) -> ::std::result::Result<(), $crate::TypeError> {
				let pointer = $crate::ForeignObject::pointer(self);
				if pointer.table() != $table {
					return Err($crate::TypeError::new(format!(
						"Object is not a '{}' instance",
						stringify!($name)
					)));
				}
				Ok(())
			}

			fn write(&self, w: &mut $crate::Writer<'_, '_>) -> $crate::Result<()> {
				w.write_pointer($table, $crate::ForeignObject::pointer(self))
			}

			fn read(r: &mut $crate::Reader<'_, '_>) -> $crate::Result<Self> {
				Ok(<$name as $crate::ForeignObject>::from_pointer(r.read_pointer($table)?))
			}
		}
	};
}
