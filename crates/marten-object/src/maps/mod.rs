//! Open-addressing hash maps
//!
//! Two flavours over one table: [`KeyToIntMap`] maps arbitrary keys to `i32`
//! (interning, name→position indexes) and [`IntMap`] maps `u32` keys to values
//! (indexed properties). Neither map is internally synchronized; owners guard
//! them with their own locks.

mod int_map;
mod key_to_int;
mod table;

pub use int_map::IntMap;
pub use key_to_int::KeyToIntMap;
pub use table::TableKey;
