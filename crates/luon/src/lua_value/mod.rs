mod closure;
mod lua_table;
mod lua_value;
pub mod number;

pub use closure::{Closure, RustFn, UpvalueCell, new_cell};
pub use lua_table::LuaTable;
pub use lua_value::{CoStatus, LuaKey, LuaThread, LuaUserData, LuaValue, TableRef, ThreadRef};
