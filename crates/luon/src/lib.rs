// Lua 5.3 runtime
// A compact compiler + register VM: source text -> bytecode -> execution,
// with closures, metatables and cooperative coroutines.

#[cfg(test)]
mod test;

pub mod binchunk;
pub mod compiler;
pub mod lua_value;
pub mod lua_vm;
pub mod stdlib;

pub use binchunk::{Constant, LocVar, Prototype, UpvalueDesc};
pub use lua_value::{Closure, LuaTable, LuaThread, LuaValue};
pub use lua_vm::{Instruction, LuaError, LuaResult, LuaState, LuaVM, OpCode};
pub use stdlib::open_libs;
