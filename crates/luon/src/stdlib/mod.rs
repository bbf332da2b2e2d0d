// Standard library: the minimal basic functions plus the coroutine table.
// Everything registers through the host-function convention; there is no
// other privileged path into the runtime.

mod basic;
mod coroutine;

use crate::lua_value::{Closure, LuaValue, RustFn};
use crate::lua_vm::LuaState;

pub fn open_libs(state: &mut LuaState) {
    basic::open(state);
    coroutine::open(state);
}

pub(crate) fn host_fn(f: RustFn) -> LuaValue {
    LuaValue::Function(Closure::from_rust_fn(f, Vec::new()))
}
