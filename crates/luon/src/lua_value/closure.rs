// Closures pair code (scripted or host) with captured upvalue cells.
// Exactly one of `proto` / `rust_fn` is present.

use std::cell::RefCell;
use std::rc::Rc;

use super::lua_value::LuaValue;
use crate::binchunk::Prototype;
use crate::lua_vm::{LuaResult, LuaState};

/// Host function convention: receives the running coroutine state, returns
/// how many result values it left on top of its frame.
pub type RustFn = fn(&mut LuaState) -> LuaResult<usize>;

/// A shared mutable variable cell. Two closures capturing the same variable
/// hold the same cell; register slots are cells too, so a capture aliases
/// the live register rather than copying it.
pub type UpvalueCell = Rc<RefCell<LuaValue>>;

pub fn new_cell(v: LuaValue) -> UpvalueCell {
    Rc::new(RefCell::new(v))
}

pub struct Closure {
    pub proto: Option<Rc<Prototype>>,
    pub rust_fn: Option<RustFn>,
    pub upvals: Vec<UpvalueCell>,
}

impl Closure {
    pub fn from_proto(proto: Rc<Prototype>, upvals: Vec<UpvalueCell>) -> Rc<Closure> {
        debug_assert_eq!(upvals.len(), proto.upvalues.len());
        Rc::new(Closure {
            proto: Some(proto),
            rust_fn: None,
            upvals,
        })
    }

    pub fn from_rust_fn(f: RustFn, upvals: Vec<UpvalueCell>) -> Rc<Closure> {
        Rc::new(Closure {
            proto: None,
            rust_fn: Some(f),
            upvals,
        })
    }

    pub fn is_lua(&self) -> bool {
        self.proto.is_some()
    }
}
