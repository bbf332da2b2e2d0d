// Virtual machine: instruction decoding, the register-frame interpreter,
// metamethod resolution and coroutine scheduling. `LuaVM` is the embedding
// entry point; `LuaState` is one thread of execution.

pub mod instruction;
pub mod opcode;

mod error;
mod execute;
mod lua_frame;
mod lua_state;

pub(crate) mod metamethod;

pub(crate) mod coroutine;

pub use error::{LuaError, LuaResult};
pub use instruction::Instruction;
pub use lua_state::{LUA_RIDX_GLOBALS, LuaState};
pub use opcode::OpCode;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::binchunk;
use crate::lua_value::{CoStatus, LuaTable, LuaThread, LuaValue, ThreadRef};

/// An embedded interpreter: the main thread plus the registry shared by
/// every coroutine spawned from it.
pub struct LuaVM {
    pub main: ThreadRef,
}

impl LuaVM {
    pub fn new() -> LuaVM {
        let registry = Rc::new(RefCell::new(LuaTable::new(0, 8)));
        let globals = LuaValue::new_table();
        let _ = registry
            .borrow_mut()
            .put(LuaValue::Integer(LUA_RIDX_GLOBALS), globals);

        let main = Rc::new_cyclic(|weak| LuaThread {
            state: RefCell::new(LuaState::new_main(registry, weak.clone())),
            status: Cell::new(CoStatus::Running),
        });
        LuaVM { main }
    }

    /// Install the standard library into the globals table.
    pub fn open_libs(&mut self) {
        let mut state = self.main.state.borrow_mut();
        crate::stdlib::open_libs(&mut state);
    }

    /// Load a chunk from source text or a precompiled binary chunk and wrap
    /// it in a closure with `_ENV` bound to the globals.
    pub fn load(&self, data: &[u8], chunk_name: &str) -> LuaResult<LuaValue> {
        let proto = binchunk::load_chunk(data, chunk_name)?;
        Ok(self.main.state.borrow().make_chunk_closure(proto))
    }

    /// Compile and run `source` on the main thread, returning everything
    /// the chunk returns.
    pub fn execute(&mut self, source: &str) -> LuaResult<Vec<LuaValue>> {
        let f = self.load(source.as_bytes(), "main")?;
        self.main
            .state
            .borrow_mut()
            .call_function(f, Vec::new(), -1)
    }
}

impl Default for LuaVM {
    fn default() -> Self {
        LuaVM::new()
    }
}
