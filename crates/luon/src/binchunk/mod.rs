// Binary chunk: the persisted form of compiled functions.
// Layout matches luac 5.3 output byte for byte.

mod reader;
mod writer;

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use smol_str::SmolStr;

use crate::lua_vm::LuaResult;

pub use reader::undump;
pub use writer::dump;

pub const LUA_SIGNATURE: &[u8; 4] = b"\x1bLua";
pub const LUAC_VERSION: u8 = 0x53;
pub const LUAC_FORMAT: u8 = 0;
pub const LUAC_DATA: &[u8; 6] = b"\x19\x93\r\n\x1a\n";
pub const CINT_SIZE: u8 = 4;
pub const CSIZET_SIZE: u8 = 8;
pub const INSTRUCTION_SIZE: u8 = 4;
pub const LUA_INTEGER_SIZE: u8 = 8;
pub const LUA_NUMBER_SIZE: u8 = 8;
pub const LUAC_INT: i64 = 0x5678;
pub const LUAC_NUM: f64 = 370.5;

pub const TAG_NIL: u8 = 0x00;
pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_NUMBER: u8 = 0x03;
pub const TAG_INTEGER: u8 = 0x13;
pub const TAG_SHORT_STR: u8 = 0x04;
pub const TAG_LONG_STR: u8 = 0x14;

/// True if `data` starts with the binary chunk signature; used by `load`
/// to decide between decoding and compiling.
pub fn is_binary_chunk(data: &[u8]) -> bool {
    data.len() >= 4 && &data[..4] == LUA_SIGNATURE
}

/// A compile-time constant. Kept separate from the runtime value type so
/// prototypes stay plain data, shareable and serializable.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Nil,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Str(SmolStr),
}

// Constants are deduplicated by value equality in the constant pool; floats
// hash by bit pattern (the lexer never produces NaN constants).
impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Constant::Nil => 0u8.hash(state),
            Constant::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Constant::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Constant::Float(f) => {
                3u8.hash(state);
                f.to_bits().hash(state);
            }
            Constant::Str(s) => {
                4u8.hash(state);
                s.hash(state);
            }
        }
    }
}

/// Upvalue descriptor: where the closure instruction finds the captured
/// variable. `in_stack` means "a register of the enclosing function",
/// otherwise `idx` indexes the enclosing closure's own upvalues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpvalueDesc {
    pub name: SmolStr,
    pub in_stack: u8,
    pub idx: u8,
}

/// Local-variable debug record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocVar {
    pub var_name: SmolStr,
    pub start_pc: u32,
    pub end_pc: u32,
}

/// The compiled unit: bytecode plus everything the VM needs to run it.
/// Immutable after generation; every closure made from it shares one `Rc`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prototype {
    pub source: SmolStr,
    pub line_defined: u32,
    pub last_line_defined: u32,
    pub num_params: u8,
    pub is_vararg: u8,
    pub max_stack_size: u8,
    pub code: Vec<u32>,
    pub constants: Vec<Constant>,
    pub upvalues: Vec<UpvalueDesc>,
    pub protos: Vec<Rc<Prototype>>,
    pub line_info: Vec<u32>,
    pub loc_vars: Vec<LocVar>,
}

impl Prototype {
    /// Source line for an instruction index, when debug info is present.
    pub fn line_at(&self, pc: usize) -> Option<u32> {
        self.line_info.get(pc).copied()
    }
}

/// Decode `data` if it is a binary chunk, otherwise compile it as source.
pub fn load_chunk(data: &[u8], chunk_name: &str) -> LuaResult<Rc<Prototype>> {
    if is_binary_chunk(data) {
        undump(data).map(Rc::new)
    } else {
        let source = String::from_utf8_lossy(data);
        crate::compiler::compile(&source, chunk_name)
    }
}
