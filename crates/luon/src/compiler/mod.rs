// Source -> Prototype pipeline: lexer, parser, code generator.

pub mod ast;
mod codegen;
mod lexer;
mod parser;
mod token;

use std::rc::Rc;

use crate::binchunk::Prototype;
use crate::lua_vm::LuaResult;

pub use lexer::Lexer;
pub use token::{Token, TokenKind};

/// Compile Lua source into a prototype. `chunk_name` becomes the source
/// name carried in diagnostics and debug info.
pub fn compile(source: &str, chunk_name: &str) -> LuaResult<Rc<Prototype>> {
    let block = parser::parse(source)?;
    codegen::gen_proto(block, chunk_name)
}
