// Code generation: AST -> Prototype. One `FuncInfo` per function being
// assembled; the stack mirrors lexical nesting so upvalue capture can walk
// outward through enclosing functions.

mod func_info;
mod gen_exp;
mod gen_stat;

use std::rc::Rc;

use smol_str::SmolStr;

use crate::binchunk::Prototype;
use crate::compiler::ast::{Block, Exp, FuncDef};
use crate::lua_vm::LuaResult;
use crate::lua_vm::instruction::Instruction;
use crate::lua_vm::OpCode;
use func_info::FuncInfo;

pub struct Codegen {
    fis: Vec<FuncInfo>,
    source: SmolStr,
}

/// Compile a chunk body. The chunk becomes a vararg function whose single
/// upvalue is `_ENV`, captured from a synthetic enclosing scope.
pub fn gen_proto(block: Block, chunk_name: &str) -> LuaResult<Rc<Prototype>> {
    let last_line = block.last_line;
    let fd = FuncDef {
        line: 0,
        last_line,
        par_list: Vec::new(),
        is_vararg: true,
        block: Box::new(block),
    };
    let outer_fd = FuncDef {
        line: 0,
        last_line,
        par_list: Vec::new(),
        is_vararg: false,
        block: Box::new(Block {
            stats: Vec::new(),
            ret_exps: None,
            last_line,
        }),
    };

    let mut cg = Codegen {
        fis: Vec::new(),
        source: SmolStr::new(chunk_name),
    };
    cg.fis.push(FuncInfo::new(&outer_fd));
    cg.fi().add_loc_var("_ENV", 0)?;
    cg.gen_func_def_exp(&fd, 0)?;

    let outer = cg.fis.pop().unwrap();
    Ok(outer.sub_protos.into_iter().next().unwrap())
}

impl Codegen {
    pub(super) fn fi(&mut self) -> &mut FuncInfo {
        self.fis.last_mut().unwrap()
    }

    pub(super) fn gen_block(&mut self, block: &Block) -> LuaResult<()> {
        for stat in &block.stats {
            self.gen_stat(stat)?;
        }
        if let Some(exps) = &block.ret_exps {
            self.gen_ret_stat(exps, block.last_line)?;
        }
        Ok(())
    }

    pub(super) fn gen_func_def_exp(&mut self, fd: &FuncDef, a: usize) -> LuaResult<()> {
        self.fis.push(FuncInfo::new(fd));
        for param in &fd.par_list {
            self.fi().add_loc_var(param, 0)?;
        }
        self.gen_block(&fd.block)?;
        let end_pc = self.fi().pc().wrapping_add(2);
        self.fi().exit_scope(end_pc)?;
        self.fi().check_unresolved_gotos()?;
        self.fi().emit_return(fd.last_line, 0, 0);

        let sub = self.fis.pop().unwrap();
        let proto = Rc::new(sub.into_proto(&self.source));
        let parent = self.fi();
        parent.sub_protos.push(proto);
        let bx = parent.sub_protos.len() - 1;
        parent.emit(fd.line, Instruction::abx(OpCode::Closure, a, bx));
        Ok(())
    }

    /// Resolve `name` as an upvalue of the current function, creating the
    /// capture chain through enclosing functions on first use.
    pub(super) fn index_of_upval(&mut self, name: &str) -> Option<usize> {
        self.index_of_upval_at(self.fis.len() - 1, name)
    }

    fn index_of_upval_at(&mut self, fi_idx: usize, name: &str) -> Option<usize> {
        if let Some(idx) = self.fis[fi_idx].find_upval(name) {
            return Some(idx);
        }
        if fi_idx == 0 {
            return None;
        }
        let parent = fi_idx - 1;
        if let Some(lv_idx) = self.fis[parent].loc_var_index(name) {
            let slot = self.fis[parent].loc_vars[lv_idx].slot;
            self.fis[parent].loc_vars[lv_idx].captured = true;
            let fi = &mut self.fis[fi_idx];
            fi.upvalues.push(func_info::UpvalInfo {
                name: SmolStr::new(name),
                loc_var_slot: Some(slot),
                upval_index: None,
            });
            return Some(fi.upvalues.len() - 1);
        }
        if let Some(uv_idx) = self.index_of_upval_at(parent, name) {
            let fi = &mut self.fis[fi_idx];
            fi.upvalues.push(func_info::UpvalInfo {
                name: SmolStr::new(name),
                loc_var_slot: None,
                upval_index: Some(uv_idx),
            });
            return Some(fi.upvalues.len() - 1);
        }
        None
    }
}

pub(super) fn is_vararg_or_func_call(exp: &Exp) -> bool {
    matches!(exp, Exp::Vararg { .. } | Exp::FuncCall(_))
}
