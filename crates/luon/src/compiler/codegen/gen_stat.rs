// Statement code generation.

use smol_str::SmolStr;

use super::{Codegen, is_vararg_or_func_call};
use crate::binchunk::Constant;
use crate::compiler::ast::{Exp, Stat};
use crate::lua_vm::LuaResult;
use crate::lua_vm::OpCode;

// Hidden loop-control locals; the parenthesized names cannot collide with
// user variables.
const FOR_INDEX: &str = "(for index)";
const FOR_LIMIT: &str = "(for limit)";
const FOR_STEP: &str = "(for step)";
const FOR_GENERATOR: &str = "(for generator)";
const FOR_STATE: &str = "(for state)";
const FOR_CONTROL: &str = "(for control)";

enum AssignTarget {
    Local(usize),
    Upval(usize),
    GlobalConst(usize),
    GlobalReg(usize),
    Table { t: usize, k: usize },
}

impl Codegen {
    pub(super) fn gen_stat(&mut self, stat: &Stat) -> LuaResult<()> {
        match stat {
            Stat::Empty => Ok(()),
            Stat::FuncCall(fc) => {
                let r = self.fi().alloc_reg()?;
                self.gen_func_call_exp(fc, r, 0)?;
                self.fi().free_reg();
                Ok(())
            }
            Stat::Break { line } => {
                let pc = self.fi().emit_jmp(*line, 0, 0);
                self.fi().add_break_jmp(pc, *line)
            }
            Stat::Label { name, line } => self.fi().add_label(name, *line),
            Stat::Goto { name, line } => {
                let pc = self.fi().emit_jmp(*line, 0, 0);
                self.fi().add_goto(name, pc, *line);
                Ok(())
            }
            Stat::Do { block } => {
                self.fi().enter_scope(false);
                self.gen_block(block)?;
                self.fi().close_open_upvals(block.last_line);
                let end_pc = self.fi().pc() + 1;
                self.fi().exit_scope(end_pc)
            }
            Stat::While { exp, block } => self.gen_while_stat(exp, block),
            Stat::Repeat { block, exp } => self.gen_repeat_stat(block, exp),
            Stat::If { exps, blocks } => self.gen_if_stat(exps, blocks),
            Stat::ForNum {
                line_of_for,
                line_of_do,
                var_name,
                init,
                limit,
                step,
                block,
            } => self.gen_for_num_stat(*line_of_for, *line_of_do, var_name, init, limit, step, block),
            Stat::ForIn {
                line_of_do,
                name_list,
                exp_list,
                block,
            } => self.gen_for_in_stat(*line_of_do, name_list, exp_list, block),
            Stat::LocalVarDecl {
                last_line,
                name_list,
                exp_list,
            } => self.gen_local_var_decl(name_list, exp_list, *last_line),
            Stat::Assign {
                last_line,
                var_list,
                exp_list,
            } => self.gen_assign_stat(var_list, exp_list, *last_line),
            Stat::LocalFuncDef { name, exp } => {
                let start_pc = self.fi().pc().wrapping_add(2);
                let r = self.fi().add_loc_var(name, start_pc)?;
                // the local is in scope inside the body, so recursion works
                let Exp::FuncDef(fd) = exp else { unreachable!() };
                self.gen_func_def_exp(fd, r)
            }
        }
    }

    fn gen_while_stat(&mut self, exp: &Exp, block: &crate::compiler::ast::Block) -> LuaResult<()> {
        let pc_before_exp = self.fi().pc();

        let old_regs = self.fi().used_regs;
        let (a, _) = self.exp_to_op_arg(exp, super::gen_exp::ARG_REG)?;
        self.fi().used_regs = old_regs;
        let line = exp.line();
        self.fi().emit_abc(line, OpCode::Test, a, 0, 0);
        let pc_jmp_to_end = self.fi().emit_jmp(line, 0, 0);

        self.fi().enter_scope(true);
        self.gen_block(block)?;
        self.fi().close_open_upvals(block.last_line);
        let back = pc_before_exp as i32 - self.fi().pc() as i32 - 1;
        self.fi().emit_jmp(block.last_line, 0, back);
        let end_pc = self.fi().pc() + 1;
        self.fi().exit_scope(end_pc)?;
        let fwd = self.fi().pc() as i32 - pc_jmp_to_end as i32;
        self.fi().fix_sbx(pc_jmp_to_end, fwd);
        Ok(())
    }

    // until's condition sees the block's locals, so the scope closes after
    // the condition is generated.
    fn gen_repeat_stat(&mut self, block: &crate::compiler::ast::Block, exp: &Exp) -> LuaResult<()> {
        self.fi().enter_scope(true);
        let pc_before_block = self.fi().pc();
        self.gen_block(block)?;

        let old_regs = self.fi().used_regs;
        let (a, _) = self.exp_to_op_arg(exp, super::gen_exp::ARG_REG)?;
        self.fi().used_regs = old_regs;
        let line = exp.line();
        self.fi().emit_abc(line, OpCode::Test, a, 0, 0);
        let jmp_a = self.fi().get_jmp_arg_a();
        let back = pc_before_block as i32 - self.fi().pc() as i32 - 1;
        self.fi().emit_jmp(line, jmp_a, back);
        self.fi().close_open_upvals(line);

        let end_pc = self.fi().pc() + 1;
        self.fi().exit_scope(end_pc)
    }

    fn gen_if_stat(&mut self, exps: &[Exp], blocks: &[crate::compiler::ast::Block]) -> LuaResult<()> {
        let mut pc_jmp_to_ends = Vec::with_capacity(exps.len());
        let mut pc_jmp_to_next: Option<usize> = None;

        for (i, exp) in exps.iter().enumerate() {
            if let Some(pc) = pc_jmp_to_next {
                let sbx = self.fi().pc() as i32 - pc as i32;
                self.fi().fix_sbx(pc, sbx);
            }
            let old_regs = self.fi().used_regs;
            let (a, _) = self.exp_to_op_arg(exp, super::gen_exp::ARG_REG)?;
            self.fi().used_regs = old_regs;
            let line = exp.line();
            self.fi().emit_abc(line, OpCode::Test, a, 0, 0);
            let pc_jmp = self.fi().emit_jmp(line, 0, 0);
            pc_jmp_to_next = Some(pc_jmp);

            let block = &blocks[i];
            self.fi().enter_scope(false);
            self.gen_block(block)?;
            self.fi().close_open_upvals(block.last_line);
            let end_pc = self.fi().pc() + 1;
            self.fi().exit_scope(end_pc)?;

            if i < exps.len() - 1 {
                pc_jmp_to_ends.push(self.fi().emit_jmp(block.last_line, 0, 0));
            } else {
                pc_jmp_to_ends.push(pc_jmp);
            }
        }

        for pc in pc_jmp_to_ends {
            let sbx = self.fi().pc() as i32 - pc as i32;
            self.fi().fix_sbx(pc, sbx);
        }
        Ok(())
    }

    fn gen_for_num_stat(
        &mut self,
        line_of_for: u32,
        line_of_do: u32,
        var_name: &SmolStr,
        init: &Exp,
        limit: &Exp,
        step: &Exp,
        block: &crate::compiler::ast::Block,
    ) -> LuaResult<()> {
        self.fi().enter_scope(true);

        // the three control values live in hidden consecutive locals
        let names = [
            SmolStr::new(FOR_INDEX),
            SmolStr::new(FOR_LIMIT),
            SmolStr::new(FOR_STEP),
        ];
        let exps: Vec<&Exp> = vec![init, limit, step];
        self.gen_local_decl_from_refs(&names, &exps, line_of_for)?;
        let start_pc = self.fi().pc().wrapping_add(2);
        self.fi().add_loc_var(var_name, start_pc)?;

        let a = self.fi().used_regs - 4;
        let pc_for_prep = self
            .fi()
            .emit(line_of_do, crate::lua_vm::instruction::Instruction::asbx(OpCode::ForPrep, a, 0));
        self.gen_block(block)?;
        self.fi().close_open_upvals(block.last_line);
        let pc_for_loop = self
            .fi()
            .emit(line_of_for, crate::lua_vm::instruction::Instruction::asbx(OpCode::ForLoop, a, 0));

        self.fi()
            .fix_sbx(pc_for_prep, pc_for_loop as i32 - pc_for_prep as i32 - 1);
        self.fi()
            .fix_sbx(pc_for_loop, pc_for_prep as i32 - pc_for_loop as i32);

        let end_pc = self.fi().pc() + 1;
        self.fi().exit_scope(end_pc)?;
        self.fi().fix_end_pc(FOR_INDEX, 2);
        self.fi().fix_end_pc(FOR_LIMIT, 2);
        self.fi().fix_end_pc(FOR_STEP, 2);
        Ok(())
    }

    fn gen_for_in_stat(
        &mut self,
        line_of_do: u32,
        name_list: &[SmolStr],
        exp_list: &[Exp],
        block: &crate::compiler::ast::Block,
    ) -> LuaResult<()> {
        self.fi().enter_scope(true);

        let names = [
            SmolStr::new(FOR_GENERATOR),
            SmolStr::new(FOR_STATE),
            SmolStr::new(FOR_CONTROL),
        ];
        let exps: Vec<&Exp> = exp_list.iter().collect();
        self.gen_local_decl_from_refs(&names, &exps, line_of_do)?;
        let start_pc = self.fi().pc().wrapping_add(2);
        for name in name_list {
            self.fi().add_loc_var(name, start_pc)?;
        }

        let pc_jmp_to_tfc = self.fi().emit_jmp(line_of_do, 0, 0);
        self.gen_block(block)?;
        self.fi().close_open_upvals(block.last_line);
        let fwd = self.fi().pc() as i32 - pc_jmp_to_tfc as i32;
        self.fi().fix_sbx(pc_jmp_to_tfc, fwd);

        let line = exp_list[0].line();
        let r_generator = self.fi().slot_of_loc_var(FOR_GENERATOR).unwrap();
        self.fi()
            .emit_abc(line, OpCode::TForCall, r_generator, 0, name_list.len());
        let back = pc_jmp_to_tfc as i32 - self.fi().pc() as i32 - 1;
        self.fi().emit(
            line,
            crate::lua_vm::instruction::Instruction::asbx(OpCode::TForLoop, r_generator + 2, back),
        );

        let end_pc = self.fi().pc() + 1;
        self.fi().exit_scope(end_pc)?;
        self.fi().fix_end_pc(FOR_GENERATOR, 2);
        self.fi().fix_end_pc(FOR_STATE, 2);
        self.fi().fix_end_pc(FOR_CONTROL, 2);
        Ok(())
    }

    pub(super) fn gen_ret_stat(&mut self, exps: &[Exp], last_line: u32) -> LuaResult<()> {
        if exps.is_empty() {
            self.fi().emit_return(last_line, 0, 0);
            return Ok(());
        }
        if exps.len() == 1 {
            // return of a single local needs no copy
            if let Exp::Name { name, .. } = &exps[0] {
                if let Some(r) = self.fi().slot_of_loc_var(name) {
                    self.fi().emit_return(last_line, r, 1);
                    return Ok(());
                }
            }
            // `return f(...)` becomes a tail call
            if let Exp::FuncCall(fc) = &exps[0] {
                let r = self.fi().alloc_reg()?;
                self.gen_tail_call_exp(fc, r)?;
                self.fi().free_reg();
                self.fi().emit_return(last_line, r, -1);
                return Ok(());
            }
        }

        let n_exps = exps.len();
        let mult_ret = is_vararg_or_func_call(&exps[n_exps - 1]);
        for (i, exp) in exps.iter().enumerate() {
            let r = self.fi().alloc_reg()?;
            if i == n_exps - 1 && mult_ret {
                self.gen_exp(exp, r, -1)?;
            } else {
                self.gen_exp(exp, r, 1)?;
            }
        }
        self.fi().free_regs(n_exps);
        let a = self.fi().used_regs;
        if mult_ret {
            self.fi().emit_return(last_line, a, -1);
        } else {
            self.fi().emit_return(last_line, a, n_exps as i32);
        }
        Ok(())
    }

    fn gen_local_var_decl(
        &mut self,
        name_list: &[SmolStr],
        exp_list: &[Exp],
        last_line: u32,
    ) -> LuaResult<()> {
        let exps: Vec<&Exp> = exp_list.iter().collect();
        self.gen_local_decl_from_refs(name_list, &exps, last_line)
    }

    // Shared by `local` statements and the hidden loop-variable triples.
    fn gen_local_decl_from_refs(
        &mut self,
        name_list: &[SmolStr],
        exps: &[&Exp],
        last_line: u32,
    ) -> LuaResult<()> {
        let n_names = name_list.len();
        let n_exps = exps.len();
        let old_regs = self.fi().used_regs;

        if n_exps == n_names {
            for &exp in exps {
                let a = self.fi().alloc_reg()?;
                self.gen_exp(exp, a, 1)?;
            }
        } else if n_exps > n_names {
            for (i, &exp) in exps.iter().enumerate() {
                let a = self.fi().alloc_reg()?;
                if i == n_exps - 1 && is_vararg_or_func_call(exp) {
                    self.gen_exp(exp, a, 0)?;
                } else {
                    self.gen_exp(exp, a, 1)?;
                }
            }
        } else {
            let mut mult_ret = false;
            for (i, &exp) in exps.iter().enumerate() {
                let a = self.fi().alloc_reg()?;
                if i == n_exps - 1 && is_vararg_or_func_call(exp) {
                    mult_ret = true;
                    let n = n_names - n_exps + 1;
                    self.gen_exp(exp, a, n as i32)?;
                    self.fi().alloc_regs(n - 1)?;
                } else {
                    self.gen_exp(exp, a, 1)?;
                }
            }
            if !mult_ret {
                let n = n_names - n_exps;
                let a = self.fi().alloc_regs(n)?;
                self.fi().emit_load_nil(last_line, a, n);
            }
        }

        self.fi().used_regs = old_regs;
        let start_pc = self.fi().pc().wrapping_add(2);
        for name in name_list {
            self.fi().add_loc_var(name, start_pc)?;
        }
        Ok(())
    }

    fn gen_assign_stat(
        &mut self,
        var_list: &[Exp],
        exp_list: &[Exp],
        last_line: u32,
    ) -> LuaResult<()> {
        let n_vars = var_list.len();
        let n_exps = exp_list.len();
        let old_regs = self.fi().used_regs;

        // Pass 1: resolve targets; table prefixes and keys evaluate now,
        // left to right, before any right-hand side value.
        let mut targets = Vec::with_capacity(n_vars);
        for var in var_list {
            let target = match var {
                Exp::TableAccess { obj, key, .. } => {
                    let t = self.fi().alloc_reg()?;
                    self.gen_exp(obj, t, 1)?;
                    let k = self.fi().alloc_reg()?;
                    self.gen_exp(key, k, 1)?;
                    AssignTarget::Table { t, k }
                }
                Exp::Name { name, line } => {
                    if let Some(slot) = self.fi().slot_of_loc_var(name) {
                        AssignTarget::Local(slot)
                    } else if let Some(idx) = self.index_of_upval(name) {
                        AssignTarget::Upval(idx)
                    } else {
                        let kidx = self.fi().index_of_constant(&Constant::Str(name.clone()));
                        if kidx <= 0xFF {
                            AssignTarget::GlobalConst(kidx)
                        } else {
                            let r = self.fi().alloc_reg()?;
                            self.fi().emit_load_k(*line, r, Constant::Str(name.clone()));
                            AssignTarget::GlobalReg(r)
                        }
                    }
                }
                _ => unreachable!("parser admits only names and table fields"),
            };
            targets.push(target);
        }

        // Pass 2: values land in consecutive registers.
        let v_base = self.fi().used_regs;
        if n_exps >= n_vars {
            for (i, exp) in exp_list.iter().enumerate() {
                let a = self.fi().alloc_reg()?;
                if i >= n_vars && i == n_exps - 1 && is_vararg_or_func_call(exp) {
                    self.gen_exp(exp, a, 0)?;
                } else {
                    self.gen_exp(exp, a, 1)?;
                }
            }
        } else {
            let mut mult_ret = false;
            for (i, exp) in exp_list.iter().enumerate() {
                let a = self.fi().alloc_reg()?;
                if i == n_exps - 1 && is_vararg_or_func_call(exp) {
                    mult_ret = true;
                    let n = n_vars - n_exps + 1;
                    self.gen_exp(exp, a, n as i32)?;
                    self.fi().alloc_regs(n - 1)?;
                } else {
                    self.gen_exp(exp, a, 1)?;
                }
            }
            if !mult_ret {
                let n = n_vars - n_exps;
                let a = self.fi().alloc_regs(n)?;
                self.fi().emit_load_nil(last_line, a, n);
            }
        }

        // Pass 3: stores, left to right.
        for (i, target) in targets.iter().enumerate() {
            let v = v_base + i;
            match target {
                AssignTarget::Local(slot) => {
                    self.fi().emit_abc(last_line, OpCode::Move, *slot, v, 0);
                }
                AssignTarget::Upval(idx) => {
                    self.fi().emit_abc(last_line, OpCode::SetUpval, v, *idx, 0);
                }
                AssignTarget::GlobalConst(kidx) => {
                    let env = self.index_of_upval("_ENV").unwrap_or(0);
                    self.fi()
                        .emit_abc(last_line, OpCode::SetTabUp, env, 0x100 + kidx, v);
                }
                AssignTarget::GlobalReg(kreg) => {
                    let env = self.index_of_upval("_ENV").unwrap_or(0);
                    self.fi()
                        .emit_abc(last_line, OpCode::SetTabUp, env, *kreg, v);
                }
                AssignTarget::Table { t, k } => {
                    self.fi().emit_abc(last_line, OpCode::SetTable, *t, *k, v);
                }
            }
        }

        self.fi().used_regs = old_regs;
        Ok(())
    }
}
