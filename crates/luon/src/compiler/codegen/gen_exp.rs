// Expression code generation. `gen_exp(exp, a, n)` materializes `exp` into
// register `a`; `n` is how many values the caller wants from a multi-value
// expression (-1 for "all").

use smol_str::SmolStr;

use super::{Codegen, is_vararg_or_func_call};
use crate::binchunk::Constant;
use crate::compiler::ast::{Exp, FuncCall};
use crate::compiler::token::TokenKind;
use crate::lua_value::number::int_to_fb;
use crate::lua_vm::LuaResult;
use crate::lua_vm::OpCode;

// Operand kinds accepted by `exp_to_op_arg`, combinable as a mask.
pub(super) const ARG_CONST: u8 = 1;
pub(super) const ARG_REG: u8 = 2;
pub(super) const ARG_UPVAL: u8 = 4;
pub(super) const ARG_RK: u8 = ARG_REG | ARG_CONST;
pub(super) const ARG_RU: u8 = ARG_REG | ARG_UPVAL;

/// Fields per SETLIST batch, as in luac.
const FIELDS_PER_FLUSH: usize = 50;

impl Codegen {
    pub(super) fn gen_exp(&mut self, exp: &Exp, a: usize, n: i32) -> LuaResult<()> {
        match exp {
            Exp::Nil { line } => {
                self.fi().emit_load_nil(*line, a, n.max(1) as usize);
                Ok(())
            }
            Exp::False { line } => {
                self.fi().emit_load_bool(*line, a, 0, 0);
                Ok(())
            }
            Exp::True { line } => {
                self.fi().emit_load_bool(*line, a, 1, 0);
                Ok(())
            }
            Exp::Integer { line, val } => {
                self.fi().emit_load_k(*line, a, Constant::Integer(*val));
                Ok(())
            }
            Exp::Float { line, val } => {
                self.fi().emit_load_k(*line, a, Constant::Float(*val));
                Ok(())
            }
            Exp::Str { line, val } => {
                self.fi().emit_load_k(*line, a, Constant::Str(val.clone()));
                Ok(())
            }
            Exp::Parens(inner) => self.gen_exp(inner, a, 1),
            Exp::Vararg { line } => {
                // VARARG a, n+1
                self.fi()
                    .emit_abc(*line, OpCode::Vararg, a, (n + 1) as usize, 0);
                Ok(())
            }
            Exp::FuncDef(fd) => self.gen_func_def_exp(fd, a),
            Exp::TableConstructor { .. } => self.gen_table_constructor_exp(exp, a),
            Exp::Unop { line, op, exp } => self.gen_unop_exp(*line, *op, exp, a),
            Exp::Binop { line, op, lhs, rhs } => self.gen_binop_exp(*line, *op, lhs, rhs, a),
            Exp::Concat { line, exps } => self.gen_concat_exp(*line, exps, a),
            Exp::Name { line, name } => self.gen_name_exp(*line, name, a),
            Exp::TableAccess {
                last_line,
                obj,
                key,
            } => self.gen_table_access_exp(*last_line, obj, key, a),
            Exp::FuncCall(fc) => self.gen_func_call_exp(fc, a, n),
        }
    }

    fn gen_name_exp(&mut self, line: u32, name: &SmolStr, a: usize) -> LuaResult<()> {
        if let Some(slot) = self.fi().slot_of_loc_var(name) {
            self.fi().emit_abc(line, OpCode::Move, a, slot, 0);
            return Ok(());
        }
        if let Some(idx) = self.index_of_upval(name) {
            self.fi().emit_abc(line, OpCode::GetUpval, a, idx, 0);
            return Ok(());
        }
        // free name: sugar for _ENV[name]
        let obj = Exp::Name {
            line,
            name: SmolStr::new("_ENV"),
        };
        let key = Exp::Str {
            line,
            val: name.clone(),
        };
        self.gen_table_access_exp(line, &obj, &key, a)
    }

    fn gen_table_access_exp(
        &mut self,
        last_line: u32,
        obj: &Exp,
        key: &Exp,
        a: usize,
    ) -> LuaResult<()> {
        let old_regs = self.fi().used_regs;
        let (b, kind_b) = self.exp_to_op_arg(obj, ARG_RU)?;
        let (c, _) = self.exp_to_op_arg(key, ARG_RK)?;
        self.fi().used_regs = old_regs;
        let op = if kind_b == ARG_UPVAL {
            OpCode::GetTabUp
        } else {
            OpCode::GetTable
        };
        self.fi().emit_abc(last_line, op, a, b, c);
        Ok(())
    }

    fn gen_unop_exp(&mut self, line: u32, op: TokenKind, operand: &Exp, a: usize) -> LuaResult<()> {
        let old_regs = self.fi().used_regs;
        let (b, _) = self.exp_to_op_arg(operand, ARG_REG)?;
        self.fi().used_regs = old_regs;
        self.fi().emit_unary_op(line, op, a, b);
        Ok(())
    }

    fn gen_binop_exp(
        &mut self,
        line: u32,
        op: TokenKind,
        lhs: &Exp,
        rhs: &Exp,
        a: usize,
    ) -> LuaResult<()> {
        match op {
            // and/or: TESTSET skips the second operand when the first
            // already decides the result.
            TokenKind::OpAnd | TokenKind::OpOr => {
                let old_regs = self.fi().used_regs;
                let (b, _) = self.exp_to_op_arg(lhs, ARG_REG)?;
                self.fi().used_regs = old_regs;
                let c = (op == TokenKind::OpOr) as usize;
                self.fi().emit_abc(line, OpCode::TestSet, a, b, c);
                let pc_jmp = self.fi().emit_jmp(line, 0, 0);

                let old_regs = self.fi().used_regs;
                let (b, _) = self.exp_to_op_arg(rhs, ARG_REG)?;
                self.fi().used_regs = old_regs;
                self.fi().emit_abc(line, OpCode::Move, a, b, 0);
                let target = self.fi().pc() as i32 - pc_jmp as i32;
                self.fi().fix_sbx(pc_jmp, target);
            }
            _ => {
                let old_regs = self.fi().used_regs;
                let (b, _) = self.exp_to_op_arg(lhs, ARG_RK)?;
                let (c, _) = self.exp_to_op_arg(rhs, ARG_RK)?;
                self.fi().used_regs = old_regs;
                self.fi().emit_binary_op(line, op, a, b, c);
            }
        }
        Ok(())
    }

    fn gen_concat_exp(&mut self, line: u32, exps: &[Exp], a: usize) -> LuaResult<()> {
        for exp in exps {
            let r = self.fi().alloc_reg()?;
            self.gen_exp(exp, r, 1)?;
        }
        let fi = self.fi();
        let c = fi.used_regs - 1;
        let b = c - exps.len() + 1;
        fi.free_regs(exps.len());
        fi.emit_abc(line, OpCode::Concat, a, b, c);
        Ok(())
    }

    fn gen_table_constructor_exp(&mut self, exp: &Exp, a: usize) -> LuaResult<()> {
        let Exp::TableConstructor {
            line,
            key_exps,
            val_exps,
            ..
        } = exp
        else {
            unreachable!()
        };
        let n_arr = key_exps.iter().filter(|k| k.is_none()).count();
        let n_fields = key_exps.len();
        let mult_ret = n_fields > 0
            && key_exps[n_fields - 1].is_none()
            && is_vararg_or_func_call(&val_exps[n_fields - 1]);

        self.fi().emit_abc(
            *line,
            OpCode::NewTable,
            a,
            int_to_fb(n_arr),
            int_to_fb(n_fields - n_arr),
        );

        let mut arr_idx = 0usize;
        for (i, key_exp) in key_exps.iter().enumerate() {
            let val_exp = &val_exps[i];
            match key_exp {
                None => {
                    arr_idx += 1;
                    let tmp = self.fi().alloc_reg()?;
                    let last = i == n_fields - 1;
                    if last && mult_ret {
                        self.gen_exp(val_exp, tmp, -1)?;
                    } else {
                        self.gen_exp(val_exp, tmp, 1)?;
                    }
                    if arr_idx % FIELDS_PER_FLUSH == 0 || arr_idx == n_arr {
                        let mut n = arr_idx % FIELDS_PER_FLUSH;
                        if n == 0 {
                            n = FIELDS_PER_FLUSH;
                        }
                        self.fi().free_regs(n);
                        let line = val_exp.line();
                        let batch = (arr_idx - 1) / FIELDS_PER_FLUSH + 1;
                        let b = if last && mult_ret { 0 } else { n };
                        self.emit_set_list(line, a, b, batch);
                    }
                }
                Some(key) => {
                    let b = self.fi().alloc_reg()?;
                    self.gen_exp(key, b, 1)?;
                    let c = self.fi().alloc_reg()?;
                    self.gen_exp(val_exp, c, 1)?;
                    self.fi().free_regs(2);
                    self.fi()
                        .emit_abc(val_exp.line(), OpCode::SetTable, a, b, c);
                }
            }
        }
        Ok(())
    }

    // SETLIST with the batch number in C, spilling to EXTRAARG when it
    // outgrows the 9-bit field.
    fn emit_set_list(&mut self, line: u32, a: usize, b: usize, batch: usize) {
        if batch < 512 {
            self.fi().emit_abc(line, OpCode::SetList, a, b, batch);
        } else {
            self.fi().emit_abc(line, OpCode::SetList, a, b, 0);
            let fi = self.fi();
            fi.emit(
                line,
                crate::lua_vm::instruction::Instruction::ax_arg(OpCode::ExtraArg, batch),
            );
        }
    }

    pub(super) fn gen_func_call_exp(&mut self, fc: &FuncCall, a: usize, n: i32) -> LuaResult<()> {
        let n_args = self.prep_func_call(fc, a)?;
        // CALL a, b, c: b-1 args (0 = "to top"), c-1 wanted results
        self.fi().emit_abc(
            fc.line,
            OpCode::Call,
            a,
            (n_args + 1) as usize,
            (n + 1) as usize,
        );
        Ok(())
    }

    pub(super) fn gen_tail_call_exp(&mut self, fc: &FuncCall, a: usize) -> LuaResult<()> {
        let n_args = self.prep_func_call(fc, a)?;
        self.fi()
            .emit_abc(fc.line, OpCode::TailCall, a, (n_args + 1) as usize, 0);
        Ok(())
    }

    // Lay out callee and arguments starting at `a`; returns the encoded
    // argument count (-1 when the last argument spreads to top).
    fn prep_func_call(&mut self, fc: &FuncCall, a: usize) -> LuaResult<i32> {
        let n_args = fc.args.len();
        let mut last_arg_spreads = false;

        self.gen_exp(&fc.prefix, a, 1)?;
        if let Some(name_exp) = &fc.name_exp {
            self.fi().alloc_reg()?;
            let (c, kind) = self.exp_to_op_arg(name_exp, ARG_RK)?;
            self.fi().emit_abc(fc.line, OpCode::SelfLoad, a, a, c);
            if kind == ARG_REG {
                self.fi().free_regs(1);
            }
        }
        for (i, arg) in fc.args.iter().enumerate() {
            let tmp = self.fi().alloc_reg()?;
            if i == n_args - 1 && is_vararg_or_func_call(arg) {
                last_arg_spreads = true;
                self.gen_exp(arg, tmp, -1)?;
            } else {
                self.gen_exp(arg, tmp, 1)?;
            }
        }
        self.fi().free_regs(n_args);

        let mut n_args = n_args as i32;
        if fc.name_exp.is_some() {
            self.fi().free_reg();
            n_args += 1;
        }
        if last_arg_spreads {
            n_args = -1;
        }
        Ok(n_args)
    }

    /// Produce an operand for `exp`: a constant-pool reference, an upvalue
    /// index, or a register, whichever of the allowed kinds fits. Falls
    /// back to evaluating into a fresh register.
    pub(super) fn exp_to_op_arg(&mut self, exp: &Exp, kinds: u8) -> LuaResult<(usize, u8)> {
        if kinds & ARG_CONST != 0 {
            let k = match exp {
                Exp::Nil { .. } => Some(Constant::Nil),
                Exp::False { .. } => Some(Constant::Boolean(false)),
                Exp::True { .. } => Some(Constant::Boolean(true)),
                Exp::Integer { val, .. } => Some(Constant::Integer(*val)),
                Exp::Float { val, .. } => Some(Constant::Float(*val)),
                Exp::Str { val, .. } => Some(Constant::Str(val.clone())),
                _ => None,
            };
            if let Some(k) = k {
                let idx = self.fi().index_of_constant(&k);
                if idx <= 0xFF {
                    return Ok((0x100 + idx, ARG_CONST));
                }
            }
        }
        if let Exp::Name { name, .. } = exp {
            if kinds & ARG_REG != 0 {
                if let Some(slot) = self.fi().slot_of_loc_var(name) {
                    return Ok((slot, ARG_REG));
                }
            }
            if kinds & ARG_UPVAL != 0 {
                if let Some(idx) = self.index_of_upval(name) {
                    return Ok((idx, ARG_UPVAL));
                }
            }
        }
        let a = self.fi().alloc_reg()?;
        self.gen_exp(exp, a, 1)?;
        Ok((a, ARG_REG))
    }
}
