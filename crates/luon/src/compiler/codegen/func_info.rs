// Per-function assembly state: register allocation, scoped locals,
// constants, pending jumps, and the instruction buffer.

use ahash::AHashMap;
use smol_str::SmolStr;

use crate::binchunk::{Constant, LocVar, Prototype, UpvalueDesc};
use crate::compiler::ast::FuncDef;
use crate::compiler::token::TokenKind;
use crate::lua_vm::instruction::{Instruction, MAXARG_BX};
use crate::lua_vm::{LuaError, OpCode};
use crate::lua_vm::LuaResult;

/// Registers are addressed by 8 bits; the last slot is reserved for
/// internal shuffling, as in luac.
pub const MAX_REGS: usize = 255;

pub struct LocVarInfo {
    pub prev: Option<usize>,
    pub name: SmolStr,
    pub scope_lv: isize,
    pub slot: usize,
    pub start_pc: usize,
    pub end_pc: usize,
    pub captured: bool,
}

pub struct UpvalInfo {
    pub name: SmolStr,
    /// Register of the enclosing function, for captures of its locals.
    pub loc_var_slot: Option<usize>,
    /// Index into the enclosing function's upvalues, for chained captures.
    pub upval_index: Option<usize>,
}

struct LabelInfo {
    name: SmolStr,
    pc: usize,
    scope_lv: isize,
    active_locals: usize,
}

struct GotoInfo {
    name: SmolStr,
    pc: usize,
    line: u32,
    scope_lv: isize,
    active_locals: usize,
}

pub struct FuncInfo {
    const_index: AHashMap<Constant, usize>,
    const_list: Vec<Constant>,
    pub used_regs: usize,
    pub max_regs: usize,
    scope_lv: isize,
    pub loc_vars: Vec<LocVarInfo>,
    loc_names: AHashMap<SmolStr, usize>,
    active_locals: usize,
    breaks: Vec<Option<Vec<usize>>>,
    pub upvalues: Vec<UpvalInfo>,
    labels: Vec<LabelInfo>,
    gotos: Vec<GotoInfo>,
    insts: Vec<Instruction>,
    line_nums: Vec<u32>,
    line: u32,
    last_line: u32,
    num_params: usize,
    is_vararg: bool,
    pub sub_protos: Vec<std::rc::Rc<Prototype>>,
}

impl FuncInfo {
    pub fn new(fd: &FuncDef) -> FuncInfo {
        FuncInfo {
            const_index: AHashMap::new(),
            const_list: Vec::new(),
            used_regs: 0,
            max_regs: 0,
            scope_lv: 0,
            loc_vars: Vec::new(),
            loc_names: AHashMap::new(),
            active_locals: 0,
            breaks: vec![None],
            upvalues: Vec::new(),
            labels: Vec::new(),
            gotos: Vec::new(),
            insts: Vec::new(),
            line_nums: Vec::new(),
            line: fd.line,
            last_line: fd.last_line,
            num_params: fd.par_list.len(),
            is_vararg: fd.is_vararg,
            sub_protos: Vec::new(),
        }
    }

    // ---- constants ----

    pub fn index_of_constant(&mut self, k: &Constant) -> usize {
        if let Some(&idx) = self.const_index.get(k) {
            return idx;
        }
        let idx = self.const_list.len();
        self.const_list.push(k.clone());
        self.const_index.insert(k.clone(), idx);
        idx
    }

    // ---- registers ----

    pub fn alloc_reg(&mut self) -> LuaResult<usize> {
        if self.used_regs >= MAX_REGS {
            return Err(LuaError::Codegen {
                message: "function or expression needs too many registers".to_string(),
            });
        }
        self.used_regs += 1;
        if self.used_regs > self.max_regs {
            self.max_regs = self.used_regs;
        }
        Ok(self.used_regs - 1)
    }

    pub fn alloc_regs(&mut self, n: usize) -> LuaResult<usize> {
        for _ in 0..n {
            self.alloc_reg()?;
        }
        Ok(self.used_regs - n)
    }

    pub fn free_reg(&mut self) {
        debug_assert!(self.used_regs > 0);
        self.used_regs -= 1;
    }

    pub fn free_regs(&mut self, n: usize) {
        for _ in 0..n {
            self.free_reg();
        }
    }

    // ---- scopes and locals ----

    pub fn enter_scope(&mut self, breakable: bool) {
        self.scope_lv += 1;
        self.breaks.push(if breakable { Some(Vec::new()) } else { None });
    }

    pub fn exit_scope(&mut self, end_pc: usize) -> LuaResult<()> {
        if let Some(Some(pending)) = self.breaks.pop() {
            let a = self.get_jmp_arg_a();
            for pc in pending {
                let sbx = self.pc() as i32 - pc as i32;
                self.insts[pc] = Instruction::asbx(OpCode::Jmp, a, sbx);
            }
        }
        self.resolve_gotos()?;
        self.scope_lv -= 1;
        let names: Vec<SmolStr> = self.loc_names.keys().cloned().collect();
        for name in names {
            let Some(&idx) = self.loc_names.get(&name) else {
                continue;
            };
            if self.loc_vars[idx].scope_lv > self.scope_lv {
                self.loc_vars[idx].end_pc = end_pc;
                self.remove_loc_var(idx);
            }
        }
        Ok(())
    }

    fn remove_loc_var(&mut self, idx: usize) {
        self.free_reg();
        self.active_locals -= 1;
        let (name, scope_lv, prev) = {
            let lv = &self.loc_vars[idx];
            (lv.name.clone(), lv.scope_lv, lv.prev)
        };
        match prev {
            None => {
                self.loc_names.remove(&name);
            }
            Some(p) if self.loc_vars[p].scope_lv == scope_lv => {
                self.loc_vars[p].end_pc = self.loc_vars[idx].end_pc;
                self.remove_loc_var(p);
            }
            Some(p) => {
                self.loc_names.insert(name, p);
            }
        }
    }

    pub fn add_loc_var(&mut self, name: &str, start_pc: usize) -> LuaResult<usize> {
        let slot = self.alloc_reg()?;
        let idx = self.loc_vars.len();
        let prev = self.loc_names.get(name).copied();
        self.loc_vars.push(LocVarInfo {
            prev,
            name: SmolStr::new(name),
            scope_lv: self.scope_lv,
            slot,
            start_pc,
            end_pc: 0,
            captured: false,
        });
        self.loc_names.insert(SmolStr::new(name), idx);
        self.active_locals += 1;
        Ok(slot)
    }

    pub fn slot_of_loc_var(&self, name: &str) -> Option<usize> {
        self.loc_names.get(name).map(|&idx| self.loc_vars[idx].slot)
    }

    pub fn loc_var_index(&self, name: &str) -> Option<usize> {
        self.loc_names.get(name).copied()
    }

    pub fn find_upval(&self, name: &str) -> Option<usize> {
        self.upvalues.iter().position(|uv| uv.name == name)
    }

    /// Extend the debug lifetime of a hidden loop variable past the loop's
    /// closing instruction.
    pub fn fix_end_pc(&mut self, name: &str, delta: usize) {
        for lv in self.loc_vars.iter_mut().rev() {
            if lv.name == name {
                lv.end_pc += delta;
                return;
            }
        }
    }

    // ---- break / goto bookkeeping ----

    pub fn add_break_jmp(&mut self, pc: usize, line: u32) -> LuaResult<()> {
        for frame in self.breaks.iter_mut().rev() {
            if let Some(pending) = frame {
                pending.push(pc);
                return Ok(());
            }
        }
        Err(LuaError::Codegen {
            message: format!("break outside a loop at line {line}"),
        })
    }

    pub fn add_label(&mut self, name: &str, line: u32) -> LuaResult<()> {
        let visible = self
            .labels
            .iter()
            .any(|l| l.name == name && l.scope_lv == self.scope_lv);
        if visible {
            return Err(LuaError::Codegen {
                message: format!("label '{name}' already defined at line {line}"),
            });
        }
        self.labels.push(LabelInfo {
            name: SmolStr::new(name),
            pc: self.insts.len(),
            scope_lv: self.scope_lv,
            active_locals: self.active_locals,
        });
        Ok(())
    }

    pub fn add_goto(&mut self, name: &str, pc: usize, line: u32) {
        self.gotos.push(GotoInfo {
            name: SmolStr::new(name),
            pc,
            line,
            scope_lv: self.scope_lv,
            active_locals: self.active_locals,
        });
    }

    // Match the closing scope's gotos against its labels; unmatched ones
    // escalate to the enclosing scope. A jump may not enter the scope of a
    // local declared between the goto and its label.
    fn resolve_gotos(&mut self) -> LuaResult<()> {
        let mut remaining = Vec::new();
        for g in std::mem::take(&mut self.gotos) {
            if g.scope_lv < self.scope_lv {
                remaining.push(g);
                continue;
            }
            match self
                .labels
                .iter()
                .filter(|l| l.name == g.name && l.scope_lv <= g.scope_lv)
                .next_back()
            {
                Some(label) => {
                    if label.active_locals > g.active_locals && label.pc > g.pc {
                        return Err(LuaError::Codegen {
                            message: format!(
                                "<goto {}> at line {} jumps into the scope of a local",
                                g.name, g.line
                            ),
                        });
                    }
                    let sbx = label.pc as i32 - g.pc as i32 - 1;
                    self.insts[g.pc] = Instruction::asbx(OpCode::Jmp, 0, sbx);
                }
                None => remaining.push(GotoInfo {
                    scope_lv: self.scope_lv - 1,
                    active_locals: g.active_locals.min(self.active_locals),
                    ..g
                }),
            }
        }
        self.gotos = remaining;
        self.labels.retain(|l| l.scope_lv < self.scope_lv);
        Ok(())
    }

    pub fn check_unresolved_gotos(&self) -> LuaResult<()> {
        if let Some(g) = self.gotos.first() {
            return Err(LuaError::Codegen {
                message: format!("no visible label '{}' for <goto> at line {}", g.name, g.line),
            });
        }
        Ok(())
    }

    // JMP's A operand: A-1 is the first register whose upvalues close, 0
    // closes nothing. Needed when leaving a scope with captured locals.
    pub fn get_jmp_arg_a(&self) -> usize {
        let mut has_captured = false;
        let mut min_slot = self.max_regs;
        for &idx in self.loc_names.values() {
            let mut cur = Some(idx);
            while let Some(i) = cur {
                let lv = &self.loc_vars[i];
                if lv.scope_lv != self.scope_lv {
                    break;
                }
                if lv.captured {
                    has_captured = true;
                }
                if lv.slot < min_slot && !lv.name.starts_with('(') {
                    min_slot = lv.slot;
                }
                cur = lv.prev;
            }
        }
        if has_captured { min_slot + 1 } else { 0 }
    }

    pub fn close_open_upvals(&mut self, line: u32) {
        let a = self.get_jmp_arg_a();
        if a > 0 {
            self.emit_jmp(line, a, 0);
        }
    }

    // ---- emission ----

    /// Index of the last emitted instruction.
    pub fn pc(&self) -> usize {
        self.insts.len().wrapping_sub(1)
    }

    pub fn emit(&mut self, line: u32, inst: Instruction) -> usize {
        self.insts.push(inst);
        self.line_nums.push(line);
        self.insts.len() - 1
    }

    pub fn emit_abc(&mut self, line: u32, op: OpCode, a: usize, b: usize, c: usize) -> usize {
        self.emit(line, Instruction::abc(op, a, b, c))
    }

    pub fn emit_jmp(&mut self, line: u32, a: usize, sbx: i32) -> usize {
        self.emit(line, Instruction::asbx(OpCode::Jmp, a, sbx))
    }

    pub fn emit_load_bool(&mut self, line: u32, a: usize, b: usize, c: usize) {
        self.emit_abc(line, OpCode::LoadBool, a, b, c);
    }

    /// LOADNIL a, n: registers a..a+n-1 get nil.
    pub fn emit_load_nil(&mut self, line: u32, a: usize, n: usize) {
        self.emit_abc(line, OpCode::LoadNil, a, n - 1, 0);
    }

    // LOADK, spilling to LOADKX + EXTRAARG when the pool outgrows Bx.
    pub fn emit_load_k(&mut self, line: u32, a: usize, k: Constant) {
        let idx = self.index_of_constant(&k);
        if idx <= MAXARG_BX as usize {
            self.emit(line, Instruction::abx(OpCode::LoadK, a, idx));
        } else {
            self.emit(line, Instruction::abx(OpCode::LoadKx, a, 0));
            self.emit(line, Instruction::ax_arg(OpCode::ExtraArg, idx));
        }
    }

    /// RETURN a, n+1 (n results starting at a; n = -1 means "to top").
    pub fn emit_return(&mut self, line: u32, a: usize, n: i32) {
        self.emit_abc(line, OpCode::Return, a, (n + 1) as usize, 0);
    }

    pub fn emit_unary_op(&mut self, line: u32, op: TokenKind, a: usize, b: usize) {
        let opcode = match op {
            TokenKind::OpNot => OpCode::Not,
            TokenKind::OpWave => OpCode::BNot,
            TokenKind::OpLen => OpCode::Len,
            _ => OpCode::Unm,
        };
        self.emit_abc(line, opcode, a, b, 0);
    }

    // Arithmetic maps directly; comparisons expand to a compare-skip pair
    // feeding two LOADBOOLs.
    pub fn emit_binary_op(&mut self, line: u32, op: TokenKind, a: usize, b: usize, c: usize) {
        if let Some(opcode) = arith_opcode(op) {
            self.emit_abc(line, opcode, a, b, c);
            return;
        }
        match op {
            TokenKind::OpEq => self.emit_abc(line, OpCode::Eq, 1, b, c),
            TokenKind::OpNe => self.emit_abc(line, OpCode::Eq, 0, b, c),
            TokenKind::OpLt => self.emit_abc(line, OpCode::Lt, 1, b, c),
            TokenKind::OpGt => self.emit_abc(line, OpCode::Lt, 1, c, b),
            TokenKind::OpLe => self.emit_abc(line, OpCode::Le, 1, b, c),
            TokenKind::OpGe => self.emit_abc(line, OpCode::Le, 1, c, b),
            _ => unreachable!("not a binary operator"),
        };
        self.emit_jmp(line, 0, 1);
        self.emit_load_bool(line, a, 0, 1);
        self.emit_load_bool(line, a, 1, 0);
    }

    pub fn fix_sbx(&mut self, pc: usize, sbx: i32) {
        let old = self.insts[pc];
        let a = old.a();
        let op = old.opcode();
        self.insts[pc] = Instruction::asbx(op, a, sbx);
    }

    // ---- finish ----

    pub fn into_proto(self, source: &SmolStr) -> Prototype {
        Prototype {
            source: source.clone(),
            line_defined: self.line,
            last_line_defined: self.last_line,
            num_params: self.num_params as u8,
            is_vararg: if self.is_vararg { 1 } else { 0 },
            max_stack_size: self.max_regs.max(2) as u8,
            code: self.insts.iter().map(|i| i.0).collect(),
            constants: self.const_list,
            upvalues: self
                .upvalues
                .iter()
                .map(|uv| UpvalueDesc {
                    name: uv.name.clone(),
                    in_stack: uv.loc_var_slot.is_some() as u8,
                    idx: uv.loc_var_slot.or(uv.upval_index).unwrap_or(0) as u8,
                })
                .collect(),
            protos: self.sub_protos,
            line_info: self.line_nums,
            loc_vars: self
                .loc_vars
                .iter()
                .map(|lv| LocVar {
                    var_name: lv.name.clone(),
                    start_pc: lv.start_pc as u32,
                    end_pc: lv.end_pc as u32,
                })
                .collect(),
        }
    }
}

fn arith_opcode(op: TokenKind) -> Option<OpCode> {
    Some(match op {
        TokenKind::OpAdd => OpCode::Add,
        TokenKind::OpMinus => OpCode::Sub,
        TokenKind::OpMul => OpCode::Mul,
        TokenKind::OpMod => OpCode::Mod,
        TokenKind::OpPow => OpCode::Pow,
        TokenKind::OpDiv => OpCode::Div,
        TokenKind::OpIDiv => OpCode::IDiv,
        TokenKind::OpBAnd => OpCode::BAnd,
        TokenKind::OpBOr => OpCode::BOr,
        TokenKind::OpWave => OpCode::BXor,
        TokenKind::OpShl => OpCode::Shl,
        TokenKind::OpShr => OpCode::Shr,
        TokenKind::OpConcat => OpCode::Concat,
        _ => return None,
    })
}
