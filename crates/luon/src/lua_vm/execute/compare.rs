// Comparisons and conditional tests. The compare family skips the next
// instruction (always a JMP) when the outcome disagrees with operand A.

use crate::lua_vm::LuaResult;
use crate::lua_vm::instruction::Instruction;
use crate::lua_vm::lua_state::LuaState;
use crate::lua_vm::metamethod;

pub(super) fn eq(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let vb = s.rk_value(i.b());
    let vc = s.rk_value(i.c());
    let r = metamethod::values_eq(s, &vb, &vc)?;
    if r != (i.a() != 0) {
        s.add_pc(1);
    }
    Ok(())
}

pub(super) fn lt(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let vb = s.rk_value(i.b());
    let vc = s.rk_value(i.c());
    let r = metamethod::values_lt(s, &vb, &vc)?;
    if r != (i.a() != 0) {
        s.add_pc(1);
    }
    Ok(())
}

pub(super) fn le(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let vb = s.rk_value(i.b());
    let vc = s.rk_value(i.c());
    let r = metamethod::values_le(s, &vb, &vc)?;
    if r != (i.a() != 0) {
        s.add_pc(1);
    }
    Ok(())
}

pub(super) fn test(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    if s.reg(i.a()).truthy() != (i.c() != 0) {
        s.add_pc(1);
    }
    Ok(())
}

pub(super) fn test_set(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let vb = s.reg(i.b());
    if vb.truthy() == (i.c() != 0) {
        s.set_reg(i.a(), vb);
    } else {
        s.add_pc(1);
    }
    Ok(())
}
