// Register loads.

use crate::lua_value::LuaValue;
use crate::lua_vm::LuaResult;
use crate::lua_vm::instruction::Instruction;
use crate::lua_vm::lua_state::LuaState;

pub(super) fn mov(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let v = s.reg(i.b());
    s.set_reg(i.a(), v);
    Ok(())
}

pub(super) fn load_k(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let v = s.const_value(i.bx());
    s.set_reg(i.a(), v);
    Ok(())
}

pub(super) fn load_kx(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let idx = s.fetch_extra_arg();
    let v = s.const_value(idx);
    s.set_reg(i.a(), v);
    Ok(())
}

pub(super) fn load_bool(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    s.set_reg(i.a(), LuaValue::Boolean(i.b() != 0));
    if i.c() != 0 {
        s.add_pc(1);
    }
    Ok(())
}

/// LOADNIL a b: registers a through a+b get nil.
pub(super) fn load_nil(s: &mut LuaState, i: Instruction) -> LuaResult<()> {
    let a = i.a();
    for r in a..=a + i.b() {
        s.set_reg(r, LuaValue::Nil);
    }
    Ok(())
}
